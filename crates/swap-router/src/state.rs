//! Router State Types
//!
//! Per-call data: requests, receipts, events, and execution phases.
//! Long-lived configuration lives in `conduit_core::config`.

use serde::{Deserialize, Serialize};
use std::fmt;

use conduit_core::{Address, Amount, FeeTier, Timestamp, TokenId};

use crate::slippage::Tolerance;

/// Caller context resolved once at the entry boundary.
///
/// Stands in for the transaction's sender and attached native value; the
/// access gate authorizes against `caller` before anything else runs.
#[derive(Debug, Clone, Copy)]
pub struct CallContext {
    pub caller: Address,
    /// Native units attached to the call (the payable leg)
    pub value: Amount,
}

impl CallContext {
    pub fn new(caller: Address) -> Self {
        Self { caller, value: 0 }
    }

    pub fn with_value(caller: Address, value: Amount) -> Self {
        Self { caller, value }
    }
}

/// Swap input specification
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SwapInput {
    /// Swap the chain's native asset; wrapped 1:1 before routing
    Native { amount: Amount },
    /// Swap a fungible token pulled from the caller via allowance
    Token { token_id: TokenId, amount: Amount },
}

impl SwapInput {
    pub fn amount(&self) -> Amount {
        match self {
            Self::Native { amount } => *amount,
            Self::Token { amount, .. } => *amount,
        }
    }
}

/// How the minimum-acceptable-output floor is derived
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputLimit {
    /// Caller-supplied absolute floor
    MinOut(Amount),
    /// Floor computed from the on-chain quote and this tolerance
    Slippage(Tolerance),
    /// Floor computed from the caller's stored preference, or the
    /// deployment default
    Default,
}

/// Swap request parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapRequest {
    pub input: SwapInput,
    pub token_out: TokenId,
    /// Receives the swap output; must be non-zero
    pub recipient: Address,
    /// Absolute unix-seconds deadline; must be strictly in the future at
    /// execution time
    pub deadline: Timestamp,
    /// Explicit fee-tier override; `None` selects the cheapest liquid tier
    pub fee_tier: Option<FeeTier>,
    pub limit: OutputLimit,
}

/// Read-only swap preview
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapQuote {
    pub token_in: TokenId,
    pub token_out: TokenId,
    pub amount_in: Amount,
    /// Protocol fee that would be taken off the input
    pub fee_amount: Amount,
    /// Input actually routed after the fee leg
    pub net_amount: Amount,
    /// Expected output at current reserves
    pub amount_out: Amount,
    /// Floor at the deployment's default slippage tolerance
    pub min_out_suggested: Amount,
    /// Fee tier of the entry pool
    pub fee_tier: FeeTier,
}

/// Append-only record of one successful swap. Never mutated or deleted.
///
/// `token_in` records the routed token; a native-asset input appears as its
/// wrapped representation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapReceipt {
    pub caller: Address,
    pub token_in: TokenId,
    pub token_out: TokenId,
    pub amount_in: Amount,
    pub fee_taken: Amount,
    pub amount_out: Amount,
    /// Fee tier of the entry pool
    pub fee_tier: FeeTier,
    pub timestamp: Timestamp,
}

/// Events appended once per observable state change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RouterEvent {
    SwapExecuted {
        caller: Address,
        token_in: TokenId,
        token_out: TokenId,
        amount_in: Amount,
        fee_taken: Amount,
        amount_out: Amount,
        fee_tier: FeeTier,
    },
    AgentRegistered {
        address: Address,
        enabled: bool,
    },
    FeeConfigUpdated {
        fee_bps: u16,
        recipient: Address,
    },
    AdminTransferred {
        previous: Address,
        new_admin: Address,
    },
}

/// Execution phases of one swap. Any failure in `Wrapping..=Settling`
/// transitions to `Reverted` and unwinds every effect of the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapPhase {
    Idle,
    Wrapping,
    Approving,
    Swapping,
    Settling,
    Done,
    Reverted,
}

impl fmt::Display for SwapPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Wrapping => "wrapping",
            Self::Approving => "approving",
            Self::Swapping => "swapping",
            Self::Settling => "settling",
            Self::Done => "done",
            Self::Reverted => "reverted",
        };
        write!(f, "{}", name)
    }
}
