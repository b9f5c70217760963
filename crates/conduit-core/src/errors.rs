//! Error types for Conduit

use thiserror::Error;

use crate::types::{Address, Amount, PoolId, Timestamp, TokenId};

/// Token-movement failures reported by the underlying ledger
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("unknown token: {0}")]
    UnknownToken(TokenId),

    #[error("insufficient balance of {token}: need {required}, have {available}")]
    InsufficientBalance {
        token: TokenId,
        required: Amount,
        available: Amount,
    },

    #[error("insufficient native balance of {owner}: need {required}, have {available}")]
    InsufficientNative {
        owner: Address,
        required: Amount,
        available: Amount,
    },

    #[error("insufficient allowance of {token} from {owner} to {spender}: need {required}, have {available}")]
    InsufficientAllowance {
        token: TokenId,
        owner: Address,
        spender: Address,
        required: Amount,
        available: Amount,
    },

    #[error("transfer rejected by token {0}")]
    Rejected(TokenId),
}

/// Errors that abort a swap execution.
///
/// Every variant carries all-or-nothing semantics: the caller observes a
/// failed operation and unchanged balances. Retry is the caller's job.
#[derive(Debug, Error)]
pub enum SwapError {
    #[error("invalid request: {reason}")]
    InvalidRequest { reason: String },

    #[error("deadline {deadline} has expired (ledger time {now})")]
    DeadlineExpired { deadline: Timestamp, now: Timestamp },

    #[error("caller {0} is not an authorized agent")]
    Unauthorized(Address),

    #[error("no liquid pool for {token_a}/{token_b}")]
    PoolNotFound { token_a: TokenId, token_b: TokenId },

    #[error("slippage tolerance {bps} bps out of bounds (max {max_bps})")]
    SlippageConfigInvalid { bps: u16, max_bps: u16 },

    #[error("fee config invalid: {reason}")]
    FeeConfigInvalid { reason: String },

    #[error("output below minimum: got {got}, need {min}")]
    InsufficientOutput { got: Amount, min: Amount },

    #[error("insufficient liquidity in pool {0}")]
    InsufficientLiquidity(PoolId),

    #[error("pool {0} is locked")]
    PoolLocked(PoolId),

    #[error("reentrant call rejected")]
    ReentrancyDetected,

    #[error("token transfer failed: {0}")]
    Transfer(#[from] LedgerError),

    #[error("arithmetic overflow in {0}")]
    Overflow(&'static str),
}

/// Result type alias for Conduit operations
pub type Result<T> = std::result::Result<T, SwapError>;

impl SwapError {
    /// Stable machine-readable code for callers that match on failures.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidRequest { .. } => "invalid_request",
            Self::DeadlineExpired { .. } => "deadline_expired",
            Self::Unauthorized(_) => "unauthorized",
            Self::PoolNotFound { .. } => "pool_not_found",
            Self::SlippageConfigInvalid { .. } => "slippage_config_invalid",
            Self::FeeConfigInvalid { .. } => "fee_config_invalid",
            Self::InsufficientOutput { .. } => "insufficient_output",
            Self::InsufficientLiquidity(_) => "insufficient_liquidity",
            Self::PoolLocked(_) => "pool_locked",
            Self::ReentrancyDetected => "reentrancy_detected",
            Self::Transfer(_) => "transfer_failed",
            Self::Overflow(_) => "overflow",
        }
    }
}
