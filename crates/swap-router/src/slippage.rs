//! Slippage Guard
//!
//! Computes the minimum-acceptable-output floor from a quote and a
//! tolerance, and enforces it after the swap leg reports its output.

use num_bigint::BigInt;
use num_traits::ToPrimitive;
use serde::{Deserialize, Serialize};

use conduit_core::types::constants::BPS_DENOM;
use conduit_core::{Amount, Result, SwapError};

/// Slippage tolerance.
///
/// `Bounded(bps)` requires `1 <= bps <= max_bps`. Zero tolerance cannot be
/// spelled as `Bounded(0)`; the only way to demand the full quote is the
/// explicit `Exact` variant, which exists for deterministic test setups and
/// should not be used against live liquidity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tolerance {
    Bounded(u16),
    Exact,
}

/// Validate a tolerance against the deployment ceiling, returning the
/// effective basis points. Runs before any external call is made.
pub fn validate(tolerance: Tolerance, max_bps: u16) -> Result<u16> {
    match tolerance {
        Tolerance::Exact => Ok(0),
        Tolerance::Bounded(bps) if bps == 0 || bps > max_bps => {
            Err(SwapError::SlippageConfigInvalid { bps, max_bps })
        }
        Tolerance::Bounded(bps) => Ok(bps),
    }
}

/// Floor: `min_out = floor(quote * (10000 - tolerance_bps) / 10000)`.
pub fn min_out(quote: Amount, tolerance_bps: u16) -> Amount {
    let keep = BPS_DENOM - u32::from(tolerance_bps);
    let floor = BigInt::from(quote) * keep / BPS_DENOM;
    floor.to_u128().unwrap_or(0) // floor <= quote, always fits
}

/// Post-swap check of the reported output against the floor.
pub fn enforce(actual_out: Amount, min: Amount) -> Result<()> {
    if actual_out < min {
        return Err(SwapError::InsufficientOutput {
            got: actual_out,
            min,
        });
    }
    Ok(())
}
