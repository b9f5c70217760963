//! Swap Execution Router
//!
//! This crate implements the Conduit swap engine: it locates a liquidity
//! pool across the fixed fee tiers, splits the protocol fee out of the
//! input, computes a slippage-bounded minimum output, runs the atomic
//! wrap → approve → swap → settle sequence against a pluggable liquidity
//! source, and gates every mutating entry point behind an agent allow-list.

pub mod access;
pub mod constants;
pub mod executor;
pub mod fees;
pub mod locator;
pub mod slippage;
pub mod state;

// Re-exports
pub use access::AccessGate;
pub use executor::SwapRouter;
pub use locator::{Route, RouteHop};
pub use slippage::Tolerance;
pub use state::{
    CallContext, OutputLimit, RouterEvent, SwapInput, SwapPhase, SwapQuote, SwapReceipt,
    SwapRequest,
};
