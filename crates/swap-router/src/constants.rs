//! Router Constants

pub use conduit_core::types::constants::{BPS_DENOM, MAX_FEE_BPS};

/// Routing limits
pub mod routing {
    /// Maximum hops in a route: one direct pool, or two pools through a
    /// configured intermediate. Deeper paths are out of routing scope.
    pub const MAX_HOPS: usize = 2;
}
