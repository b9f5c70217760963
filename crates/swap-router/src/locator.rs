//! Pool Locator
//!
//! Resolves the pool a swap will route through. Tiers are scanned in
//! ascending fee order and the first liquid pool wins: a cheaper fee beats
//! a deeper pool, which keeps routing predictable and cheap to reason
//! about. Pure queries; nothing here mutates state.

use tracing::debug;

use amm_gateway::{LiquiditySource, PoolInfo};
use conduit_core::{FeeTier, Result, SwapError, TokenId};

use crate::constants::routing::MAX_HOPS;

/// One hop of a route: the pool plus the direction it is traversed in.
#[derive(Debug, Clone)]
pub struct RouteHop {
    pub pool: PoolInfo,
    pub token_in: TokenId,
    pub token_out: TokenId,
}

/// A resolved route: one direct pool, or two pools through an intermediate.
#[derive(Debug, Clone)]
pub struct Route {
    pub hops: Vec<RouteHop>,
}

impl Route {
    fn direct(pool: PoolInfo, token_in: TokenId, token_out: TokenId) -> Self {
        Self {
            hops: vec![RouteHop {
                pool,
                token_in,
                token_out,
            }],
        }
    }

    /// Fee tier of the entry pool; recorded on receipts.
    pub fn entry_tier(&self) -> FeeTier {
        self.hops[0].pool.fee_tier
    }
}

/// Locate the pool for `(token_a, token_b)`.
///
/// With `tier_override`, the named tier is resolved directly and must be
/// usable. Otherwise tiers are scanned ascending; tiers with no pool are
/// skipped, and so are pools that exist but are empty or locked. The first
/// usable pool is returned immediately, even if a higher tier is deeper.
pub async fn locate<S>(
    source: &S,
    token_a: &TokenId,
    token_b: &TokenId,
    tier_override: Option<FeeTier>,
) -> Result<PoolInfo>
where
    S: LiquiditySource + ?Sized,
{
    let not_found = || SwapError::PoolNotFound {
        token_a: *token_a,
        token_b: *token_b,
    };

    if let Some(tier) = tier_override {
        return match source.pool(token_a, token_b, tier).await {
            Some(pool) if pool.is_usable() => Ok(pool),
            Some(pool) => {
                debug!(pool = %pool.pool_id, %tier, "override tier resolved but unusable");
                Err(not_found())
            }
            None => Err(not_found()),
        };
    }

    for tier in FeeTier::ALL {
        match source.pool(token_a, token_b, tier).await {
            None => continue,
            Some(pool) if pool.liquidity == 0 => {
                // exists-but-empty: a distinct state, but still unroutable
                debug!(pool = %pool.pool_id, %tier, "pool exists but is empty");
                continue;
            }
            Some(pool) if !pool.unlocked => {
                debug!(pool = %pool.pool_id, %tier, "pool locked, skipping");
                continue;
            }
            Some(pool) => return Ok(pool),
        }
    }

    Err(not_found())
}

/// The cheapest tier with a usable pool for the pair.
pub async fn find_best_fee_tier<S>(
    source: &S,
    token_a: &TokenId,
    token_b: &TokenId,
) -> Result<FeeTier>
where
    S: LiquiditySource + ?Sized,
{
    locate(source, token_a, token_b, None)
        .await
        .map(|pool| pool.fee_tier)
}

/// Resolve a full route from `token_in` to `token_out`.
///
/// Tries the direct pair first. When no direct pool is usable and no tier
/// override pins the route, falls back to a fixed two-hop path through the
/// first configured intermediate that has usable pools on both legs.
pub async fn locate_route<S>(
    source: &S,
    token_in: &TokenId,
    token_out: &TokenId,
    tier_override: Option<FeeTier>,
    intermediates: &[TokenId],
) -> Result<Route>
where
    S: LiquiditySource + ?Sized,
{
    match locate(source, token_in, token_out, tier_override).await {
        Ok(pool) => return Ok(Route::direct(pool, *token_in, *token_out)),
        Err(err) if tier_override.is_some() => return Err(err),
        Err(_) => {}
    }

    for mid in intermediates {
        if mid == token_in || mid == token_out {
            continue;
        }
        let first = match locate(source, token_in, mid, None).await {
            Ok(pool) => pool,
            Err(_) => continue,
        };
        let second = match locate(source, mid, token_out, None).await {
            Ok(pool) => pool,
            Err(_) => continue,
        };
        debug!(via = %mid, "no direct pool, using two-hop route");
        let route = Route {
            hops: vec![
                RouteHop {
                    pool: first,
                    token_in: *token_in,
                    token_out: *mid,
                },
                RouteHop {
                    pool: second,
                    token_in: *mid,
                    token_out: *token_out,
                },
            ],
        };
        debug_assert!(route.hops.len() <= MAX_HOPS);
        return Ok(route);
    }

    Err(SwapError::PoolNotFound {
        token_a: *token_in,
        token_b: *token_out,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use amm_gateway::MemoryChain;
    use conduit_core::Address;

    fn addr(n: u8) -> Address {
        let mut bytes = [0u8; 20];
        bytes[19] = n;
        Address::new(bytes)
    }

    fn token(n: u8) -> TokenId {
        TokenId::new(addr(n))
    }

    const WNAT: u8 = 0xee;

    #[tokio::test]
    async fn test_lowest_liquid_tier_wins_over_deeper_pools() {
        let chain = MemoryChain::builder(token(WNAT), addr(0xaa))
            .with_pool(token(1), token(2), FeeTier::Low, 1_000, 1_000)
            .with_pool(token(1), token(2), FeeTier::Medium, 1_000_000, 1_000_000)
            .build();

        let pool = locate(&chain, &token(1), &token(2), None).await.unwrap();
        assert_eq!(pool.fee_tier, FeeTier::Low);
    }

    #[tokio::test]
    async fn test_empty_tier_is_skipped() {
        let chain = MemoryChain::builder(token(WNAT), addr(0xaa))
            .with_pool(token(1), token(2), FeeTier::Lowest, 0, 0)
            .with_pool(token(1), token(2), FeeTier::Medium, 5_000, 5_000)
            .build();

        let pool = locate(&chain, &token(1), &token(2), None).await.unwrap();
        assert_eq!(pool.fee_tier, FeeTier::Medium);
    }

    #[tokio::test]
    async fn test_locked_tier_is_skipped() {
        let chain = MemoryChain::builder(token(WNAT), addr(0xaa))
            .with_pool(token(1), token(2), FeeTier::Lowest, 5_000, 5_000)
            .with_pool(token(1), token(2), FeeTier::High, 5_000, 5_000)
            .build();
        chain
            .set_pool_locked(token(1), token(2), FeeTier::Lowest, true)
            .await;

        let pool = locate(&chain, &token(1), &token(2), None).await.unwrap();
        assert_eq!(pool.fee_tier, FeeTier::High);
    }

    #[tokio::test]
    async fn test_no_liquid_tier_is_pool_not_found() {
        let chain = MemoryChain::builder(token(WNAT), addr(0xaa))
            .with_pool(token(1), token(2), FeeTier::Low, 0, 0)
            .build();

        let err = locate(&chain, &token(1), &token(2), None).await.unwrap_err();
        assert!(matches!(err, SwapError::PoolNotFound { .. }));
    }

    #[tokio::test]
    async fn test_override_resolves_named_tier_only() {
        let chain = MemoryChain::builder(token(WNAT), addr(0xaa))
            .with_pool(token(1), token(2), FeeTier::Low, 5_000, 5_000)
            .with_pool(token(1), token(2), FeeTier::High, 5_000, 5_000)
            .build();

        let pool = locate(&chain, &token(1), &token(2), Some(FeeTier::High))
            .await
            .unwrap();
        assert_eq!(pool.fee_tier, FeeTier::High);

        let err = locate(&chain, &token(1), &token(2), Some(FeeTier::Medium))
            .await
            .unwrap_err();
        assert!(matches!(err, SwapError::PoolNotFound { .. }));
    }

    #[tokio::test]
    async fn test_override_rejects_empty_pool() {
        let chain = MemoryChain::builder(token(WNAT), addr(0xaa))
            .with_pool(token(1), token(2), FeeTier::Low, 0, 0)
            .build();

        let err = locate(&chain, &token(1), &token(2), Some(FeeTier::Low))
            .await
            .unwrap_err();
        assert!(matches!(err, SwapError::PoolNotFound { .. }));
    }

    #[tokio::test]
    async fn test_find_best_fee_tier() {
        let chain = MemoryChain::builder(token(WNAT), addr(0xaa))
            .with_pool(token(1), token(2), FeeTier::Medium, 5_000, 5_000)
            .build();

        let tier = find_best_fee_tier(&chain, &token(1), &token(2)).await.unwrap();
        assert_eq!(tier, FeeTier::Medium);
    }

    #[tokio::test]
    async fn test_two_hop_fallback_through_intermediate() {
        let chain = MemoryChain::builder(token(WNAT), addr(0xaa))
            .with_pool(token(1), token(9), FeeTier::Low, 10_000, 10_000)
            .with_pool(token(9), token(2), FeeTier::Medium, 10_000, 10_000)
            .build();

        let route = locate_route(&chain, &token(1), &token(2), None, &[token(9)])
            .await
            .unwrap();
        assert_eq!(route.hops.len(), 2);
        assert_eq!(route.hops[0].token_out, token(9));
        assert_eq!(route.hops[1].token_in, token(9));
        assert_eq!(route.entry_tier(), FeeTier::Low);
    }

    #[tokio::test]
    async fn test_tier_override_never_falls_back() {
        let chain = MemoryChain::builder(token(WNAT), addr(0xaa))
            .with_pool(token(1), token(9), FeeTier::Low, 10_000, 10_000)
            .with_pool(token(9), token(2), FeeTier::Low, 10_000, 10_000)
            .build();

        let err = locate_route(&chain, &token(1), &token(2), Some(FeeTier::Low), &[token(9)])
            .await
            .unwrap_err();
        assert!(matches!(err, SwapError::PoolNotFound { .. }));
    }

    #[tokio::test]
    async fn test_no_route_at_all() {
        let chain = MemoryChain::builder(token(WNAT), addr(0xaa)).build();
        let err = locate_route(&chain, &token(1), &token(2), None, &[token(9)])
            .await
            .unwrap_err();
        assert!(matches!(err, SwapError::PoolNotFound { .. }));
    }
}
