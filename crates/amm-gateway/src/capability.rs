//! Chain capabilities
//!
//! The executor never talks to a concrete chain. It sees two capabilities:
//! a `Ledger` for asset movements and the transaction boundary, and a
//! `LiquiditySource` for pool lookup, quoting, and the swap call itself.
//! `MemoryChain` implements both; a live-chain client would too.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use conduit_core::{Address, Amount, FeeTier, LedgerError, PoolId, SwapError, Timestamp, TokenId};

/// Snapshot of a pool's routable state.
///
/// A pool with `liquidity == 0` resolves but is unusable; callers must treat
/// exists-but-empty as distinct from not-exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolInfo {
    pub pool_id: PoolId,
    /// First token of the pair, canonical (ascending) order
    pub token_a: TokenId,
    /// Second token of the pair
    pub token_b: TokenId,
    pub fee_tier: FeeTier,
    /// Tradable-reserve magnitude (geometric mean of reserves)
    pub liquidity: Amount,
    pub unlocked: bool,
    /// Current price marker: token_b per token_a
    pub spot_price: f64,
}

impl PoolInfo {
    /// Whether the pool can currently serve a swap.
    pub fn is_usable(&self) -> bool {
        self.liquidity > 0 && self.unlocked
    }

    /// The pair's canonical ordering, shared with registry keys.
    pub fn canonical_pair(a: TokenId, b: TokenId) -> (TokenId, TokenId) {
        if a <= b {
            (a, b)
        } else {
            (b, a)
        }
    }
}

/// Handle for a ledger checkpoint. Rolling back to a checkpoint discards
/// every mutation made after it was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CheckpointId(pub u64);

/// Asset ledger: balances, allowances, the wrapped-native contract, and the
/// transaction boundary that gives swap execution its all-or-nothing shape.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Current ledger time, unix seconds. Deadlines compare against this.
    async fn timestamp(&self) -> Timestamp;

    async fn native_balance(&self, owner: &Address) -> Amount;

    async fn balance_of(&self, token: &TokenId, owner: &Address) -> Amount;

    async fn allowance(&self, token: &TokenId, owner: &Address, spender: &Address) -> Amount;

    async fn native_transfer(
        &self,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), LedgerError>;

    async fn transfer(
        &self,
        token: &TokenId,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), LedgerError>;

    /// Move `owner`'s tokens on the strength of an allowance granted to
    /// `spender`. The allowance is debited by `amount`.
    async fn transfer_from(
        &self,
        token: &TokenId,
        owner: &Address,
        spender: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), LedgerError>;

    /// Set `spender`'s allowance over `owner`'s tokens to exactly `amount`.
    async fn approve(
        &self,
        token: &TokenId,
        owner: &Address,
        spender: &Address,
        amount: Amount,
    ) -> Result<(), LedgerError>;

    /// Wrap native units into the fungible wrapped-native token, 1:1.
    async fn deposit_native(&self, owner: &Address, amount: Amount) -> Result<(), LedgerError>;

    /// Unwrap wrapped-native tokens back into native units, 1:1.
    async fn withdraw_native(&self, owner: &Address, amount: Amount) -> Result<(), LedgerError>;

    /// Open a transaction boundary.
    async fn checkpoint(&self) -> CheckpointId;

    /// Discard every mutation made since `checkpoint` was taken.
    async fn rollback(&self, checkpoint: CheckpointId);

    /// Release `checkpoint`, keeping all mutations made since.
    async fn commit(&self, checkpoint: CheckpointId);
}

/// The external AMM: pool registry, liquidity reader, quoter, and the
/// exact-input swap call.
#[async_trait]
pub trait LiquiditySource: Send + Sync {
    /// The AMM's spending identity. Input funds must be approved to this
    /// address before `swap_exact_input` can pull them.
    fn amm_address(&self) -> Address;

    /// Registry lookup: the pool for `(token_a, token_b, tier)`, if one was
    /// ever created. A returned pool may still be empty or locked.
    async fn pool(&self, token_a: &TokenId, token_b: &TokenId, tier: FeeTier) -> Option<PoolInfo>;

    /// Quote an exact-input swap against current reserves without executing.
    async fn quote_exact_input(
        &self,
        pool_id: &PoolId,
        token_in: &TokenId,
        amount_in: Amount,
    ) -> Result<Amount, SwapError>;

    /// Execute an exact-input swap. Pulls `amount_in` of `token_in` from
    /// `payer` (via allowance to `amm_address`), credits the output token to
    /// `recipient`, and returns the output amount.
    async fn swap_exact_input(
        &self,
        pool_id: &PoolId,
        token_in: &TokenId,
        amount_in: Amount,
        payer: &Address,
        recipient: &Address,
    ) -> Result<Amount, SwapError>;
}

/// Everything the executor needs from a chain, as one trait object.
pub trait Chain: Ledger + LiquiditySource {}

impl<T: Ledger + LiquiditySource> Chain for T {}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(n: u8) -> TokenId {
        let mut bytes = [0u8; 20];
        bytes[19] = n;
        TokenId::new(Address::new(bytes))
    }

    #[test]
    fn test_canonical_pair_is_order_insensitive() {
        let (a, b) = PoolInfo::canonical_pair(token(2), token(1));
        assert_eq!((a, b), (token(1), token(2)));
        assert_eq!(PoolInfo::canonical_pair(token(1), token(2)), (a, b));
    }

    #[test]
    fn test_pool_usability() {
        let pool = PoolInfo {
            pool_id: PoolId::new("pool-0"),
            token_a: token(1),
            token_b: token(2),
            fee_tier: FeeTier::Medium,
            liquidity: 0,
            unlocked: true,
            spot_price: 1.0,
        };
        assert!(!pool.is_usable());

        let live = PoolInfo {
            liquidity: 10,
            ..pool.clone()
        };
        assert!(live.is_usable());

        let locked = PoolInfo {
            liquidity: 10,
            unlocked: false,
            ..pool
        };
        assert!(!locked.is_usable());
    }
}
