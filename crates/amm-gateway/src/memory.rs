//! In-Memory Chain
//!
//! One conforming implementation of the `Ledger` and `LiquiditySource`
//! capabilities: constant-product pools, token balances and allowances, a
//! settable clock, and snapshot-based checkpoints. Everything lives behind a
//! single lock, so each capability call applies atomically.
//!
//! The checkpoint/rollback pair is what a live chain gives you for free via
//! revert semantics; here it restores a saved copy of the whole state.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use conduit_core::types::constants::FEE_DENOM;
use conduit_core::{Address, Amount, FeeTier, LedgerError, PoolId, SwapError, Timestamp, TokenId};

use crate::capability::{CheckpointId, Ledger, LiquiditySource, PoolInfo};
use crate::math;

type PoolKey = (TokenId, TokenId, FeeTier);

#[derive(Debug, Clone)]
struct PoolState {
    id: PoolId,
    token_a: TokenId,
    token_b: TokenId,
    fee_tier: FeeTier,
    reserve_a: Amount,
    reserve_b: Amount,
    unlocked: bool,
}

impl PoolState {
    fn info(&self) -> PoolInfo {
        PoolInfo {
            pool_id: self.id.clone(),
            token_a: self.token_a,
            token_b: self.token_b,
            fee_tier: self.fee_tier,
            liquidity: math::pool_liquidity(self.reserve_a, self.reserve_b),
            unlocked: self.unlocked,
            spot_price: math::spot_price(self.reserve_a, self.reserve_b),
        }
    }

    /// Reserves oriented for a swap selling `token_in`, plus the output token.
    fn oriented(&self, token_in: &TokenId) -> Option<(Amount, Amount, TokenId)> {
        if *token_in == self.token_a {
            Some((self.reserve_a, self.reserve_b, self.token_b))
        } else if *token_in == self.token_b {
            Some((self.reserve_b, self.reserve_a, self.token_a))
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Default)]
struct ChainState {
    timestamp: Timestamp,
    native: HashMap<Address, Amount>,
    balances: HashMap<(TokenId, Address), Amount>,
    allowances: HashMap<(TokenId, Address, Address), Amount>,
    pools: BTreeMap<PoolKey, PoolState>,
    /// Tokens whose movements are rejected (simulates a reverting token contract)
    halted: HashSet<TokenId>,
}

impl ChainState {
    fn token_balance(&self, token: &TokenId, owner: &Address) -> Amount {
        self.balances.get(&(*token, *owner)).copied().unwrap_or(0)
    }

    fn move_token(
        &mut self,
        token: &TokenId,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        if self.halted.contains(token) {
            return Err(LedgerError::Rejected(*token));
        }
        let available = self.token_balance(token, from);
        if available < amount {
            return Err(LedgerError::InsufficientBalance {
                token: *token,
                required: amount,
                available,
            });
        }
        *self.balances.entry((*token, *from)).or_default() -= amount;
        *self.balances.entry((*token, *to)).or_default() += amount;
        Ok(())
    }

    fn pool_by_id(&self, pool_id: &PoolId) -> Option<&PoolState> {
        self.pools.values().find(|p| p.id == *pool_id)
    }
}

/// In-memory chain implementing both capabilities over shared state.
pub struct MemoryChain {
    wrapped_native: TokenId,
    amm_address: Address,
    state: RwLock<ChainState>,
    saved: RwLock<Vec<(CheckpointId, ChainState)>>,
    next_checkpoint: AtomicU64,
}

impl MemoryChain {
    pub fn builder(wrapped_native: TokenId, amm_address: Address) -> MemoryChainBuilder {
        MemoryChainBuilder {
            wrapped_native,
            amm_address,
            state: ChainState::default(),
            next_pool: 0,
        }
    }

    pub fn wrapped_native(&self) -> TokenId {
        self.wrapped_native
    }

    pub async fn set_timestamp(&self, timestamp: Timestamp) {
        self.state.write().await.timestamp = timestamp;
    }

    pub async fn advance_time(&self, seconds: u64) {
        self.state.write().await.timestamp += seconds;
    }

    pub async fn mint(&self, token: TokenId, owner: Address, amount: Amount) {
        *self
            .state
            .write()
            .await
            .balances
            .entry((token, owner))
            .or_default() += amount;
    }

    pub async fn mint_native(&self, owner: Address, amount: Amount) {
        *self.state.write().await.native.entry(owner).or_default() += amount;
    }

    /// Reject every movement of `token` from now on.
    pub async fn halt_token(&self, token: TokenId) {
        self.state.write().await.halted.insert(token);
    }

    pub async fn set_pool_locked(&self, a: TokenId, b: TokenId, tier: FeeTier, locked: bool) {
        let key = pool_key(a, b, tier);
        if let Some(pool) = self.state.write().await.pools.get_mut(&key) {
            pool.unlocked = !locked;
        }
    }

    /// Current reserves of the pool for `(a, b, tier)`, canonical order.
    pub async fn reserves(&self, a: TokenId, b: TokenId, tier: FeeTier) -> Option<(Amount, Amount)> {
        let key = pool_key(a, b, tier);
        self.state
            .read()
            .await
            .pools
            .get(&key)
            .map(|p| (p.reserve_a, p.reserve_b))
    }
}

fn pool_key(a: TokenId, b: TokenId, tier: FeeTier) -> PoolKey {
    let (a, b) = PoolInfo::canonical_pair(a, b);
    (a, b, tier)
}

/// Builder for seeding a `MemoryChain` with pools, balances, and a clock.
pub struct MemoryChainBuilder {
    wrapped_native: TokenId,
    amm_address: Address,
    state: ChainState,
    next_pool: u64,
}

impl MemoryChainBuilder {
    pub fn with_timestamp(mut self, timestamp: Timestamp) -> Self {
        self.state.timestamp = timestamp;
        self
    }

    pub fn with_native_balance(mut self, owner: Address, amount: Amount) -> Self {
        *self.state.native.entry(owner).or_default() += amount;
        self
    }

    pub fn with_token_balance(mut self, token: TokenId, owner: Address, amount: Amount) -> Self {
        *self.state.balances.entry((token, owner)).or_default() += amount;
        self
    }

    /// Create a pool for `(a, b)` at `tier` with the given reserves.
    /// Reserves are given in the order the tokens are passed, then stored
    /// canonically.
    pub fn with_pool(
        mut self,
        a: TokenId,
        b: TokenId,
        tier: FeeTier,
        reserve_a: Amount,
        reserve_b: Amount,
    ) -> Self {
        let (ca, cb) = PoolInfo::canonical_pair(a, b);
        let (ra, rb) = if ca == a {
            (reserve_a, reserve_b)
        } else {
            (reserve_b, reserve_a)
        };
        let id = PoolId::new(format!("pool-{}", self.next_pool));
        self.next_pool += 1;
        self.state.pools.insert(
            (ca, cb, tier),
            PoolState {
                id,
                token_a: ca,
                token_b: cb,
                fee_tier: tier,
                reserve_a: ra,
                reserve_b: rb,
                unlocked: true,
            },
        );
        self
    }

    pub fn build(self) -> MemoryChain {
        MemoryChain {
            wrapped_native: self.wrapped_native,
            amm_address: self.amm_address,
            state: RwLock::new(self.state),
            saved: RwLock::new(Vec::new()),
            next_checkpoint: AtomicU64::new(0),
        }
    }
}

#[async_trait]
impl Ledger for MemoryChain {
    async fn timestamp(&self) -> Timestamp {
        self.state.read().await.timestamp
    }

    async fn native_balance(&self, owner: &Address) -> Amount {
        self.state
            .read()
            .await
            .native
            .get(owner)
            .copied()
            .unwrap_or(0)
    }

    async fn balance_of(&self, token: &TokenId, owner: &Address) -> Amount {
        self.state.read().await.token_balance(token, owner)
    }

    async fn allowance(&self, token: &TokenId, owner: &Address, spender: &Address) -> Amount {
        self.state
            .read()
            .await
            .allowances
            .get(&(*token, *owner, *spender))
            .copied()
            .unwrap_or(0)
    }

    async fn native_transfer(
        &self,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        let mut state = self.state.write().await;
        let available = state.native.get(from).copied().unwrap_or(0);
        if available < amount {
            return Err(LedgerError::InsufficientNative {
                owner: *from,
                required: amount,
                available,
            });
        }
        *state.native.entry(*from).or_default() -= amount;
        *state.native.entry(*to).or_default() += amount;
        Ok(())
    }

    async fn transfer(
        &self,
        token: &TokenId,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        self.state.write().await.move_token(token, from, to, amount)
    }

    async fn transfer_from(
        &self,
        token: &TokenId,
        owner: &Address,
        spender: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        let mut state = self.state.write().await;
        let key = (*token, *owner, *spender);
        let available = state.allowances.get(&key).copied().unwrap_or(0);
        if available < amount {
            return Err(LedgerError::InsufficientAllowance {
                token: *token,
                owner: *owner,
                spender: *spender,
                required: amount,
                available,
            });
        }
        state.move_token(token, owner, to, amount)?;
        *state.allowances.entry(key).or_default() -= amount;
        Ok(())
    }

    async fn approve(
        &self,
        token: &TokenId,
        owner: &Address,
        spender: &Address,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        self.state
            .write()
            .await
            .allowances
            .insert((*token, *owner, *spender), amount);
        Ok(())
    }

    async fn deposit_native(&self, owner: &Address, amount: Amount) -> Result<(), LedgerError> {
        let mut state = self.state.write().await;
        if state.halted.contains(&self.wrapped_native) {
            return Err(LedgerError::Rejected(self.wrapped_native));
        }
        let available = state.native.get(owner).copied().unwrap_or(0);
        if available < amount {
            return Err(LedgerError::InsufficientNative {
                owner: *owner,
                required: amount,
                available,
            });
        }
        *state.native.entry(*owner).or_default() -= amount;
        *state
            .balances
            .entry((self.wrapped_native, *owner))
            .or_default() += amount;
        Ok(())
    }

    async fn withdraw_native(&self, owner: &Address, amount: Amount) -> Result<(), LedgerError> {
        let mut state = self.state.write().await;
        if state.halted.contains(&self.wrapped_native) {
            return Err(LedgerError::Rejected(self.wrapped_native));
        }
        let available = state.token_balance(&self.wrapped_native, owner);
        if available < amount {
            return Err(LedgerError::InsufficientBalance {
                token: self.wrapped_native,
                required: amount,
                available,
            });
        }
        *state
            .balances
            .entry((self.wrapped_native, *owner))
            .or_default() -= amount;
        *state.native.entry(*owner).or_default() += amount;
        Ok(())
    }

    async fn checkpoint(&self) -> CheckpointId {
        let id = CheckpointId(self.next_checkpoint.fetch_add(1, Ordering::SeqCst));
        let snapshot = self.state.read().await.clone();
        self.saved.write().await.push((id, snapshot));
        id
    }

    async fn rollback(&self, checkpoint: CheckpointId) {
        let mut saved = self.saved.write().await;
        if let Some(idx) = saved.iter().position(|(id, _)| *id == checkpoint) {
            let (_, snapshot) = saved.swap_remove(idx);
            saved.truncate(idx);
            *self.state.write().await = snapshot;
        } else {
            debug!(checkpoint = checkpoint.0, "rollback to unknown checkpoint ignored");
        }
    }

    async fn commit(&self, checkpoint: CheckpointId) {
        let mut saved = self.saved.write().await;
        if let Some(idx) = saved.iter().position(|(id, _)| *id == checkpoint) {
            saved.truncate(idx);
        }
    }
}

#[async_trait]
impl LiquiditySource for MemoryChain {
    fn amm_address(&self) -> Address {
        self.amm_address
    }

    async fn pool(&self, token_a: &TokenId, token_b: &TokenId, tier: FeeTier) -> Option<PoolInfo> {
        let key = pool_key(*token_a, *token_b, tier);
        self.state.read().await.pools.get(&key).map(PoolState::info)
    }

    async fn quote_exact_input(
        &self,
        pool_id: &PoolId,
        token_in: &TokenId,
        amount_in: Amount,
    ) -> Result<Amount, SwapError> {
        let state = self.state.read().await;
        let pool = state.pool_by_id(pool_id).ok_or_else(|| SwapError::InvalidRequest {
            reason: format!("unknown pool {}", pool_id),
        })?;
        if !pool.unlocked {
            return Err(SwapError::PoolLocked(pool.id.clone()));
        }
        let (reserve_in, reserve_out, _) =
            pool.oriented(token_in).ok_or_else(|| SwapError::InvalidRequest {
                reason: format!("token {} not in pool {}", token_in, pool_id),
            })?;
        let output = math::swap_output(
            reserve_in,
            reserve_out,
            amount_in,
            pool.fee_tier.fee_num(),
            FEE_DENOM,
        );
        if output == 0 {
            return Err(SwapError::InsufficientLiquidity(pool.id.clone()));
        }
        Ok(output)
    }

    async fn swap_exact_input(
        &self,
        pool_id: &PoolId,
        token_in: &TokenId,
        amount_in: Amount,
        payer: &Address,
        recipient: &Address,
    ) -> Result<Amount, SwapError> {
        let mut state = self.state.write().await;

        let pool = state.pool_by_id(pool_id).ok_or_else(|| SwapError::InvalidRequest {
            reason: format!("unknown pool {}", pool_id),
        })?;
        if !pool.unlocked {
            return Err(SwapError::PoolLocked(pool.id.clone()));
        }
        let key = (pool.token_a, pool.token_b, pool.fee_tier);
        let (reserve_in, reserve_out, token_out) =
            pool.oriented(token_in).ok_or_else(|| SwapError::InvalidRequest {
                reason: format!("token {} not in pool {}", token_in, pool_id),
            })?;
        let pool_id = pool.id.clone();

        // Checks first; mutations only once nothing can fail.
        if state.halted.contains(token_in) {
            return Err(LedgerError::Rejected(*token_in).into());
        }
        if state.halted.contains(&token_out) {
            return Err(LedgerError::Rejected(token_out).into());
        }
        let allowance_key = (*token_in, *payer, self.amm_address);
        let allowed = state.allowances.get(&allowance_key).copied().unwrap_or(0);
        if allowed < amount_in {
            return Err(LedgerError::InsufficientAllowance {
                token: *token_in,
                owner: *payer,
                spender: self.amm_address,
                required: amount_in,
                available: allowed,
            }
            .into());
        }
        let balance = state.token_balance(token_in, payer);
        if balance < amount_in {
            return Err(LedgerError::InsufficientBalance {
                token: *token_in,
                required: amount_in,
                available: balance,
            }
            .into());
        }
        let output = math::swap_output(
            reserve_in,
            reserve_out,
            amount_in,
            key.2.fee_num(),
            FEE_DENOM,
        );
        if output == 0 || output > reserve_out {
            return Err(SwapError::InsufficientLiquidity(pool_id));
        }

        // Apply; the pool lookup comes first so no path below can fail.
        let pool = state
            .pools
            .get_mut(&key)
            .ok_or_else(|| SwapError::InsufficientLiquidity(pool_id.clone()))?;
        if *token_in == pool.token_a {
            pool.reserve_a += amount_in;
            pool.reserve_b -= output;
        } else {
            pool.reserve_b += amount_in;
            pool.reserve_a -= output;
        }
        *state.allowances.entry(allowance_key).or_default() -= amount_in;
        *state.balances.entry((*token_in, *payer)).or_default() -= amount_in;
        *state.balances.entry((token_out, *recipient)).or_default() += output;

        debug!(
            pool = %pool_id,
            token_in = %token_in,
            amount_in,
            output,
            "exact-input swap applied"
        );
        Ok(output)
    }
}
