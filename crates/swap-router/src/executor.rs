//! Swap Executor
//!
//! Orchestrates one swap as a single unit of work:
//!
//! 1. reentrancy guard, authorization, request validation (no external calls)
//! 2. acquire the input (wrap native 1:1, or pull the token via allowance)
//! 3. split and forward the protocol fee
//! 4. resolve the route across fee tiers
//! 5. quote and derive the minimum-output floor
//! 6. grant the AMM an allowance of exactly the net amount
//! 7. exact-input swap, hop by hop
//! 8. enforce the floor on the reported output
//! 9. settle to the recipient, refund input remainder to the caller
//! 10. append the receipt and emit the event
//!
//! Steps 2–9 run inside a ledger checkpoint; the first failure rolls the
//! whole call back, so partial wrapping or approval never survives.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use amm_gateway::{Chain, PoolInfo};
use conduit_core::{
    Address, Amount, FeeConfig, FeeTier, Result, RouterConfig, SlippageConfig, SwapError, TokenId,
};

use crate::access::AccessGate;
use crate::fees;
use crate::locator::{self, Route};
use crate::slippage::{self, Tolerance};
use crate::state::{
    CallContext, OutputLimit, RouterEvent, SwapInput, SwapPhase, SwapQuote, SwapReceipt,
    SwapRequest,
};

/// Minimum-output floor after tolerance resolution
enum ResolvedLimit {
    Min(Amount),
    Tolerance(u16),
}

/// RAII release of the reentrancy flag
struct ReentrancyToken<'a>(&'a AtomicBool);

impl Drop for ReentrancyToken<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// The swap execution router.
///
/// Owns the mutable configuration (fee, per-caller slippage preferences,
/// agent registry) and holds custody of in-flight funds under its own
/// address for the duration of one execution.
pub struct SwapRouter<C: Chain> {
    address: Address,
    chain: Arc<C>,
    access: AccessGate,
    fee: RwLock<FeeConfig>,
    slippage: SlippageConfig,
    slippage_overrides: RwLock<HashMap<Address, u16>>,
    wrapped_native: TokenId,
    intermediates: Vec<TokenId>,
    receipts: RwLock<Vec<SwapReceipt>>,
    events: RwLock<Vec<RouterEvent>>,
    busy: AtomicBool,
}

impl<C: Chain> SwapRouter<C> {
    pub fn new(address: Address, config: RouterConfig, chain: Arc<C>) -> Result<Self> {
        if address.is_zero() {
            return Err(SwapError::InvalidRequest {
                reason: "router address must be non-zero".to_string(),
            });
        }
        config.validate()?;
        Ok(Self {
            address,
            chain,
            access: AccessGate::new(config.admin),
            fee: RwLock::new(config.fee),
            slippage: config.slippage,
            slippage_overrides: RwLock::new(HashMap::new()),
            wrapped_native: config.wrapped_native,
            intermediates: config.route_intermediates,
            receipts: RwLock::new(Vec::new()),
            events: RwLock::new(Vec::new()),
            busy: AtomicBool::new(false),
        })
    }

    /// Claim the per-call mutex. A nested or overlapping claim is rejected
    /// rather than queued; the caller retries.
    fn enter(&self) -> Result<ReentrancyToken<'_>> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(SwapError::ReentrancyDetected);
        }
        Ok(ReentrancyToken(&self.busy))
    }

    // -----------------------------------------------------------------------
    // Swap entry points
    // -----------------------------------------------------------------------

    /// Native-asset-in convenience path with automatic fee-tier selection.
    /// The attached `ctx.value` is the swap amount.
    pub async fn swap(
        &self,
        ctx: CallContext,
        token_out: TokenId,
        amount_out_min: Amount,
        recipient: Address,
        deadline: u64,
    ) -> Result<SwapReceipt> {
        self.execute(
            ctx,
            SwapRequest {
                input: SwapInput::Native { amount: ctx.value },
                token_out,
                recipient,
                deadline,
                fee_tier: None,
                limit: OutputLimit::MinOut(amount_out_min),
            },
        )
        .await
    }

    /// Native-asset-in path pinned to an explicit fee tier.
    pub async fn swap_with_fee_tier(
        &self,
        ctx: CallContext,
        token_out: TokenId,
        amount_out_min: Amount,
        fee_tier: FeeTier,
        recipient: Address,
        deadline: u64,
    ) -> Result<SwapReceipt> {
        self.execute(
            ctx,
            SwapRequest {
                input: SwapInput::Native { amount: ctx.value },
                token_out,
                recipient,
                deadline,
                fee_tier: Some(fee_tier),
                limit: OutputLimit::MinOut(amount_out_min),
            },
        )
        .await
    }

    /// Native-asset-in path with a caller-controlled tolerance instead of an
    /// explicit minimum. `slippage_bps == 0` is rejected here; the
    /// zero-tolerance path exists only as `Tolerance::Exact` via `execute`.
    pub async fn swap_with_slippage(
        &self,
        ctx: CallContext,
        token_out: TokenId,
        slippage_bps: u16,
        fee_tier: Option<FeeTier>,
        recipient: Address,
        deadline: u64,
    ) -> Result<SwapReceipt> {
        self.execute(
            ctx,
            SwapRequest {
                input: SwapInput::Native { amount: ctx.value },
                token_out,
                recipient,
                deadline,
                fee_tier,
                limit: OutputLimit::Slippage(Tolerance::Bounded(slippage_bps)),
            },
        )
        .await
    }

    /// General entry point; token-denominated input included.
    pub async fn execute(&self, ctx: CallContext, request: SwapRequest) -> Result<SwapReceipt> {
        let _guard = self.enter()?;
        self.access.authorize(&ctx.caller).await?;
        self.validate_request(&ctx, &request).await?;
        let limit = self.resolve_limit(&ctx.caller, &request.limit).await?;

        let checkpoint = self.chain.checkpoint().await;
        let mut phase = SwapPhase::Idle;
        match self.run(&ctx, &request, limit, &mut phase).await {
            Ok(receipt) => {
                self.chain.commit(checkpoint).await;
                self.receipts.write().await.push(receipt.clone());
                self.events.write().await.push(RouterEvent::SwapExecuted {
                    caller: receipt.caller,
                    token_in: receipt.token_in,
                    token_out: receipt.token_out,
                    amount_in: receipt.amount_in,
                    fee_taken: receipt.fee_taken,
                    amount_out: receipt.amount_out,
                    fee_tier: receipt.fee_tier,
                });
                info!(
                    caller = %receipt.caller,
                    token_in = %receipt.token_in,
                    token_out = %receipt.token_out,
                    amount_in = receipt.amount_in,
                    fee = receipt.fee_taken,
                    amount_out = receipt.amount_out,
                    tier = %receipt.fee_tier,
                    "swap executed"
                );
                Ok(receipt)
            }
            Err(err) => {
                self.chain.rollback(checkpoint).await;
                warn!(
                    caller = %ctx.caller,
                    failed_in = %phase,
                    error = %err,
                    "swap reverted, all effects unwound"
                );
                Err(err)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Admin and preference surface
    // -----------------------------------------------------------------------

    /// Add or remove an agent. Admin-only. Re-registering with the same
    /// flag succeeds without emitting a duplicate event.
    pub async fn register_agent(
        &self,
        ctx: CallContext,
        address: Address,
        enabled: bool,
    ) -> Result<()> {
        let _guard = self.enter()?;
        let changed = self.access.register(&ctx.caller, address, enabled).await?;
        if changed {
            self.events
                .write()
                .await
                .push(RouterEvent::AgentRegistered { address, enabled });
            info!(agent = %address, enabled, "agent registry updated");
        }
        Ok(())
    }

    /// Replace the fee configuration. Admin-only.
    pub async fn set_fee_config(
        &self,
        ctx: CallContext,
        fee_bps: u16,
        recipient: Address,
    ) -> Result<()> {
        let _guard = self.enter()?;
        self.access.require_admin(&ctx.caller).await?;
        let config = FeeConfig::new(fee_bps, recipient)?;
        *self.fee.write().await = config;
        self.events
            .write()
            .await
            .push(RouterEvent::FeeConfigUpdated { fee_bps, recipient });
        info!(fee_bps, recipient = %recipient, "fee config updated");
        Ok(())
    }

    /// Store the caller's own default slippage tolerance, bounded by the
    /// deployment ceiling.
    pub async fn set_default_slippage(&self, ctx: CallContext, bps: u16) -> Result<()> {
        let _guard = self.enter()?;
        self.access.authorize(&ctx.caller).await?;
        let bps = slippage::validate(Tolerance::Bounded(bps), self.slippage.max_bps)?;
        self.slippage_overrides.write().await.insert(ctx.caller, bps);
        debug!(caller = %ctx.caller, bps, "caller slippage preference stored");
        Ok(())
    }

    /// Hand the admin role over. Admin-only; the distinct privileged
    /// operation that removes the current admin.
    pub async fn transfer_admin(&self, ctx: CallContext, new_admin: Address) -> Result<()> {
        let _guard = self.enter()?;
        let previous = self.access.transfer_admin(&ctx.caller, new_admin).await?;
        self.events
            .write()
            .await
            .push(RouterEvent::AdminTransferred {
                previous,
                new_admin,
            });
        info!(previous = %previous, new_admin = %new_admin, "admin transferred");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Read-only surface
    // -----------------------------------------------------------------------

    pub fn address(&self) -> Address {
        self.address
    }

    pub async fn admin(&self) -> Address {
        self.access.admin().await
    }

    pub async fn is_agent(&self, address: &Address) -> bool {
        self.access.is_agent(address).await
    }

    pub async fn fee_config(&self) -> FeeConfig {
        self.fee.read().await.clone()
    }

    pub async fn find_best_fee_tier(&self, token_a: &TokenId, token_b: &TokenId) -> Result<FeeTier> {
        locator::find_best_fee_tier(&*self.chain, token_a, token_b).await
    }

    pub async fn get_pool_info(
        &self,
        token_a: &TokenId,
        token_b: &TokenId,
        tier: FeeTier,
    ) -> Option<PoolInfo> {
        self.chain.pool(token_a, token_b, tier).await
    }

    /// Preview a swap against current reserves without touching any state.
    pub async fn quote(
        &self,
        input: &SwapInput,
        token_out: &TokenId,
        fee_tier: Option<FeeTier>,
    ) -> Result<SwapQuote> {
        let (token_in, amount_in) = match input {
            SwapInput::Native { amount } => (self.wrapped_native, *amount),
            SwapInput::Token { token_id, amount } => (*token_id, *amount),
        };
        if amount_in == 0 {
            return Err(SwapError::InvalidRequest {
                reason: "amount must be positive".to_string(),
            });
        }
        let fee_config = self.fee.read().await.clone();
        let (fee_amount, net_amount) = fees::split(amount_in, &fee_config);
        let route = locator::locate_route(
            &*self.chain,
            &token_in,
            token_out,
            fee_tier,
            &self.intermediates,
        )
        .await?;
        let amount_out = self.quote_route(&route, net_amount).await?;
        Ok(SwapQuote {
            token_in,
            token_out: *token_out,
            amount_in,
            fee_amount,
            net_amount,
            amount_out,
            min_out_suggested: slippage::min_out(amount_out, self.slippage.default_bps),
            fee_tier: route.entry_tier(),
        })
    }

    pub async fn receipts(&self) -> Vec<SwapReceipt> {
        self.receipts.read().await.clone()
    }

    pub async fn events(&self) -> Vec<RouterEvent> {
        self.events.read().await.clone()
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    async fn validate_request(&self, ctx: &CallContext, request: &SwapRequest) -> Result<()> {
        let invalid = |reason: &str| SwapError::InvalidRequest {
            reason: reason.to_string(),
        };

        if request.input.amount() == 0 {
            return Err(invalid("amount must be positive"));
        }
        if request.recipient.is_zero() {
            return Err(invalid("recipient must be non-zero"));
        }
        match &request.input {
            SwapInput::Native { amount } => {
                if ctx.value != *amount {
                    return Err(invalid("attached value must equal the swap amount"));
                }
                if request.token_out == self.wrapped_native {
                    return Err(invalid("cannot swap native for its wrapped form"));
                }
            }
            SwapInput::Token { token_id, .. } => {
                if ctx.value != 0 {
                    return Err(invalid("unexpected native value on token input"));
                }
                if *token_id == request.token_out {
                    return Err(invalid("input and output tokens are identical"));
                }
            }
        }

        let now = self.chain.timestamp().await;
        if request.deadline <= now {
            return Err(SwapError::DeadlineExpired {
                deadline: request.deadline,
                now,
            });
        }
        Ok(())
    }

    async fn resolve_limit(&self, caller: &Address, limit: &OutputLimit) -> Result<ResolvedLimit> {
        match limit {
            OutputLimit::MinOut(min) => Ok(ResolvedLimit::Min(*min)),
            OutputLimit::Slippage(tolerance) => Ok(ResolvedLimit::Tolerance(slippage::validate(
                *tolerance,
                self.slippage.max_bps,
            )?)),
            OutputLimit::Default => {
                let bps = self
                    .slippage_overrides
                    .read()
                    .await
                    .get(caller)
                    .copied()
                    .unwrap_or(self.slippage.default_bps);
                Ok(ResolvedLimit::Tolerance(bps))
            }
        }
    }

    async fn quote_route(&self, route: &Route, amount_in: Amount) -> Result<Amount> {
        let mut amount = amount_in;
        for hop in &route.hops {
            amount = self
                .chain
                .quote_exact_input(&hop.pool.pool_id, &hop.token_in, amount)
                .await?;
        }
        Ok(amount)
    }

    /// Steps 2–10. Runs inside the caller's checkpoint; every `?` here
    /// unwinds the whole call.
    async fn run(
        &self,
        ctx: &CallContext,
        request: &SwapRequest,
        limit: ResolvedLimit,
        phase: &mut SwapPhase,
    ) -> Result<SwapReceipt> {
        let caller = ctx.caller;
        let router = self.address;

        let (token_in, amount_in, native_in) = match &request.input {
            SwapInput::Native { amount } => (self.wrapped_native, *amount, true),
            SwapInput::Token { token_id, amount } => (*token_id, *amount, false),
        };
        let pre_balance = self.chain.balance_of(&token_in, &router).await;

        // Acquire the input leg.
        if native_in {
            *phase = SwapPhase::Wrapping;
            debug!(%phase, amount = amount_in, "wrapping native input");
            self.chain.native_transfer(&caller, &router, amount_in).await?;
            self.chain.deposit_native(&router, amount_in).await?;
        } else {
            self.chain
                .transfer_from(&token_in, &caller, &router, &router, amount_in)
                .await?;
        }

        // Protocol fee, off the top, before the swap leg.
        let fee_config = self.fee.read().await.clone();
        let (fee_taken, net_amount) = fees::split(amount_in, &fee_config);
        if fee_taken > 0 {
            self.chain
                .transfer(&token_in, &router, &fee_config.fee_recipient, fee_taken)
                .await?;
        }

        // Route and floor.
        let route = locator::locate_route(
            &*self.chain,
            &token_in,
            &request.token_out,
            request.fee_tier,
            &self.intermediates,
        )
        .await?;
        let quoted_out = self.quote_route(&route, net_amount).await?;
        let min_out = match limit {
            ResolvedLimit::Min(min) => min,
            ResolvedLimit::Tolerance(bps) => slippage::min_out(quoted_out, bps),
        };

        // Approve exactly the hop amount, then swap, for each hop.
        let amm = self.chain.amm_address();
        let mut hop_token = token_in;
        let mut hop_amount = net_amount;
        for hop in &route.hops {
            *phase = SwapPhase::Approving;
            debug!(%phase, pool = %hop.pool.pool_id, amount = hop_amount, "granting exact allowance");
            self.chain.approve(&hop_token, &router, &amm, hop_amount).await?;

            *phase = SwapPhase::Swapping;
            hop_amount = self
                .chain
                .swap_exact_input(&hop.pool.pool_id, &hop_token, hop_amount, &router, &router)
                .await?;
            hop_token = hop.token_out;
        }
        let amount_out = hop_amount;

        slippage::enforce(amount_out, min_out)?;

        // Settle output, refund any input-token remainder.
        *phase = SwapPhase::Settling;
        self.chain
            .transfer(&request.token_out, &router, &request.recipient, amount_out)
            .await?;

        let post_balance = self.chain.balance_of(&token_in, &router).await;
        let leftover = post_balance.saturating_sub(pre_balance);
        if leftover > 0 {
            if native_in {
                self.chain.withdraw_native(&router, leftover).await?;
                self.chain.native_transfer(&router, &caller, leftover).await?;
            } else {
                self.chain.transfer(&token_in, &router, &caller, leftover).await?;
            }
            debug!(leftover, "refunded input remainder to caller");
        }

        *phase = SwapPhase::Done;
        let timestamp = self.chain.timestamp().await;
        Ok(SwapReceipt {
            caller,
            token_in,
            token_out: request.token_out,
            amount_in,
            fee_taken,
            amount_out,
            fee_tier: route.entry_tier(),
            timestamp,
        })
    }
}
