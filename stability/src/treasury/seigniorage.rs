// Copyright (c) 2024 Botho Foundation

//! Seigniorage settlement and the reward weight controller.
//!
//! Swapping native into stable denominations burns native supply. At each
//! epoch boundary the contraction since the last snapshot is re-minted as
//! seigniorage and split by the reward weight:
//!
//! ```text
//! S            = max(0, issuance_snapshot − native_supply)
//! miner_reward = trunc(S × reward_weight)     → reward pool
//! remainder    = S − miner_reward             → budget pool
//! ```
//!
//! The weight then steers the seigniorage burden `S / (S + T)` over the
//! indicator window toward its target, `T` being native tax proceeds.

use tracing::info;

use crate::{
    context::Context,
    dec::Dec,
    error::StabilityResult,
    event::{Event, EVENT_SEIGNIORAGE},
    params::TreasuryParams,
    store::{get_value, set_value, KvStore, StoreResult},
    treasury::window::EpochIndicators,
    types::{Coin, ModuleAccount},
};

const KEY_REWARD_WEIGHT: &[u8] = b"treasury/reward_weight";
const KEY_ISSUANCE: &[u8] = b"treasury/issuance";

/// Reward weight used before the first stored value (5%).
pub const DEFAULT_REWARD_WEIGHT: Dec = Dec::from_raw(50_000_000_000_000_000);

pub struct SeigniorageController<'a> {
    params: &'a TreasuryParams,
}

impl<'a> SeigniorageController<'a> {
    pub fn new(params: &'a TreasuryParams) -> Self {
        Self { params }
    }

    /// `(miner_reward, budget_share)` of `seigniorage`.
    pub fn split(&self, seigniorage: u64, weight: Dec) -> (u64, u64) {
        let miner = weight.clamp_to(Dec::ZERO, Dec::ONE).mul_u64_trunc(seigniorage);
        (miner, seigniorage - miner)
    }

    /// `S / (S + T)`, `None` when both are zero.
    pub fn burden(seigniorage: Dec, tax: Dec) -> Option<Dec> {
        seigniorage.checked_quo(seigniorage + tax)
    }

    /// `old × (target / burden)`, bounded to `[0, 1]` and the reward policy.
    /// A zero or undefined burden leaves the weight unchanged.
    pub fn next_weight(&self, old: Dec, seigniorage_sum: Dec, tax_sum: Dec) -> Dec {
        let burden = match Self::burden(seigniorage_sum, tax_sum) {
            Some(b) if b.is_positive() => b,
            _ => return old,
        };
        let Some(ratio) = self.params.seigniorage_burden_target.checked_quo(burden) else {
            return old;
        };
        self.params
            .reward_policy
            .clamp(old, old * ratio)
            .clamp_to(Dec::ZERO, Dec::ONE)
    }
}

pub fn reward_weight(store: &dyn KvStore) -> StoreResult<Dec> {
    Ok(get_value(store, KEY_REWARD_WEIGHT)?.unwrap_or(DEFAULT_REWARD_WEIGHT))
}

pub(crate) fn set_reward_weight(store: &mut dyn KvStore, weight: Dec) -> StoreResult<()> {
    set_value(store, KEY_REWARD_WEIGHT, &weight)
}

/// Native supply recorded at the last settlement.
pub fn issuance_snapshot(store: &dyn KvStore) -> StoreResult<Option<u64>> {
    get_value(store, KEY_ISSUANCE)
}

pub(crate) fn set_issuance_snapshot(store: &mut dyn KvStore, supply: u64) -> StoreResult<()> {
    set_value(store, KEY_ISSUANCE, &supply)
}

/// Mint this epoch's seigniorage into the pools and record it in
/// `indicators`. Retakes the issuance snapshot afterwards.
pub(crate) fn settle(ctx: &mut Context<'_>, indicators: &mut EpochIndicators) -> StabilityResult<()> {
    let native = ctx.params().clock.native_denom.clone();
    let supply = ctx.bank.supply(&native);
    let snapshot = issuance_snapshot(&*ctx.store)?.unwrap_or(supply);
    let seigniorage = snapshot.saturating_sub(supply);

    let treasury = ctx.params().treasury.clone();
    let (miner, budget) =
        SeigniorageController::new(&treasury).split(seigniorage, indicators.reward_weight);

    if miner > 0 {
        ctx.bank
            .credit(&ModuleAccount::RewardPool.address(), &Coin::new(native.clone(), miner))?;
    }
    if budget > 0 {
        ctx.bank
            .credit(&ModuleAccount::BudgetPool.address(), &Coin::new(native.clone(), budget))?;
    }
    indicators.seigniorage = seigniorage;
    indicators.miner_reward = miner;

    let retaken = ctx.bank.supply(&native);
    set_issuance_snapshot(ctx.store, retaken)?;

    info!(
        epoch = indicators.epoch,
        seigniorage, miner, budget, "Seigniorage settled"
    );
    ctx.emit(
        Event::new(EVENT_SEIGNIORAGE)
            .attr("epoch", indicators.epoch)
            .attr("seigniorage", seigniorage)
            .attr("miner_reward", miner)
            .attr("budget", budget),
    );
    Ok(())
}
