// Copyright (c) 2024 Botho Foundation

//! Treasury: tax and seigniorage policy.
//!
//! During an epoch the ante collaborator records tax proceeds and taxable
//! volume into the current indicator slot. On the epoch's last block the
//! treasury settles seigniorage, updates the tax rate and reward weight
//! (after the probation period), and opens the next epoch's slot.

pub mod seigniorage;
pub mod tax;
pub mod window;

pub use seigniorage::{issuance_snapshot, reward_weight, SeigniorageController, DEFAULT_REWARD_WEIGHT};
pub use tax::{compute_tax, rolling_average, tax_rate, tax_ratio, TaxPolicyController, DEFAULT_TAX_RATE};
pub use window::{EpochIndicators, IndicatorWindow};

use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::{
    context::Context,
    dec::Dec,
    error::StabilityResult,
    event::{Event, EVENT_POLICY_PROBATION, EVENT_POLICY_UPDATE},
    oracle,
    store::{KvStore, StoreResult},
    types::Coin,
};

/// Converts stable-denom amounts to native units at the latest oracle rate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NativeConverter {
    native_denom: String,
    /// Units of each denom per native unit.
    rates: BTreeMap<String, Dec>,
}

impl NativeConverter {
    pub fn new(native_denom: impl Into<String>, rates: BTreeMap<String, Dec>) -> Self {
        Self {
            native_denom: native_denom.into(),
            rates,
        }
    }

    /// Build from every stored price record, active or stale.
    pub fn load(store: &dyn KvStore, native_denom: &str) -> StoreResult<Self> {
        let rates = oracle::price_records(store)?
            .into_iter()
            .map(|r| (r.denom, r.rate))
            .collect();
        Ok(Self::new(native_denom, rates))
    }

    /// `amount / rate`; native is at par. `None` for unpriced denoms.
    pub fn to_native(&self, denom: &str, amount: u64) -> Option<Dec> {
        if denom == self.native_denom {
            return Some(Dec::from_u64(amount));
        }
        let rate = self.rates.get(denom)?;
        Dec::from_u64(amount).checked_quo(*rate)
    }

    /// Native value of a per-denom map, skipping unpriced denoms.
    pub fn total(&self, amounts: &BTreeMap<String, u64>) -> Dec {
        amounts
            .iter()
            .filter_map(|(denom, amount)| self.to_native(denom, *amount))
            .fold(Dec::ZERO, |acc, v| acc + v)
    }
}

fn current_slot(ctx: &Context<'_>) -> StoreResult<(IndicatorWindow, EpochIndicators)> {
    let window = IndicatorWindow::new(ctx.params().treasury.window_length);
    let epoch = ctx.epoch();
    let indicators = match window.load(&*ctx.store, epoch)? {
        Some(indicators) => indicators,
        None => EpochIndicators::new(epoch, tax_rate(&*ctx.store)?, reward_weight(&*ctx.store)?),
    };
    Ok((window, indicators))
}

/// Add collected tax to the current epoch.
pub fn record_tax_proceeds(ctx: &mut Context<'_>, coins: &[Coin]) -> StabilityResult<()> {
    let (window, mut indicators) = current_slot(ctx)?;
    for coin in coins {
        indicators.add_tax_proceeds(coin);
    }
    window.save(ctx.store, &indicators)?;
    Ok(())
}

/// Add taxable transaction volume to the current epoch.
pub fn record_tx_volume(ctx: &mut Context<'_>, coins: &[Coin]) -> StabilityResult<()> {
    let (window, mut indicators) = current_slot(ctx)?;
    for coin in coins {
        indicators.add_tx_volume(coin);
    }
    window.save(ctx.store, &indicators)?;
    Ok(())
}

/// Tax owed on a transfer at the current rate and cap.
pub fn tax_for(ctx: &Context<'_>, coin: &Coin) -> StabilityResult<u64> {
    Ok(compute_tax(
        &*ctx.store,
        &ctx.params().treasury,
        coin.amount,
        &coin.denom,
    )?)
}

/// Settle the epoch ending at `ctx.height()`.
pub fn end_epoch(ctx: &mut Context<'_>) -> StabilityResult<()> {
    let params = ctx.params().treasury.clone();
    let (window, mut elapsed) = current_slot(ctx)?;
    let epoch = elapsed.epoch;

    let old_rate = tax_rate(&*ctx.store)?;
    let old_weight = reward_weight(&*ctx.store)?;
    elapsed.tax_rate = old_rate;
    elapsed.reward_weight = old_weight;

    seigniorage::settle(ctx, &mut elapsed)?;
    window.save(ctx.store, &elapsed)?;

    let (new_rate, new_weight) = if epoch < params.window_probation {
        debug!(epoch, probation = params.window_probation, "Policy on probation");
        ctx.emit(Event::new(EVENT_POLICY_PROBATION).attr("epoch", epoch));
        (old_rate, old_weight)
    } else {
        let converter = NativeConverter::load(&*ctx.store, &ctx.params().clock.native_denom)?;
        let recent = window.recent(&*ctx.store, epoch)?;

        let ratios: Vec<Option<Dec>> = recent.iter().map(|i| tax_ratio(i, &converter)).collect();
        let new_rate = TaxPolicyController::new(&params).next_rate(
            old_rate,
            tax_ratio(&elapsed, &converter),
            rolling_average(&ratios),
        );

        let seigniorage_sum = recent
            .iter()
            .fold(Dec::ZERO, |acc, i| acc + Dec::from_u64(i.seigniorage));
        let tax_sum = recent
            .iter()
            .fold(Dec::ZERO, |acc, i| acc + converter.total(&i.tax_proceeds));
        let new_weight =
            SeigniorageController::new(&params).next_weight(old_weight, seigniorage_sum, tax_sum);

        tax::set_tax_rate(ctx.store, new_rate)?;
        seigniorage::set_reward_weight(ctx.store, new_weight)?;

        info!(epoch, %old_rate, %new_rate, %old_weight, %new_weight, "Treasury policy updated");
        ctx.emit(
            Event::new(EVENT_POLICY_UPDATE)
                .attr("epoch", epoch)
                .attr("tax_rate", new_rate)
                .attr("reward_weight", new_weight),
        );
        (new_rate, new_weight)
    };

    window.save(ctx.store, &EpochIndicators::new(epoch + 1, new_rate, new_weight))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_converter() {
        let mut rates = BTreeMap::new();
        rates.insert("ukrw".to_string(), Dec::from_int(4));
        rates.insert("uzero".to_string(), Dec::ZERO);
        let converter = NativeConverter::new("ubth", rates);

        assert_eq!(converter.to_native("ubth", 10), Some(Dec::from_int(10)));
        assert_eq!(converter.to_native("ukrw", 10), Some("2.5".parse().unwrap()));
        assert_eq!(converter.to_native("uzero", 10), None);
        assert_eq!(converter.to_native("unknown", 10), None);
    }
}
