// Copyright (c) 2024 Botho Foundation

//! Tax rate controller.
//!
//! The effective tax ratio of an epoch is what the chain actually collected
//! relative to taxable volume, both in native units:
//!
//! ```text
//! ratio(e) = Σ tax_proceeds(e) / Σ tx_volume(e)
//! ```
//!
//! At each epoch boundary the rate moves in one of two regimes:
//!
//! - undefined or below the floor: `rate × mining_increment`, to pull the
//!   chain out of an untaxed state quickly;
//! - otherwise: `rate + (target − rolling_average)`, a proportional step
//!   toward the target ratio.
//!
//! Either way the result is clamped by the tax policy constraints.

use crate::{
    dec::Dec,
    params::TreasuryParams,
    store::{get_value, set_value, KvStore, StoreResult},
    treasury::{window::EpochIndicators, NativeConverter},
};

const KEY_TAX_RATE: &[u8] = b"treasury/tax_rate";

/// Tax rate used before the first stored value (0.1%).
pub const DEFAULT_TAX_RATE: Dec = Dec::from_raw(1_000_000_000_000_000);

pub struct TaxPolicyController<'a> {
    params: &'a TreasuryParams,
}

impl<'a> TaxPolicyController<'a> {
    pub fn new(params: &'a TreasuryParams) -> Self {
        Self { params }
    }

    /// Next tax rate from the elapsed epoch's ratio and the window average.
    pub fn next_rate(&self, old: Dec, elapsed_ratio: Option<Dec>, rolling_average: Dec) -> Dec {
        let proposed = match elapsed_ratio {
            Some(ratio) if ratio >= self.params.tax_ratio_floor => {
                old + (self.params.tax_ratio_target - rolling_average)
            }
            _ => old * self.params.mining_increment,
        };
        self.params.tax_policy.clamp(old, proposed)
    }
}

/// Effective tax ratio of one epoch; `None` without priced volume.
pub fn tax_ratio(indicators: &EpochIndicators, converter: &NativeConverter) -> Option<Dec> {
    let proceeds = converter.total(&indicators.tax_proceeds);
    let volume = converter.total(&indicators.tx_volume);
    if !volume.is_positive() {
        return None;
    }
    proceeds.checked_quo(volume)
}

/// Mean of the defined ratios; zero when none are defined.
pub fn rolling_average(ratios: &[Option<Dec>]) -> Dec {
    let defined: Vec<Dec> = ratios.iter().flatten().copied().collect();
    let sum = defined.iter().fold(Dec::ZERO, |acc, r| acc + *r);
    sum.checked_quo(Dec::from_u64(defined.len() as u64))
        .unwrap_or(Dec::ZERO)
}

pub fn tax_rate(store: &dyn KvStore) -> StoreResult<Dec> {
    Ok(get_value(store, KEY_TAX_RATE)?.unwrap_or(DEFAULT_TAX_RATE))
}

pub(crate) fn set_tax_rate(store: &mut dyn KvStore, rate: Dec) -> StoreResult<()> {
    set_value(store, KEY_TAX_RATE, &rate)
}

/// Tax owed on a transfer of `amount`: `min(trunc(rate × amount), cap)`.
pub fn compute_tax(
    store: &dyn KvStore,
    params: &TreasuryParams,
    amount: u64,
    denom: &str,
) -> StoreResult<u64> {
    let rate = tax_rate(store)?;
    Ok(rate.mul_u64_trunc(amount).min(params.tax_cap(denom)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemStore;
    use std::collections::BTreeMap;

    fn dec(s: &str) -> Dec {
        s.parse().unwrap()
    }

    #[test]
    fn test_multiplicative_branch() {
        let params = TreasuryParams::default();
        let controller = TaxPolicyController::new(&params);
        // undefined ratio: 0.001 × 1.07 = 0.00107
        assert_eq!(controller.next_rate(dec("0.001"), None, Dec::ZERO), dec("0.00107"));
        // below floor
        assert_eq!(
            controller.next_rate(dec("0.001"), Some(dec("0.0001")), dec("0.0001")),
            dec("0.00107")
        );
        // growth limited by change_rate_max
        assert_eq!(controller.next_rate(dec("0.008"), None, Dec::ZERO), dec("0.00825"));
    }

    #[test]
    fn test_additive_branch() {
        let params = TreasuryParams::default();
        let controller = TaxPolicyController::new(&params);
        // target 0.001, average 0.0009: +0.0001
        assert_eq!(
            controller.next_rate(dec("0.002"), Some(dec("0.0009")), dec("0.0009")),
            dec("0.0021")
        );
        // average above target lowers the rate, limited to -0.00025
        assert_eq!(
            controller.next_rate(dec("0.002"), Some(dec("0.005")), dec("0.005")),
            dec("0.00175")
        );
        // never below rate_min
        assert_eq!(
            controller.next_rate(dec("0.0006"), Some(dec("0.005")), dec("0.005")),
            dec("0.0005")
        );
    }

    #[test]
    fn test_rolling_average() {
        assert_eq!(rolling_average(&[]), Dec::ZERO);
        assert_eq!(rolling_average(&[None, None]), Dec::ZERO);
        assert_eq!(
            rolling_average(&[Some(dec("0.001")), None, Some(dec("0.003"))]),
            dec("0.002")
        );
    }

    #[test]
    fn test_tax_ratio_in_native_units() {
        let mut prices = BTreeMap::new();
        prices.insert("ukrw".to_string(), dec("1000"));
        let converter = NativeConverter::new("ubth", prices);

        let mut ind = EpochIndicators::default();
        assert_eq!(tax_ratio(&ind, &converter), None);

        // 2000 ukrw = 2 ubth of proceeds over 1000 ubth of volume
        ind.add_tax_proceeds(&crate::types::Coin::new("ukrw", 2000));
        ind.add_tx_volume(&crate::types::Coin::new("ubth", 1000));
        // unpriced denoms are skipped
        ind.add_tx_volume(&crate::types::Coin::new("uzzz", 1_000_000));
        assert_eq!(tax_ratio(&ind, &converter), Some(dec("0.002")));
    }

    #[test]
    fn test_compute_tax_caps() {
        let mut store = MemStore::new();
        let mut params = TreasuryParams::default();
        params.tax_caps.insert("usdr".into(), 50);

        // default rate 0.001
        assert_eq!(compute_tax(&store, &params, 10_000, "usdr").unwrap(), 10);
        assert_eq!(compute_tax(&store, &params, 999, "usdr").unwrap(), 0);
        assert_eq!(compute_tax(&store, &params, 1_000_000, "usdr").unwrap(), 50);

        set_tax_rate(&mut store, dec("0.01")).unwrap();
        assert_eq!(compute_tax(&store, &params, 1_000, "ukrw").unwrap(), 10);
    }
}
