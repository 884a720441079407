// Copyright (c) 2024 Botho Foundation

//! Ring buffer of per-epoch indicators.
//!
//! Epoch `e` lives in slot `e mod window_length`. A slot is only valid for
//! epoch `e` if it records `e`; anything else is a stale leftover from an
//! earlier lap and reads as empty.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{
    dec::Dec,
    store::{get_value, set_value, Key, KvStore, StoreResult},
    types::Coin,
};

const WINDOW_PREFIX: &str = "treasury/window/";

/// Everything the policy controllers need to know about one epoch.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochIndicators {
    pub epoch: u64,

    /// Tax collected per denom.
    pub tax_proceeds: BTreeMap<String, u64>,

    /// Taxable transaction volume per denom.
    pub tx_volume: BTreeMap<String, u64>,

    /// Native units minted as seigniorage at the end of the epoch.
    pub seigniorage: u64,

    /// Share of seigniorage paid to the reward pool.
    pub miner_reward: u64,

    /// Tax rate in force during the epoch.
    pub tax_rate: Dec,

    /// Reward weight in force during the epoch.
    pub reward_weight: Dec,
}

impl EpochIndicators {
    pub fn new(epoch: u64, tax_rate: Dec, reward_weight: Dec) -> Self {
        Self {
            epoch,
            tax_rate,
            reward_weight,
            ..Default::default()
        }
    }

    pub fn add_tax_proceeds(&mut self, coin: &Coin) {
        let entry = self.tax_proceeds.entry(coin.denom.clone()).or_default();
        *entry = entry.saturating_add(coin.amount);
    }

    pub fn add_tx_volume(&mut self, coin: &Coin) {
        let entry = self.tx_volume.entry(coin.denom.clone()).or_default();
        *entry = entry.saturating_add(coin.amount);
    }
}

/// Fixed-size view over the indicator slots.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IndicatorWindow {
    length: u64,
}

impl IndicatorWindow {
    pub fn new(length: u64) -> Self {
        Self {
            length: length.max(1),
        }
    }

    pub fn length(&self) -> u64 {
        self.length
    }

    pub fn slot(&self, epoch: u64) -> u64 {
        epoch % self.length
    }

    fn key(&self, epoch: u64) -> Vec<u8> {
        Key::new(WINDOW_PREFIX).u64(self.slot(epoch)).build()
    }

    /// Indicators of `epoch`, if its slot has not been overwritten.
    pub fn load(&self, store: &dyn KvStore, epoch: u64) -> StoreResult<Option<EpochIndicators>> {
        let slot: Option<EpochIndicators> = get_value(store, &self.key(epoch))?;
        Ok(slot.filter(|s| s.epoch == epoch))
    }

    pub fn save(&self, store: &mut dyn KvStore, indicators: &EpochIndicators) -> StoreResult<()> {
        set_value(store, &self.key(indicators.epoch), indicators)
    }

    /// Valid indicators of the last `length` epochs ending at `epoch`,
    /// oldest first.
    pub fn recent(&self, store: &dyn KvStore, epoch: u64) -> StoreResult<Vec<EpochIndicators>> {
        let first = epoch.saturating_sub(self.length - 1);
        let mut out = Vec::new();
        for e in first..=epoch {
            if let Some(indicators) = self.load(store, e)? {
                out.push(indicators);
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemStore;

    #[test]
    fn test_stale_slot_reads_as_empty() {
        let mut store = MemStore::new();
        let window = IndicatorWindow::new(4);
        window
            .save(&mut store, &EpochIndicators::new(1, Dec::ZERO, Dec::ZERO))
            .unwrap();

        assert!(window.load(&store, 1).unwrap().is_some());
        // epoch 5 maps to the same slot but has not been written
        assert!(window.load(&store, 5).unwrap().is_none());

        window
            .save(&mut store, &EpochIndicators::new(5, Dec::ZERO, Dec::ZERO))
            .unwrap();
        assert!(window.load(&store, 1).unwrap().is_none());
    }

    #[test]
    fn test_recent_covers_window() {
        let mut store = MemStore::new();
        let window = IndicatorWindow::new(3);
        for e in 0..6 {
            window
                .save(&mut store, &EpochIndicators::new(e, Dec::ZERO, Dec::ZERO))
                .unwrap();
        }
        let epochs: Vec<_> = window
            .recent(&store, 5)
            .unwrap()
            .iter()
            .map(|i| i.epoch)
            .collect();
        assert_eq!(epochs, vec![3, 4, 5]);
        assert_eq!(window.recent(&store, 0).unwrap().len(), 0);
    }

    #[test]
    fn test_accumulate() {
        let mut ind = EpochIndicators::default();
        ind.add_tax_proceeds(&Coin::new("usdr", 5));
        ind.add_tax_proceeds(&Coin::new("usdr", 7));
        ind.add_tx_volume(&Coin::new("ukrw", u64::MAX));
        ind.add_tx_volume(&Coin::new("ukrw", 1));
        assert_eq!(ind.tax_proceeds["usdr"], 12);
        assert_eq!(ind.tx_volume["ukrw"], u64::MAX);
    }
}
