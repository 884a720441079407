// Copyright (c) 2024 Botho Foundation

//! Power-weighted median aggregation and price records.

use serde::{Deserialize, Serialize};

use crate::{
    dec::Dec,
    params::OracleParams,
    store::{get_value, prefix_values, set_value, Key, KvStore, StoreResult},
    types::ValAddress,
};

const PRICE_PREFIX: &str = "oracle/price/";

/// One revealed rate with the voter's power at tally time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BallotEntry {
    pub voter: ValAddress,
    pub rate: Dec,
    pub power: u64,
}

/// Latest aggregated exchange rate of a denom in native units.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceRecord {
    pub denom: String,
    pub rate: Dec,
    /// Voting period that produced `rate`.
    pub period: u64,
    /// False once a period fails quorum; `rate` is then stale.
    pub active: bool,
}

/// Result of tallying one denom for one period.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TallyOutcome {
    Active { rate: Dec, reveal_power: u64 },
    Inactive { reveal_power: u64 },
}

/// Power-weighted median of `ballot`.
///
/// Entries are ordered by rate, ties by voter address, and the median is the
/// first rate at which cumulative power reaches half the total. Zero-power
/// entries are ignored; `None` when no power remains.
pub fn weighted_median(ballot: &[BallotEntry]) -> Option<Dec> {
    let mut sorted: Vec<&BallotEntry> = ballot.iter().filter(|b| b.power > 0).collect();
    sorted.sort_by(|a, b| a.rate.cmp(&b.rate).then_with(|| a.voter.cmp(&b.voter)));

    let total: u128 = sorted.iter().map(|b| b.power as u128).sum();
    if total == 0 {
        return None;
    }

    let mut cumulative: u128 = 0;
    for entry in sorted {
        cumulative += entry.power as u128;
        if cumulative * 2 >= total {
            return Some(entry.rate);
        }
    }
    None
}

/// Applies the quorum rule before taking the median.
#[derive(Clone, Debug)]
pub struct PriceAggregator {
    vote_threshold: Dec,
}

impl PriceAggregator {
    pub fn new(params: &OracleParams) -> Self {
        Self {
            vote_threshold: params.vote_threshold,
        }
    }

    /// `reveal_power ≥ threshold × total_power`; never with zero total.
    pub fn has_quorum(&self, reveal_power: u64, total_power: u64) -> bool {
        if total_power == 0 {
            return false;
        }
        Dec::from_u64(reveal_power) >= self.vote_threshold * Dec::from_u64(total_power)
    }

    pub fn tally(&self, ballot: &[BallotEntry], total_power: u64) -> TallyOutcome {
        let reveal_power = ballot
            .iter()
            .fold(0u64, |acc, b| acc.saturating_add(b.power));

        if !self.has_quorum(reveal_power, total_power) {
            return TallyOutcome::Inactive { reveal_power };
        }
        match weighted_median(ballot) {
            Some(rate) => TallyOutcome::Active { rate, reveal_power },
            None => TallyOutcome::Inactive { reveal_power },
        }
    }
}

fn price_key(denom: &str) -> Vec<u8> {
    Key::new(PRICE_PREFIX).str(denom).build()
}

pub fn price_record(store: &dyn KvStore, denom: &str) -> StoreResult<Option<PriceRecord>> {
    get_value(store, &price_key(denom))
}

pub(crate) fn set_price_record(store: &mut dyn KvStore, record: &PriceRecord) -> StoreResult<()> {
    set_value(store, &price_key(&record.denom), record)
}

/// Every price record, active or not, ordered by denom.
pub fn price_records(store: &dyn KvStore) -> StoreResult<Vec<PriceRecord>> {
    prefix_values(store, PRICE_PREFIX.as_bytes())
}

pub fn active_price_records(store: &dyn KvStore) -> StoreResult<Vec<PriceRecord>> {
    Ok(price_records(store)?
        .into_iter()
        .filter(|r| r.active)
        .collect())
}
