// Copyright (c) 2024 Botho Foundation

//! Read-only queries over committed state.

use serde::{Deserialize, Serialize};

use crate::{
    budget::{self, Program},
    dec::Dec,
    error::StabilityResult,
    oracle::{self, PriceRecord, VoteState},
    params::Params,
    store::KvStore,
    treasury::{self, EpochIndicators, IndicatorWindow},
    types::ValAddress,
};

/// Snapshot of the treasury policy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreasuryState {
    pub tax_rate: Dec,
    pub reward_weight: Dec,
    pub issuance: Option<u64>,
}

/// Query entry point borrowing a store.
pub struct Querier<'s> {
    store: &'s dyn KvStore,
}

impl<'s> Querier<'s> {
    pub fn new(store: &'s dyn KvStore) -> Self {
        Self { store }
    }

    pub fn params(&self) -> StabilityResult<Params> {
        Ok(Params::load(self.store)?)
    }

    /// Latest rate of `denom`, whether or not it is still active.
    pub fn exchange_rate(&self, denom: &str) -> StabilityResult<Option<PriceRecord>> {
        Ok(oracle::price_record(self.store, denom)?)
    }

    pub fn active_denoms(&self) -> StabilityResult<Vec<String>> {
        Ok(oracle::active_price_records(self.store)?
            .into_iter()
            .map(|r| r.denom)
            .collect())
    }

    pub fn vote_state(
        &self,
        period: u64,
        denom: &str,
        validator: &ValAddress,
    ) -> StabilityResult<VoteState> {
        Ok(oracle::vote_state(self.store, period, denom, validator)?)
    }

    pub fn miss_counter(&self, validator: &ValAddress) -> StabilityResult<u64> {
        Ok(oracle::miss_counter(self.store, validator)?)
    }

    pub fn tax_rate(&self) -> StabilityResult<Dec> {
        Ok(treasury::tax_rate(self.store)?)
    }

    pub fn tax_cap(&self, denom: &str) -> StabilityResult<u64> {
        Ok(self.params()?.treasury.tax_cap(denom))
    }

    pub fn reward_weight(&self) -> StabilityResult<Dec> {
        Ok(treasury::reward_weight(self.store)?)
    }

    pub fn treasury_state(&self) -> StabilityResult<TreasuryState> {
        Ok(TreasuryState {
            tax_rate: self.tax_rate()?,
            reward_weight: self.reward_weight()?,
            issuance: treasury::issuance_snapshot(self.store)?,
        })
    }

    /// Indicators of `epoch`, if still inside the window.
    pub fn indicators(&self, epoch: u64) -> StabilityResult<Option<EpochIndicators>> {
        let window = IndicatorWindow::new(self.params()?.treasury.window_length);
        Ok(window.load(self.store, epoch)?)
    }

    pub fn program(&self, id: u64) -> StabilityResult<Option<Program>> {
        Ok(budget::get_program(self.store, id)?)
    }

    pub fn active_programs(&self) -> StabilityResult<Vec<Program>> {
        Ok(budget::active_programs(self.store)?)
    }

    pub fn candidate_queue_has(&self, end_height: u64, id: u64) -> StabilityResult<bool> {
        Ok(budget::candidate_queue_has(self.store, end_height, id)?)
    }
}
