// Copyright (c) 2024 Botho Foundation

//! Vote rewards and miss accounting.
//!
//! Validators whose reveal lands within the reward band of the median earn a
//! share of the period's reward budget proportional to their power, once per
//! won denom. Validators that prevote without revealing, reveal outside the
//! band, or abstain from a denom that reached quorum accumulate misses;
//! reaching the threshold is signalled to the staking collaborator and never
//! penalized here.

use std::collections::{BTreeMap, BTreeSet};
use tracing::{info, warn};

use crate::{
    context::Context,
    dec::{mul_div, Dec},
    error::StabilityResult,
    event::{Event, EVENT_MISS_THRESHOLD, EVENT_ORACLE_REWARD},
    oracle::tally::BallotEntry,
    params::OracleParams,
    store::{get_value, set_value, Key, KvStore, StoreResult},
    types::{Coin, ModuleAccount, ValAddress},
};

const MISS_PREFIX: &str = "oracle/miss/";

/// Tally of one denom that reached quorum this period.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DenomTally {
    pub denom: String,
    pub median: Dec,
    pub ballot: Vec<BallotEntry>,
}

/// Band check and payout arithmetic.
#[derive(Clone, Debug)]
pub struct VoteRewardEngine {
    reward_band: Dec,
    distribution_window: u64,
}

impl VoteRewardEngine {
    pub fn new(params: &OracleParams) -> Self {
        Self {
            reward_band: params.reward_band,
            distribution_window: params.reward_distribution_window.max(1),
        }
    }

    /// `|rate − median| ≤ band × median`.
    pub fn within_band(&self, rate: Dec, median: Dec) -> bool {
        (rate - median).abs() <= self.reward_band * median
    }

    /// Budget released this period from a pool holding `pool_balance`.
    pub fn period_budget(&self, pool_balance: u64) -> u64 {
        pool_balance / self.distribution_window
    }

    /// Split `budget` by claim weight, truncating each share. Zero shares are
    /// dropped; the remainder stays with the payer.
    pub fn shares(
        &self,
        budget: u64,
        claims: &BTreeMap<ValAddress, u128>,
    ) -> Vec<(ValAddress, u64)> {
        let total: u128 = claims.values().sum();
        if total == 0 || budget == 0 {
            return Vec::new();
        }
        claims
            .iter()
            .filter_map(|(voter, claim)| {
                let share = mul_div(budget as u128, *claim, total)?;
                let share = u64::try_from(share).ok()?;
                (share > 0).then_some((*voter, share))
            })
            .collect()
    }

    /// Claim weights and misses for one closed period. Every `bonded`
    /// validator without a reveal on a tallied denom misses.
    pub fn classify(
        &self,
        tallies: &[DenomTally],
        unrevealed: &BTreeSet<ValAddress>,
        bonded: &BTreeSet<ValAddress>,
    ) -> (BTreeMap<ValAddress, u128>, BTreeSet<ValAddress>) {
        let mut claims: BTreeMap<ValAddress, u128> = BTreeMap::new();
        let mut missed = unrevealed.clone();

        for tally in tallies {
            let mut revealed = BTreeSet::new();
            for entry in tally.ballot.iter().filter(|b| b.power > 0) {
                revealed.insert(entry.voter);
                if self.within_band(entry.rate, tally.median) {
                    *claims.entry(entry.voter).or_default() += entry.power as u128;
                } else {
                    missed.insert(entry.voter);
                }
            }
            missed.extend(bonded.difference(&revealed).copied());
        }
        (claims, missed)
    }
}

fn miss_key(validator: &ValAddress) -> Vec<u8> {
    Key::new(MISS_PREFIX).bytes(validator.as_bytes()).build()
}

pub fn miss_counter(store: &dyn KvStore, validator: &ValAddress) -> StoreResult<u64> {
    Ok(get_value(store, &miss_key(validator))?.unwrap_or(0))
}

/// Pay rewards and update miss counters for a closed period.
pub fn settle_period(
    ctx: &mut Context<'_>,
    period: u64,
    tallies: &[DenomTally],
    unrevealed: &BTreeSet<ValAddress>,
    bonded: &BTreeSet<ValAddress>,
) -> StabilityResult<()> {
    let params = ctx.params().oracle.clone();
    let engine = VoteRewardEngine::new(&params);
    let (claims, missed) = engine.classify(tallies, unrevealed, bonded);

    let pool = ModuleAccount::RewardPool.address();
    let native = ctx.params().clock.native_denom.clone();
    let budget = engine.period_budget(ctx.bank.balance(&pool, &native));

    for (voter, amount) in engine.shares(budget, &claims) {
        let coin = Coin::new(native.clone(), amount);
        ctx.bank.transfer(&pool, &voter.account(), &coin)?;
        ctx.emit(
            Event::new(EVENT_ORACLE_REWARD)
                .attr("validator", voter)
                .attr("amount", coin)
                .attr("period", period),
        );
    }

    for voter in &missed {
        let count = miss_counter(&*ctx.store, voter)?.saturating_add(1);
        set_value(ctx.store, &miss_key(voter), &count)?;
        if count == params.miss_threshold {
            warn!(validator = %voter, misses = count, "Oracle miss threshold reached");
            ctx.staking.signal_oracle_misses(voter, count);
            ctx.emit(
                Event::new(EVENT_MISS_THRESHOLD)
                    .attr("validator", voter)
                    .attr("misses", count),
            );
        }
    }

    if (period + 1) % params.miss_window.max(1) == 0 {
        let reset = ctx.store.delete_prefix(MISS_PREFIX.as_bytes())?;
        info!(period, reset, "Oracle miss window closed");
    }
    Ok(())
}
