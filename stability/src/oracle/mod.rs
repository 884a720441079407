// Copyright (c) 2024 Botho Foundation

//! Exchange-rate oracle.
//!
//! Validators commit to a rate per denom with a hashed prevote, reveal it in
//! the same voting period, and at the last block of the period every denom
//! is tallied:
//!
//! ```text
//! reveal_power ≥ vote_threshold × bonded_power  →  rate = weighted median
//! otherwise                                      →  denom inactive, rate stale
//! ```
//!
//! Rewards and misses are settled from the same tallies, then the period's
//! votes are cleared.

pub mod registry;
pub mod reward;
pub mod tally;
pub mod vote;

pub use registry::{submit_prevote, submit_vote, vote_state};
pub use reward::{miss_counter, DenomTally, VoteRewardEngine};
pub use tally::{
    active_price_records, price_record, price_records, weighted_median, BallotEntry,
    PriceAggregator, PriceRecord, TallyOutcome,
};
pub use vote::{VoteEntry, VoteHash, VoteState};

use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

use crate::{
    context::Context,
    epoch,
    error::StabilityResult,
    event::{Event, EVENT_DENOM_INACTIVE, EVENT_PRICE_UPDATE},
    types::ValAddress,
};

/// Close the voting period if `ctx.height()` is its last block.
pub fn end_block(ctx: &mut Context<'_>) -> StabilityResult<()> {
    let vote_period = ctx.params().oracle.vote_period;
    if !epoch::is_period_end(ctx.height(), vote_period) {
        return Ok(());
    }
    let period = epoch::period(ctx.height(), vote_period);

    let power: BTreeMap<ValAddress, u64> = ctx.staking.bonded_validators().into_iter().collect();
    let total_power = power.values().fold(0u64, |acc, p| acc.saturating_add(*p));

    let mut ballots: BTreeMap<String, Vec<BallotEntry>> = BTreeMap::new();
    let mut unrevealed: BTreeSet<ValAddress> = BTreeSet::new();

    for entry in registry::period_entries(&*ctx.store, period)? {
        let voter_power = power.get(&entry.voter).copied().unwrap_or(0);
        let ballot = ballots.entry(entry.denom).or_default();
        match entry.state {
            VoteState::Revealed { rate } if voter_power > 0 => ballot.push(BallotEntry {
                voter: entry.voter,
                rate,
                power: voter_power,
            }),
            VoteState::Prevoted { .. } if voter_power > 0 => {
                unrevealed.insert(entry.voter);
            }
            _ => {}
        }
    }

    // A previously active denom with no votes this period goes inactive.
    for record in active_price_records(&*ctx.store)? {
        ballots.entry(record.denom).or_default();
    }

    let aggregator = PriceAggregator::new(&ctx.params().oracle);
    let mut tallies = Vec::new();

    for (denom, ballot) in ballots {
        match aggregator.tally(&ballot, total_power) {
            TallyOutcome::Active { rate, reveal_power } => {
                tally::set_price_record(
                    ctx.store,
                    &PriceRecord {
                        denom: denom.clone(),
                        rate,
                        period,
                        active: true,
                    },
                )?;
                info!(denom = %denom, %rate, period, reveal_power, "Exchange rate updated");
                ctx.emit(
                    Event::new(EVENT_PRICE_UPDATE)
                        .attr("denom", &denom)
                        .attr("rate", rate)
                        .attr("period", period),
                );
                tallies.push(DenomTally {
                    denom,
                    median: rate,
                    ballot,
                });
            }
            TallyOutcome::Inactive { reveal_power } => {
                if let Some(mut record) = price_record(&*ctx.store, &denom)? {
                    record.active = false;
                    tally::set_price_record(ctx.store, &record)?;
                }
                debug!(
                    denom = %denom,
                    period,
                    reveal_power,
                    total_power,
                    "Not enough voting power, rate left stale"
                );
                ctx.emit(
                    Event::new(EVENT_DENOM_INACTIVE)
                        .attr("denom", &denom)
                        .attr("period", period)
                        .attr("reveal_power", reveal_power),
                );
            }
        }
    }

    let bonded: BTreeSet<ValAddress> = power.keys().copied().collect();
    reward::settle_period(ctx, period, &tallies, &unrevealed, &bonded)?;
    registry::clear_period(ctx.store, period)?;
    Ok(())
}
