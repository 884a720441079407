// Copyright (c) 2024 Botho Foundation

//! Commit-reveal vote registry.
//!
//! A validator first submits a prevote carrying only a hash, then reveals the
//! rate and salt within the same voting period. At most one prevote and one
//! reveal exist per (validator, denom, period), and every entry of a period
//! is cleared when the period closes.

use tracing::debug;

use crate::{
    context::Context,
    dec::Dec,
    epoch,
    error::{StabilityError, StabilityResult},
    event::{Event, EVENT_PREVOTE, EVENT_VOTE},
    oracle::vote::{VoteEntry, VoteHash, VoteState},
    store::{get_value, prefix_values, set_value, Key, KvStore, StoreResult},
    types::{validate_denom, ValAddress},
};

const VOTE_PREFIX: &str = "oracle/vote/";

fn vote_key(period: u64, denom: &str, voter: &ValAddress) -> Vec<u8> {
    Key::new(VOTE_PREFIX)
        .u64(period)
        .str(denom)
        .bytes(voter.as_bytes())
        .build()
}

fn period_prefix(period: u64) -> Vec<u8> {
    Key::new(VOTE_PREFIX).u64(period).build()
}

/// Current state of a (validator, denom, period) slot.
pub fn vote_state(
    store: &dyn KvStore,
    period: u64,
    denom: &str,
    voter: &ValAddress,
) -> StoreResult<VoteState> {
    let entry: Option<VoteEntry> = get_value(store, &vote_key(period, denom, voter))?;
    Ok(entry.map(|e| e.state).unwrap_or(VoteState::None))
}

/// Every vote entry of `period`, ordered by denom then voter.
pub fn period_entries(store: &dyn KvStore, period: u64) -> StoreResult<Vec<VoteEntry>> {
    prefix_values(store, &period_prefix(period))
}

/// Delete every vote entry of `period`.
pub fn clear_period(store: &mut dyn KvStore, period: u64) -> StoreResult<usize> {
    store.delete_prefix(&period_prefix(period))
}

fn ensure_voter(ctx: &Context<'_>, voter: &ValAddress, denom: &str) -> StabilityResult<()> {
    validate_denom(denom)?;
    let whitelist = &ctx.params().oracle.whitelist;
    if !whitelist.is_empty() && !whitelist.iter().any(|d| d == denom) {
        return Err(StabilityError::UnknownDenom(denom.to_string()));
    }
    if ctx.staking.power(voter) == 0 {
        return Err(StabilityError::NotValidator(voter.to_string()));
    }
    Ok(())
}

fn current_period(ctx: &Context<'_>) -> u64 {
    epoch::period(ctx.height(), ctx.params().oracle.vote_period)
}

/// Record a prevote for the current voting period.
pub fn submit_prevote(
    ctx: &mut Context<'_>,
    voter: &ValAddress,
    denom: &str,
    hash: VoteHash,
) -> StabilityResult<()> {
    ensure_voter(ctx, voter, denom)?;
    let period = current_period(ctx);

    match vote_state(&*ctx.store, period, denom, voter)? {
        VoteState::None => {}
        VoteState::Prevoted { .. } | VoteState::Revealed { .. } => {
            return Err(StabilityError::DuplicatePrevote {
                voter: voter.to_string(),
                denom: denom.to_string(),
            });
        }
    }

    let entry = VoteEntry {
        period,
        denom: denom.to_string(),
        voter: *voter,
        state: VoteState::Prevoted { hash },
    };
    set_value(ctx.store, &vote_key(period, denom, voter), &entry)?;

    debug!(%voter, denom, period, "Prevote recorded");
    ctx.emit(
        Event::new(EVENT_PREVOTE)
            .attr("voter", voter)
            .attr("denom", denom)
            .attr("period", period),
    );
    Ok(())
}

/// Reveal a rate against this period's prevote.
pub fn submit_vote(
    ctx: &mut Context<'_>,
    voter: &ValAddress,
    denom: &str,
    rate: Dec,
    salt: &str,
) -> StabilityResult<()> {
    if rate.is_negative() {
        return Err(StabilityError::NegativeRate(rate.to_string()));
    }
    ensure_voter(ctx, voter, denom)?;
    let period = current_period(ctx);

    let committed = match vote_state(&*ctx.store, period, denom, voter)? {
        VoteState::None => {
            return Err(StabilityError::NoMatchingPrevote {
                voter: voter.to_string(),
                denom: denom.to_string(),
            });
        }
        VoteState::Revealed { .. } => {
            return Err(StabilityError::DuplicateVote {
                voter: voter.to_string(),
                denom: denom.to_string(),
            });
        }
        VoteState::Prevoted { hash } => hash,
    };

    if VoteHash::compute(salt, rate, denom, voter) != committed {
        return Err(StabilityError::HashMismatch);
    }

    let entry = VoteEntry {
        period,
        denom: denom.to_string(),
        voter: *voter,
        state: VoteState::Revealed { rate },
    };
    set_value(ctx.store, &vote_key(period, denom, voter), &entry)?;

    debug!(%voter, denom, period, %rate, "Vote revealed");
    ctx.emit(
        Event::new(EVENT_VOTE)
            .attr("voter", voter)
            .attr("denom", denom)
            .attr("rate", rate)
            .attr("period", period),
    );
    Ok(())
}
