// Copyright (c) 2024 Botho Foundation

//! Message routing and the end-of-block hook.

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::{
    budget,
    context::Context,
    dec::Dec,
    error::{StabilityError, StabilityResult},
    event::Event,
    oracle::{self, VoteHash},
    store::CachedStore,
    treasury,
    types::{validate_denom, AccAddress, ValAddress},
};

/// Longest accepted vote salt.
pub const MAX_SALT_LEN: usize = 64;

/// Messages accepted by the engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Msg {
    /// Commit to a rate with a hex-encoded vote hash.
    PricePrevote {
        hash: String,
        denom: String,
        validator: ValAddress,
    },
    /// Reveal the rate committed to by this period's prevote.
    PriceVote {
        rate: Dec,
        salt: String,
        denom: String,
        validator: ValAddress,
    },
    SubmitProgram {
        title: String,
        description: String,
        submitter: AccAddress,
        executor: AccAddress,
    },
    VoteProgram {
        program_id: u64,
        approve: bool,
        voter: ValAddress,
    },
    WithdrawProgram {
        program_id: u64,
        submitter: AccAddress,
    },
}

impl Msg {
    pub fn kind(&self) -> &'static str {
        match self {
            Msg::PricePrevote { .. } => "price_prevote",
            Msg::PriceVote { .. } => "price_vote",
            Msg::SubmitProgram { .. } => "submit_program",
            Msg::VoteProgram { .. } => "vote_program",
            Msg::WithdrawProgram { .. } => "withdraw_program",
        }
    }

    /// Checks that need no state.
    pub fn validate_basic(&self) -> StabilityResult<()> {
        match self {
            Msg::PricePrevote { hash, denom, .. } => {
                validate_denom(denom)?;
                VoteHash::from_hex(hash)?;
            }
            Msg::PriceVote {
                rate, salt, denom, ..
            } => {
                validate_denom(denom)?;
                if rate.is_negative() {
                    return Err(StabilityError::NegativeRate(rate.to_string()));
                }
                if salt.is_empty() || salt.len() > MAX_SALT_LEN {
                    return Err(StabilityError::InvalidMsg(format!(
                        "salt must be 1..={MAX_SALT_LEN} bytes"
                    )));
                }
            }
            Msg::SubmitProgram {
                title, description, ..
            } => {
                if title.trim().is_empty() {
                    return Err(StabilityError::InvalidProgram("empty title".into()));
                }
                if description.trim().is_empty() {
                    return Err(StabilityError::InvalidProgram("empty description".into()));
                }
            }
            Msg::VoteProgram { program_id, .. } | Msg::WithdrawProgram { program_id, .. } => {
                if *program_id < budget::INITIAL_PROGRAM_ID {
                    return Err(StabilityError::ProgramNotFound(*program_id));
                }
            }
        }
        Ok(())
    }
}

fn route(ctx: &mut Context<'_>, msg: &Msg) -> StabilityResult<()> {
    match msg {
        Msg::PricePrevote {
            hash,
            denom,
            validator,
        } => oracle::submit_prevote(ctx, validator, denom, VoteHash::from_hex(hash)?),
        Msg::PriceVote {
            rate,
            salt,
            denom,
            validator,
        } => oracle::submit_vote(ctx, validator, denom, *rate, salt),
        Msg::SubmitProgram {
            title,
            description,
            submitter,
            executor,
        } => budget::submit_program(ctx, title, description, submitter, executor).map(|_| ()),
        Msg::VoteProgram {
            program_id,
            approve,
            voter,
        } => budget::vote_program(ctx, *program_id, voter, *approve),
        Msg::WithdrawProgram {
            program_id,
            submitter,
        } => budget::withdraw_program(ctx, *program_id, submitter),
    }
}

/// Run `f` against a write buffer over `ctx.store`, committing only if it
/// succeeds. Bank and staking calls go straight to the collaborators.
fn buffered<F>(ctx: &mut Context<'_>, f: F) -> StabilityResult<Vec<Event>>
where
    F: FnOnce(&mut Context<'_>) -> StabilityResult<()>,
{
    let params = ctx.params().clone();
    let (height, time) = (ctx.height(), ctx.time());
    let mut cache = CachedStore::new(&mut *ctx.store);

    let events = {
        let mut inner = Context::with_params(
            height,
            time,
            &mut cache,
            &mut *ctx.staking,
            &mut *ctx.bank,
            params,
        );
        f(&mut inner)?;
        inner.take_events()
    };

    cache.commit()?;
    Ok(events)
}

/// Apply one message. Store writes are buffered and only committed when the
/// handler succeeds, so a rejected message leaves no trace.
pub fn deliver(ctx: &mut Context<'_>, msg: &Msg) -> StabilityResult<Vec<Event>> {
    msg.validate_basic()?;
    buffered(ctx, |inner| route(inner, msg)).map_err(|err| {
        debug!(kind = msg.kind(), %err, "Message rejected");
        err
    })
}

/// Run end-of-block processing at `ctx.height()`:
/// oracle period close, budget queue sweep, then treasury settlement and
/// program funding on the last block of an epoch. The block's store writes
/// are committed together or not at all.
pub fn end_block(ctx: &mut Context<'_>) -> StabilityResult<Vec<Event>> {
    let height = ctx.height();
    buffered(ctx, |inner| {
        oracle::end_block(inner)?;
        budget::sweep(inner)?;

        if inner.clock().is_epoch_end(inner.height()) {
            treasury::end_epoch(inner)?;
            budget::fund_active_programs(inner)?;
        }
        Ok(())
    })
    .map_err(|err| {
        error!(height, %err, "End block failed, store writes discarded");
        err
    })
}
