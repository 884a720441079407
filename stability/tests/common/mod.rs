// Copyright (c) 2024 Botho Foundation
//
//! Shared helpers for block-level integration tests.
//!
//! Tests drive a [`TestEnv`] block by block: messages are delivered at the
//! current height and `advance_to` ends every block before the target.

#![allow(dead_code)]

use bth_stability::{
    mock::{acc, val, TestEnv},
    oracle::VoteHash,
    Dec, Event, Msg, Params, StabilityResult,
};

/// Native denomination used by default params.
pub const NATIVE: &str = "ubth";

/// Denomination of the default program deposit.
pub const DEPOSIT_DENOM: &str = "usdr";

/// Four validators with power 100 each and `edit` applied to default params.
pub fn four_validators(edit: impl FnOnce(&mut Params)) -> TestEnv {
    let mut params = Params::default();
    edit(&mut params);
    TestEnv::new(params, (1..=4).map(|i| (val(i), 100)))
}

/// Prevote and reveal `rate` for `denom` from validator `i` in one block.
pub fn vote(env: &mut TestEnv, i: u8, denom: &str, rate: Dec) -> StabilityResult<()> {
    prevote(env, i, denom, rate)?;
    reveal(env, i, denom, rate)?;
    Ok(())
}

pub fn prevote(env: &mut TestEnv, i: u8, denom: &str, rate: Dec) -> StabilityResult<Vec<Event>> {
    let hash = VoteHash::compute(&salt(i), rate, denom, &val(i));
    env.deliver(Msg::PricePrevote {
        hash: hash.to_hex(),
        denom: denom.to_string(),
        validator: val(i),
    })
}

pub fn reveal(env: &mut TestEnv, i: u8, denom: &str, rate: Dec) -> StabilityResult<Vec<Event>> {
    env.deliver(Msg::PriceVote {
        rate,
        salt: salt(i),
        denom: denom.to_string(),
        validator: val(i),
    })
}

fn salt(i: u8) -> String {
    format!("salt-{i}")
}

/// Fund `acc(i)` with one deposit and submit a program executed by `acc(i + 1)`.
pub fn submit(env: &mut TestEnv, i: u8) -> StabilityResult<Vec<Event>> {
    let deposit = env.params.budget.deposit.clone();
    env.fund(&acc(i), &deposit.denom, deposit.amount);
    env.deliver(Msg::SubmitProgram {
        title: format!("program {i}"),
        description: "community funding".into(),
        submitter: acc(i),
        executor: acc(i + 1),
    })
}

pub fn vote_program(env: &mut TestEnv, id: u64, i: u8, approve: bool) -> StabilityResult<Vec<Event>> {
    env.deliver(Msg::VoteProgram {
        program_id: id,
        approve,
        voter: val(i),
    })
}

pub fn has_event(events: &[Event], kind: &str) -> bool {
    events.iter().any(|e| e.kind == kind)
}
