// Copyright (c) 2024 Botho Foundation

//! Oracle integration tests: commit-reveal voting through period close.

mod common;

use bth_stability::{
    event::{EVENT_DENOM_INACTIVE, EVENT_MISS_THRESHOLD, EVENT_ORACLE_REWARD, EVENT_PRICE_UPDATE},
    mock::{acc, val},
    oracle::{PriceRecord, VoteState},
    Bank, Dec, ModuleAccount, Querier, StabilityError,
};
use common::*;

fn rate(v: i64) -> Dec {
    Dec::from_int(v)
}

#[test]
fn test_equal_validators_agree_on_price() {
    let mut env = four_validators(|p| p.oracle.vote_period = 5);
    // 40 released per period over the default distribution window.
    env.fund(&ModuleAccount::RewardPool.address(), NATIVE, 40 * 10_080);

    for i in 1..=4 {
        vote(&mut env, i, "foo", rate(8712)).unwrap();
    }
    let events = env.advance_to(5).unwrap();
    assert!(has_event(&events, EVENT_PRICE_UPDATE));
    assert_eq!(
        events.iter().filter(|e| e.kind == EVENT_ORACLE_REWARD).count(),
        4
    );

    let querier = Querier::new(&env.store);
    assert_eq!(
        querier.exchange_rate("foo").unwrap(),
        Some(PriceRecord {
            denom: "foo".into(),
            rate: rate(8712),
            period: 0,
            active: true,
        })
    );
    assert_eq!(querier.active_denoms().unwrap(), vec!["foo".to_string()]);

    for i in 1..=4 {
        assert_eq!(env.bank.balance(&acc(i), NATIVE), 10);
        assert_eq!(querier.miss_counter(&val(i)).unwrap(), 0);
    }
    assert_eq!(
        env.bank.balance(&ModuleAccount::RewardPool.address(), NATIVE),
        40 * 10_080 - 40
    );
}

#[test]
fn test_weighted_median_with_outlier() {
    let mut env = four_validators(|p| p.oracle.vote_period = 5);
    vote(&mut env, 1, "foo", rate(100)).unwrap();
    vote(&mut env, 2, "foo", rate(101)).unwrap();
    vote(&mut env, 3, "foo", rate(102)).unwrap();
    vote(&mut env, 4, "foo", rate(500)).unwrap();
    env.advance_to(5).unwrap();

    let querier = Querier::new(&env.store);
    let record = querier.exchange_rate("foo").unwrap().unwrap();
    assert_eq!(record.rate, rate(101));
    // 500 is outside the 1% band around 101; 100 and 102 are not.
    assert_eq!(querier.miss_counter(&val(4)).unwrap(), 1);
    for i in 1..=3 {
        assert_eq!(querier.miss_counter(&val(i)).unwrap(), 0);
    }
}

#[test]
fn test_insufficient_power_leaves_stale_inactive_price() {
    let mut env = four_validators(|p| p.oracle.vote_period = 5);
    for i in 1..=4 {
        vote(&mut env, i, "foo", rate(8712)).unwrap();
    }
    env.advance_to(5).unwrap();

    // Half the power is below the two-thirds threshold.
    vote(&mut env, 1, "foo", rate(9000)).unwrap();
    vote(&mut env, 2, "foo", rate(9000)).unwrap();
    let events = env.advance_to(10).unwrap();
    assert!(has_event(&events, EVENT_DENOM_INACTIVE));
    assert!(!has_event(&events, EVENT_PRICE_UPDATE));

    let querier = Querier::new(&env.store);
    let record = querier.exchange_rate("foo").unwrap().unwrap();
    assert_eq!(record.rate, rate(8712));
    assert_eq!(record.period, 0);
    assert!(!record.active);
    assert!(querier.active_denoms().unwrap().is_empty());
}

#[test]
fn test_unrevealed_prevote_counts_as_miss() {
    let mut env = four_validators(|p| {
        p.oracle.vote_period = 5;
        p.oracle.miss_threshold = 2;
    });

    for period in 0..2u64 {
        for i in 1..=3 {
            vote(&mut env, i, "foo", rate(8712)).unwrap();
        }
        prevote(&mut env, 4, "foo", rate(8712)).unwrap();
        let events = env.advance_to((period + 1) * 5).unwrap();
        assert_eq!(has_event(&events, EVENT_MISS_THRESHOLD), period == 1);
    }

    let querier = Querier::new(&env.store);
    assert_eq!(querier.miss_counter(&val(4)).unwrap(), 2);
    assert_eq!(querier.miss_counter(&val(1)).unwrap(), 0);
    assert_eq!(env.staking.miss_signals, vec![(val(4), 2)]);
}

#[test]
fn test_abstaining_validator_counts_as_miss() {
    let mut env = four_validators(|p| p.oracle.vote_period = 5);
    for i in 1..=3 {
        vote(&mut env, i, "foo", rate(8712)).unwrap();
    }
    env.advance_to(5).unwrap();

    let querier = Querier::new(&env.store);
    assert!(querier.exchange_rate("foo").unwrap().unwrap().active);
    assert_eq!(querier.miss_counter(&val(4)).unwrap(), 1);
    for i in 1..=3 {
        assert_eq!(querier.miss_counter(&val(i)).unwrap(), 0);
    }

    // A period without any tallied denom charges nobody.
    env.advance_to(10).unwrap();
    let querier = Querier::new(&env.store);
    assert_eq!(querier.miss_counter(&val(4)).unwrap(), 1);
    assert_eq!(querier.miss_counter(&val(1)).unwrap(), 0);
}

#[test]
fn test_reveal_must_land_in_prevote_period() {
    let mut env = four_validators(|p| p.oracle.vote_period = 5);
    env.advance_to(4).unwrap();
    prevote(&mut env, 1, "foo", rate(8712)).unwrap();
    env.advance_to(5).unwrap();

    assert!(matches!(
        reveal(&mut env, 1, "foo", rate(8712)),
        Err(StabilityError::NoMatchingPrevote { .. })
    ));
}

#[test]
fn test_failed_reveal_keeps_prevote() {
    let mut env = four_validators(|p| p.oracle.vote_period = 5);
    prevote(&mut env, 1, "foo", rate(8712)).unwrap();

    assert_eq!(
        reveal(&mut env, 1, "foo", rate(8713)),
        Err(StabilityError::HashMismatch)
    );
    let querier = Querier::new(&env.store);
    assert!(matches!(
        querier.vote_state(0, "foo", &val(1)).unwrap(),
        VoteState::Prevoted { .. }
    ));

    reveal(&mut env, 1, "foo", rate(8712)).unwrap();
    assert!(matches!(
        reveal(&mut env, 1, "foo", rate(8712)),
        Err(StabilityError::DuplicateVote { .. })
    ));
}

#[test]
fn test_unbonded_validator_rejected() {
    let mut env = four_validators(|p| p.oracle.vote_period = 5);
    env.staking.set_power(val(2), 0);
    assert!(matches!(
        prevote(&mut env, 2, "foo", rate(1)),
        Err(StabilityError::NotValidator(_))
    ));
    assert_eq!(
        Querier::new(&env.store).vote_state(0, "foo", &val(2)).unwrap(),
        VoteState::None
    );
}
