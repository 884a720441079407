// Copyright (c) 2024 Botho Foundation

//! Budget integration tests: submission, voting, evaluation and funding.

mod common;

use bth_stability::{
    budget::{ProgramStatus, INITIAL_PROGRAM_ID},
    event::{
        EVENT_DEPOSIT_UNSETTLED, EVENT_PRICE_UPDATE, EVENT_PROGRAM_FUNDED, EVENT_PROGRAM_PASSED,
        EVENT_PROGRAM_REJECTED,
    },
    mock::{acc, TestEnv},
    Bank, Coin, Dec, DepositPolicy, ModuleAccount, Msg, Querier, StabilityError,
};
use common::*;

const ID: u64 = INITIAL_PROGRAM_ID;

fn setup() -> TestEnv {
    four_validators(|p| p.budget.vote_period = 10)
}

fn deposit(env: &TestEnv) -> u64 {
    env.params.budget.deposit.amount
}

#[test]
fn test_approved_program_becomes_active() {
    let mut env = setup();
    submit(&mut env, 1).unwrap();
    for i in 1..=3 {
        vote_program(&mut env, ID, i, true).unwrap();
    }
    vote_program(&mut env, ID, 4, false).unwrap();

    // Submitted at height 1, evaluated when block 11 ends.
    env.advance_to(11).unwrap();
    {
        let querier = Querier::new(&env.store);
        let program = querier.program(ID).unwrap().unwrap();
        assert_eq!(program.status, ProgramStatus::Candidate);
        assert_eq!(program.end_height, 11);
        assert!(querier.candidate_queue_has(11, ID).unwrap());
    }

    let events = env.end_block().unwrap();
    assert!(has_event(&events, EVENT_PROGRAM_PASSED));

    let querier = Querier::new(&env.store);
    let program = querier.program(ID).unwrap().unwrap();
    assert_eq!(program.status, ProgramStatus::Active);
    assert!(!querier.candidate_queue_has(11, ID).unwrap());
    assert_eq!(querier.active_programs().unwrap(), vec![program]);

    // Still active long after evaluation.
    env.advance_to(40).unwrap();
    let querier = Querier::new(&env.store);
    assert_eq!(querier.program(ID).unwrap().unwrap().status, ProgramStatus::Active);
}

#[test]
fn test_rejected_program_deleted_at_end_height() {
    let mut env = setup();
    submit(&mut env, 1).unwrap();
    vote_program(&mut env, ID, 1, true).unwrap();
    for i in 2..=4 {
        vote_program(&mut env, ID, i, false).unwrap();
    }

    env.advance_to(11).unwrap();
    assert!(Querier::new(&env.store).program(ID).unwrap().is_some());

    let events = env.end_block().unwrap();
    assert!(has_event(&events, EVENT_PROGRAM_REJECTED));

    let querier = Querier::new(&env.store);
    assert!(querier.program(ID).unwrap().is_none());
    assert!(!querier.candidate_queue_has(11, ID).unwrap());
    assert!(querier.active_programs().unwrap().is_empty());

    // Deposit burned by default.
    assert_eq!(env.bank.balance(&acc(1), DEPOSIT_DENOM), 0);
    assert_eq!(env.bank.supply(DEPOSIT_DENOM), 0);
}

#[test]
fn test_abstentions_count_against_program() {
    let mut env = setup();
    submit(&mut env, 1).unwrap();
    // One approval out of four bonded validators; the rest never vote.
    vote_program(&mut env, ID, 1, true).unwrap();

    env.advance_to(11).unwrap();
    let events = env.end_block().unwrap();
    assert!(has_event(&events, EVENT_PROGRAM_REJECTED));
    assert!(!has_event(&events, EVENT_PROGRAM_PASSED));

    let querier = Querier::new(&env.store);
    assert!(querier.program(ID).unwrap().is_none());
    assert!(!querier.candidate_queue_has(11, ID).unwrap());
}

#[test]
fn test_short_escrow_still_removes_rejected_program() {
    let mut env = four_validators(|p| {
        p.budget.vote_period = 10;
        p.oracle.vote_period = 11;
    });
    submit(&mut env, 1).unwrap();
    let escrow = ModuleAccount::DepositEscrow.address();
    let deposit = env.params.budget.deposit.clone();
    env.bank.debit(&escrow, &Coin::new(deposit.denom, 1)).unwrap();

    for i in 1..=4 {
        vote(&mut env, i, "foo", Dec::from_int(8712)).unwrap();
    }
    // Block 10 closes the oracle period; block 11 sweeps the program.
    let events = env.advance_to(12).unwrap();
    assert!(has_event(&events, EVENT_PRICE_UPDATE));
    assert!(has_event(&events, EVENT_DEPOSIT_UNSETTLED));
    assert!(has_event(&events, EVENT_PROGRAM_REJECTED));

    let querier = Querier::new(&env.store);
    assert!(querier.program(ID).unwrap().is_none());
    assert!(!querier.candidate_queue_has(11, ID).unwrap());
    assert!(querier.exchange_rate("foo").unwrap().unwrap().active);
}

#[test]
fn test_rejected_deposit_refunded_when_configured() {
    let mut env = four_validators(|p| {
        p.budget.vote_period = 10;
        p.budget.rejected_deposit = DepositPolicy::Refund;
    });
    submit(&mut env, 1).unwrap();
    env.advance_to(12).unwrap();

    assert!(Querier::new(&env.store).program(ID).unwrap().is_none());
    let amount = deposit(&env);
    assert_eq!(env.bank.balance(&acc(1), DEPOSIT_DENOM), amount);
}

#[test]
fn test_exact_threshold_passes() {
    let mut env = setup();
    submit(&mut env, 1).unwrap();
    vote_program(&mut env, ID, 1, true).unwrap();
    vote_program(&mut env, ID, 2, true).unwrap();
    vote_program(&mut env, ID, 3, false).unwrap();
    vote_program(&mut env, ID, 4, false).unwrap();
    env.advance_to(12).unwrap();

    let program = Querier::new(&env.store).program(ID).unwrap().unwrap();
    assert_eq!(program.status, ProgramStatus::Active);
}

#[test]
fn test_withdraw_refunds_and_removes() {
    let mut env = setup();
    submit(&mut env, 1).unwrap();
    vote_program(&mut env, ID, 1, true).unwrap();
    assert_eq!(env.bank.balance(&acc(1), DEPOSIT_DENOM), 0);

    assert_eq!(
        env.deliver(Msg::WithdrawProgram {
            program_id: ID,
            submitter: acc(3),
        }),
        Err(StabilityError::Unauthorized(ID))
    );

    env.deliver(Msg::WithdrawProgram {
        program_id: ID,
        submitter: acc(1),
    })
    .unwrap();

    let amount = deposit(&env);
    assert_eq!(env.bank.balance(&acc(1), DEPOSIT_DENOM), amount);
    let querier = Querier::new(&env.store);
    assert!(querier.program(ID).unwrap().is_none());
    assert!(!querier.candidate_queue_has(11, ID).unwrap());
    assert_eq!(
        vote_program(&mut env, ID, 2, true),
        Err(StabilityError::ProgramNotFound(ID))
    );

    // Nothing left for the sweep.
    let events = env.advance_to(12).unwrap();
    assert!(!has_event(&events, EVENT_PROGRAM_REJECTED));
}

#[test]
fn test_votes_only_on_candidates() {
    let mut env = setup();
    assert_eq!(
        vote_program(&mut env, 7, 1, true),
        Err(StabilityError::ProgramNotFound(7))
    );

    submit(&mut env, 1).unwrap();
    for i in 1..=4 {
        vote_program(&mut env, ID, i, true).unwrap();
    }
    env.advance_to(12).unwrap();
    assert_eq!(
        vote_program(&mut env, ID, 1, false),
        Err(StabilityError::ProgramNotFound(ID))
    );
}

#[test]
fn test_insufficient_deposit_rejected_without_state() {
    let mut env = setup();
    let result = env.deliver(Msg::SubmitProgram {
        title: "broke".into(),
        description: "no deposit".into(),
        submitter: acc(1),
        executor: acc(2),
    });
    assert!(matches!(result, Err(StabilityError::InsufficientDeposit(_))));

    let querier = Querier::new(&env.store);
    assert!(querier.program(ID).unwrap().is_none());
    assert!(!querier.candidate_queue_has(11, ID).unwrap());

    // The failed submission does not consume an id.
    submit(&mut env, 1).unwrap();
    assert!(Querier::new(&env.store).program(ID).unwrap().is_some());
}

#[test]
fn test_active_programs_funded_at_epoch_end() {
    let mut env = four_validators(|p| {
        p.budget.vote_period = 10;
        p.clock.blocks_per_epoch = 20;
    });
    submit(&mut env, 1).unwrap();
    for i in 1..=4 {
        vote_program(&mut env, ID, i, true).unwrap();
    }
    env.advance_to(12).unwrap();
    env.fund(&ModuleAccount::BudgetPool.address(), NATIVE, 1_000);

    // Block 19 closes epoch 0.
    let events = env.advance_to(20).unwrap();
    assert!(has_event(&events, EVENT_PROGRAM_FUNDED));
    assert_eq!(env.bank.balance(&acc(2), NATIVE), 1_000);
    assert_eq!(env.bank.balance(&ModuleAccount::BudgetPool.address(), NATIVE), 0);
}
