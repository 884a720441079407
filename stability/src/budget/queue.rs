// Copyright (c) 2024 Botho Foundation

//! Candidate queue, program votes and settlement.
//!
//! A submitted program waits in the queue under `(end_height, id)` and is
//! evaluated exactly once, at the end of block `end_height`:
//!
//! ```text
//! active  ⇔  total > 0  ∧  approve ≥ threshold × total
//! ```
//!
//! where `total` is the power of every bonded validator and `approve` the
//! power of bonded validators whose last vote approved. Abstaining counts
//! against the program.

use tracing::{debug, info, warn};

use crate::{
    budget::program::{
        active_programs, allocate_program_id, delete_program, get_program, set_program, Program,
        ProgramStatus,
    },
    context::{Context, Staking},
    dec::Dec,
    error::{StabilityError, StabilityResult},
    event::{
        Event, EVENT_DEPOSIT_UNSETTLED, EVENT_PROGRAM_FUNDED, EVENT_PROGRAM_PASSED,
        EVENT_PROGRAM_REJECTED, EVENT_SUBMIT_PROGRAM, EVENT_VOTE_PROGRAM, EVENT_WITHDRAW_PROGRAM,
    },
    params::DepositPolicy,
    store::{get_value, prefix_values, set_value, Key, KvStore, StoreResult},
    types::{AccAddress, Coin, ModuleAccount, ValAddress},
};

const QUEUE_PREFIX: &str = "budget/queue/";
const VOTE_PREFIX: &str = "budget/vote/";

fn queue_key(end_height: u64, id: u64) -> Vec<u8> {
    Key::new(QUEUE_PREFIX).u64(end_height).u64(id).build()
}

fn vote_prefix(id: u64) -> Vec<u8> {
    Key::new(VOTE_PREFIX).u64(id).build()
}

fn vote_key(id: u64, voter: &ValAddress) -> Vec<u8> {
    Key::new(VOTE_PREFIX).u64(id).bytes(voter.as_bytes()).build()
}

/// Whether `id` is queued for evaluation at `end_height`.
pub fn candidate_queue_has(store: &dyn KvStore, end_height: u64, id: u64) -> StoreResult<bool> {
    store.has(&queue_key(end_height, id))
}

/// IDs evaluated at `end_height`, ascending.
pub fn queued_at(store: &dyn KvStore, end_height: u64) -> StoreResult<Vec<u64>> {
    let prefix = Key::new(QUEUE_PREFIX).u64(end_height).build();
    prefix_values(store, &prefix)
}

pub(crate) fn enqueue(store: &mut dyn KvStore, end_height: u64, id: u64) -> StoreResult<()> {
    set_value(store, &queue_key(end_height, id), &id)
}

/// Last stance of every voter on `id`, ordered by voter.
pub fn program_votes(store: &dyn KvStore, id: u64) -> StoreResult<Vec<(ValAddress, bool)>> {
    prefix_values(store, &vote_prefix(id))
}

pub fn program_vote(store: &dyn KvStore, id: u64, voter: &ValAddress) -> StoreResult<Option<bool>> {
    let vote: Option<(ValAddress, bool)> = get_value(store, &vote_key(id, voter))?;
    Ok(vote.map(|(_, approve)| approve))
}

pub(crate) fn set_program_vote(
    store: &mut dyn KvStore,
    id: u64,
    voter: &ValAddress,
    approve: bool,
) -> StoreResult<()> {
    set_value(store, &vote_key(id, voter), &(*voter, approve))
}

/// Voting power behind a program.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BudgetTally {
    pub approve_power: u64,
    pub total_power: u64,
}

impl BudgetTally {
    /// Inclusive threshold; nothing passes without votes.
    pub fn passes(&self, threshold: Dec) -> bool {
        self.total_power > 0
            && Dec::from_u64(self.approve_power) >= threshold * Dec::from_u64(self.total_power)
    }
}

/// Approving power of currently bonded voters against the whole bonded set.
pub fn tally_program(
    store: &dyn KvStore,
    staking: &dyn Staking,
    id: u64,
) -> StoreResult<BudgetTally> {
    let approve_power = program_votes(store, id)?
        .into_iter()
        .filter(|(_, approve)| *approve)
        .fold(0u64, |acc, (voter, _)| acc.saturating_add(staking.power(&voter)));
    Ok(BudgetTally {
        approve_power,
        total_power: staking.total_power(),
    })
}

fn validate_program_text(ctx: &Context<'_>, title: &str, description: &str) -> StabilityResult<()> {
    let params = &ctx.params().budget;
    if title.trim().is_empty() || title.len() > params.max_title_len {
        return Err(StabilityError::InvalidProgram(format!(
            "title must be 1..={} bytes",
            params.max_title_len
        )));
    }
    if description.trim().is_empty() || description.len() > params.max_description_len {
        return Err(StabilityError::InvalidProgram(format!(
            "description must be 1..={} bytes",
            params.max_description_len
        )));
    }
    Ok(())
}

/// Escrow the deposit and queue a new candidate. Returns its ID.
pub fn submit_program(
    ctx: &mut Context<'_>,
    title: &str,
    description: &str,
    submitter: &AccAddress,
    executor: &AccAddress,
) -> StabilityResult<u64> {
    validate_program_text(ctx, title, description)?;

    let deposit = ctx.params().budget.deposit.clone();
    ctx.bank
        .transfer(submitter, &ModuleAccount::DepositEscrow.address(), &deposit)
        .map_err(StabilityError::InsufficientDeposit)?;

    let id = allocate_program_id(ctx.store)?;
    let end_height = ctx.height().saturating_add(ctx.params().budget.vote_period);
    let program = Program {
        id,
        title: title.to_string(),
        description: description.to_string(),
        submitter: *submitter,
        executor: *executor,
        submit_epoch: ctx.epoch(),
        submit_height: ctx.height(),
        end_height,
        deposit,
        status: ProgramStatus::Candidate,
    };
    set_program(ctx.store, &program)?;
    enqueue(ctx.store, end_height, id)?;

    info!(id, %submitter, end_height, "Program submitted");
    ctx.emit(
        Event::new(EVENT_SUBMIT_PROGRAM)
            .attr("program_id", id)
            .attr("submitter", submitter)
            .attr("end_height", end_height),
    );
    Ok(id)
}

/// Record a validator's stance on a candidate; the last vote wins.
pub fn vote_program(
    ctx: &mut Context<'_>,
    id: u64,
    voter: &ValAddress,
    approve: bool,
) -> StabilityResult<()> {
    match get_program(&*ctx.store, id)? {
        Some(p) if p.status == ProgramStatus::Candidate => {}
        _ => return Err(StabilityError::ProgramNotFound(id)),
    }
    if ctx.staking.power(voter) == 0 {
        return Err(StabilityError::NotValidator(voter.to_string()));
    }

    set_program_vote(ctx.store, id, voter, approve)?;
    debug!(id, %voter, approve, "Program vote recorded");
    ctx.emit(
        Event::new(EVENT_VOTE_PROGRAM)
            .attr("program_id", id)
            .attr("voter", voter)
            .attr("option", approve),
    );
    Ok(())
}

fn remove_program(store: &mut dyn KvStore, program: &Program) -> StoreResult<()> {
    store.delete_prefix(&vote_prefix(program.id))?;
    store.delete(&queue_key(program.end_height, program.id))?;
    delete_program(store, program.id)
}

/// Remove a program and refund its deposit. Submitter only.
pub fn withdraw_program(
    ctx: &mut Context<'_>,
    id: u64,
    submitter: &AccAddress,
) -> StabilityResult<()> {
    let program = get_program(&*ctx.store, id)?.ok_or(StabilityError::ProgramNotFound(id))?;
    if program.submitter != *submitter {
        return Err(StabilityError::Unauthorized(id));
    }

    ctx.bank.transfer(
        &ModuleAccount::DepositEscrow.address(),
        &program.submitter,
        &program.deposit,
    )?;
    remove_program(ctx.store, &program)?;

    info!(id, %submitter, "Program withdrawn");
    ctx.emit(
        Event::new(EVENT_WITHDRAW_PROGRAM)
            .attr("program_id", id)
            .attr("submitter", submitter),
    );
    Ok(())
}

/// Evaluate every candidate whose voting ends at `ctx.height()`.
pub fn sweep(ctx: &mut Context<'_>) -> StabilityResult<()> {
    let height = ctx.height();
    let ids = queued_at(&*ctx.store, height)?;
    if ids.is_empty() {
        return Ok(());
    }
    let params = ctx.params().budget.clone();

    for id in ids {
        let Some(mut program) = get_program(&*ctx.store, id)? else {
            ctx.store.delete(&queue_key(height, id))?;
            continue;
        };
        let tally = tally_program(&*ctx.store, &*ctx.staking, id)?;

        if tally.passes(params.threshold) {
            program.status = ProgramStatus::Active;
            set_program(ctx.store, &program)?;
            ctx.store.delete(&queue_key(height, id))?;
            info!(
                id,
                approve = tally.approve_power,
                total = tally.total_power,
                "Program passed"
            );
            ctx.emit(
                Event::new(EVENT_PROGRAM_PASSED)
                    .attr("program_id", id)
                    .attr("approve_power", tally.approve_power)
                    .attr("total_power", tally.total_power),
            );
        } else {
            let escrow = ModuleAccount::DepositEscrow.address();
            let settled = match params.rejected_deposit {
                DepositPolicy::Burn => ctx.bank.debit(&escrow, &program.deposit),
                DepositPolicy::Refund => {
                    ctx.bank
                        .transfer(&escrow, &program.submitter, &program.deposit)
                }
            };
            // A short escrow must not keep the program queued past its end height.
            if let Err(err) = settled {
                warn!(id, deposit = %program.deposit, %err, "Rejected deposit not settled");
                ctx.emit(
                    Event::new(EVENT_DEPOSIT_UNSETTLED)
                        .attr("program_id", id)
                        .attr("deposit", &program.deposit)
                        .attr("error", err),
                );
            }
            remove_program(ctx.store, &program)?;
            info!(
                id,
                approve = tally.approve_power,
                total = tally.total_power,
                "Program rejected"
            );
            ctx.emit(
                Event::new(EVENT_PROGRAM_REJECTED)
                    .attr("program_id", id)
                    .attr("approve_power", tally.approve_power)
                    .attr("total_power", tally.total_power),
            );
        }
    }
    Ok(())
}

/// Split the budget pool equally among active programs' executors.
pub fn fund_active_programs(ctx: &mut Context<'_>) -> StabilityResult<()> {
    if !ctx.params().budget.fund_active_programs {
        return Ok(());
    }
    let active = active_programs(&*ctx.store)?;
    if active.is_empty() {
        return Ok(());
    }

    let pool = ModuleAccount::BudgetPool.address();
    let native = ctx.params().clock.native_denom.clone();
    let share = ctx.bank.balance(&pool, &native) / active.len() as u64;
    if share == 0 {
        return Ok(());
    }

    for program in active {
        let coin = Coin::new(native.clone(), share);
        ctx.bank.transfer(&pool, &program.executor, &coin)?;
        ctx.emit(
            Event::new(EVENT_PROGRAM_FUNDED)
                .attr("program_id", program.id)
                .attr("executor", program.executor)
                .attr("amount", coin),
        );
    }
    Ok(())
}
