// Copyright (c) 2024 Botho Foundation

//! Budget programs funded from seigniorage.
//!
//! ```text
//! submit ─→ Candidate ─┬─ vote passes at end_height ─→ Active ─→ withdraw
//!                      ├─ vote fails at end_height ──→ deleted (deposit burned or refunded)
//!                      └─ withdraw ─────────────────→ deleted (deposit refunded)
//! ```

pub mod program;
pub mod queue;

pub use program::{
    active_programs, get_program, next_program_id, programs, Program, ProgramStatus,
    INITIAL_PROGRAM_ID,
};
pub use queue::{
    candidate_queue_has, fund_active_programs, program_vote, program_votes, queued_at,
    submit_program, sweep, tally_program, vote_program, withdraw_program, BudgetTally,
};
