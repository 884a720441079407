// Copyright (c) 2024 Botho Foundation

//! Program records.

use serde::{Deserialize, Serialize};

use crate::{
    store::{get_value, prefix_values, set_value, Key, KvStore, StoreResult},
    types::{AccAddress, Coin},
};

const PROGRAM_PREFIX: &str = "budget/program/";
const KEY_NEXT_ID: &[u8] = b"budget/next_id";

/// First ID ever assigned.
pub const INITIAL_PROGRAM_ID: u64 = 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProgramStatus {
    /// Waiting for its single evaluation at `end_height`.
    Candidate,
    /// Passed; funded from the budget pool until withdrawn.
    Active,
}

/// A funding proposal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    pub id: u64,
    pub title: String,
    pub description: String,
    pub submitter: AccAddress,
    /// Receives budget payouts once active.
    pub executor: AccAddress,
    pub submit_epoch: u64,
    pub submit_height: u64,
    /// Height of the single evaluation.
    pub end_height: u64,
    pub deposit: Coin,
    pub status: ProgramStatus,
}

fn program_key(id: u64) -> Vec<u8> {
    Key::new(PROGRAM_PREFIX).u64(id).build()
}

pub fn get_program(store: &dyn KvStore, id: u64) -> StoreResult<Option<Program>> {
    get_value(store, &program_key(id))
}

pub(crate) fn set_program(store: &mut dyn KvStore, program: &Program) -> StoreResult<()> {
    set_value(store, &program_key(program.id), program)
}

pub(crate) fn delete_program(store: &mut dyn KvStore, id: u64) -> StoreResult<()> {
    store.delete(&program_key(id))
}

/// Every program, ascending by ID.
pub fn programs(store: &dyn KvStore) -> StoreResult<Vec<Program>> {
    prefix_values(store, PROGRAM_PREFIX.as_bytes())
}

pub fn active_programs(store: &dyn KvStore) -> StoreResult<Vec<Program>> {
    Ok(programs(store)?
        .into_iter()
        .filter(|p| p.status == ProgramStatus::Active)
        .collect())
}

/// ID the next submission will receive.
pub fn next_program_id(store: &dyn KvStore) -> StoreResult<u64> {
    Ok(get_value(store, KEY_NEXT_ID)?.unwrap_or(INITIAL_PROGRAM_ID))
}

pub(crate) fn set_next_program_id(store: &mut dyn KvStore, id: u64) -> StoreResult<()> {
    set_value(store, KEY_NEXT_ID, &id)
}

/// Take the next ID. IDs are never reused, even after deletion.
pub(crate) fn allocate_program_id(store: &mut dyn KvStore) -> StoreResult<u64> {
    let id = next_program_id(store)?;
    set_next_program_id(store, id + 1)?;
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemStore;

    #[test]
    fn test_ids_monotonic() {
        let mut store = MemStore::new();
        assert_eq!(allocate_program_id(&mut store).unwrap(), 1);
        assert_eq!(allocate_program_id(&mut store).unwrap(), 2);
        assert_eq!(next_program_id(&store).unwrap(), 3);
    }
}
