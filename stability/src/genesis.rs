// Copyright (c) 2024 Botho Foundation

//! Genesis import and export.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

use crate::{
    budget::{self, program, queue, Program, ProgramStatus},
    context::Bank,
    dec::Dec,
    error::{StabilityError, StabilityResult},
    oracle::{self, PriceRecord},
    params::Params,
    store::KvStore,
    treasury::{self, seigniorage, tax},
    types::{ModuleAccount, ValAddress},
};

/// A stored program vote.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramVote {
    pub program_id: u64,
    pub voter: ValAddress,
    pub approve: bool,
}

/// Everything needed to start or restart the engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenesisState {
    pub params: Params,
    pub tax_rate: Dec,
    pub reward_weight: Dec,
    pub prices: Vec<PriceRecord>,
    pub programs: Vec<Program>,
    pub program_votes: Vec<ProgramVote>,
    pub next_program_id: u64,
}

impl Default for GenesisState {
    fn default() -> Self {
        Self {
            params: Params::default(),
            tax_rate: treasury::DEFAULT_TAX_RATE,
            reward_weight: treasury::DEFAULT_REWARD_WEIGHT,
            prices: Vec::new(),
            programs: Vec::new(),
            program_votes: Vec::new(),
            next_program_id: budget::INITIAL_PROGRAM_ID,
        }
    }
}

impl GenesisState {
    pub fn from_json(json: &str) -> StabilityResult<Self> {
        serde_json::from_str(json).map_err(|e| StabilityError::InvalidMsg(format!("genesis: {e}")))
    }

    pub fn to_json(&self) -> StabilityResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| StabilityError::InvalidMsg(format!("genesis: {e}")))
    }

    pub fn validate(&self) -> StabilityResult<()> {
        self.params.validate()?;
        let treasury = &self.params.treasury;
        if !treasury.tax_policy.contains(self.tax_rate) {
            return Err(StabilityError::InvalidParams(format!(
                "tax_rate {} outside [{}, {}]",
                self.tax_rate, treasury.tax_policy.rate_min, treasury.tax_policy.rate_max
            )));
        }
        if !treasury.reward_policy.contains(self.reward_weight) {
            return Err(StabilityError::InvalidParams(format!(
                "reward_weight {} outside [{}, {}]",
                self.reward_weight, treasury.reward_policy.rate_min, treasury.reward_policy.rate_max
            )));
        }
        if let Some(max_id) = self.programs.iter().map(|p| p.id).max() {
            if self.next_program_id <= max_id {
                return Err(StabilityError::InvalidParams(format!(
                    "next_program_id {} not above existing id {max_id}",
                    self.next_program_id
                )));
            }
        }
        Ok(())
    }

    /// Deposits still escrowed by candidate programs, per denom.
    pub fn escrowed_deposits(&self) -> BTreeMap<String, u64> {
        let mut owed: BTreeMap<String, u64> = BTreeMap::new();
        for program in self.programs.iter().filter(|p| p.status == ProgramStatus::Candidate) {
            let entry = owed.entry(program.deposit.denom.clone()).or_default();
            *entry = entry.saturating_add(program.deposit.amount);
        }
        owed
    }
}

/// Write `genesis` into an empty store and snapshot native issuance.
///
/// The deposit escrow must already hold every candidate's deposit.
pub fn init_genesis(
    store: &mut dyn KvStore,
    bank: &dyn Bank,
    genesis: &GenesisState,
) -> StabilityResult<()> {
    genesis.validate()?;
    let escrow = ModuleAccount::DepositEscrow.address();
    for (denom, owed) in genesis.escrowed_deposits() {
        let held = bank.balance(&escrow, &denom);
        if held < owed {
            return Err(StabilityError::InvalidParams(format!(
                "deposit escrow holds {held}{denom}, candidates need {owed}{denom}"
            )));
        }
    }

    genesis.params.save(store)?;
    tax::set_tax_rate(store, genesis.tax_rate)?;
    seigniorage::set_reward_weight(store, genesis.reward_weight)?;
    for record in &genesis.prices {
        oracle::tally::set_price_record(store, record)?;
    }
    for program in &genesis.programs {
        program::set_program(store, program)?;
        if program.status == ProgramStatus::Candidate {
            queue::enqueue(store, program.end_height, program.id)?;
        }
    }
    for vote in &genesis.program_votes {
        queue::set_program_vote(store, vote.program_id, &vote.voter, vote.approve)?;
    }
    program::set_next_program_id(store, genesis.next_program_id)?;

    let issuance = bank.supply(&genesis.params.clock.native_denom);
    seigniorage::set_issuance_snapshot(store, issuance)?;

    info!(
        programs = genesis.programs.len(),
        prices = genesis.prices.len(),
        issuance,
        "Stability genesis initialized"
    );
    Ok(())
}

pub fn export_genesis(store: &dyn KvStore) -> StabilityResult<GenesisState> {
    let programs = budget::programs(store)?;
    let mut program_votes = Vec::new();
    for program in &programs {
        for (voter, approve) in budget::program_votes(store, program.id)? {
            program_votes.push(ProgramVote {
                program_id: program.id,
                voter,
                approve,
            });
        }
    }

    Ok(GenesisState {
        params: Params::load(store)?,
        tax_rate: treasury::tax_rate(store)?,
        reward_weight: treasury::reward_weight(store)?,
        prices: oracle::price_records(store)?,
        programs,
        program_votes,
        next_program_id: budget::next_program_id(store)?,
    })
}
