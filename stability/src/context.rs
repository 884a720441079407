// Copyright (c) 2024 Botho Foundation

//! Per-block execution context and the collaborators the engine consumes.

use displaydoc::Display;
use thiserror::Error;

use crate::{
    epoch::EpochClock,
    event::Event,
    params::Params,
    store::{KvStore, StoreResult},
    types::{AccAddress, Coin, ValAddress},
};

/// Read access to the validator set, plus the miss signal hook.
pub trait Staking {
    /// Bonded validators with nonzero power, sorted by address.
    fn bonded_validators(&self) -> Vec<(ValAddress, u64)>;

    /// Power of `validator`, zero if unbonded.
    fn power(&self, validator: &ValAddress) -> u64 {
        self.bonded_validators()
            .into_iter()
            .find(|(v, _)| v == validator)
            .map(|(_, p)| p)
            .unwrap_or(0)
    }

    fn total_power(&self) -> u64 {
        self.bonded_validators()
            .iter()
            .fold(0u64, |acc, (_, p)| acc.saturating_add(*p))
    }

    /// Called once when a validator's miss counter reaches the threshold.
    /// Penalties are the staking module's business.
    fn signal_oracle_misses(&mut self, validator: &ValAddress, misses: u64);
}

/// Errors reported by the bank collaborator.
#[derive(Clone, Debug, Display, Error, PartialEq, Eq)]
pub enum BankError {
    /// Insufficient funds: available {available}, requested {requested}
    InsufficientFunds { available: u64, requested: u64 },

    /// Balance overflow
    Overflow,
}

/// Balances and supply. Crediting mints, debiting burns.
pub trait Bank {
    fn balance(&self, addr: &AccAddress, denom: &str) -> u64;

    fn credit(&mut self, addr: &AccAddress, coin: &Coin) -> Result<(), BankError>;

    fn debit(&mut self, addr: &AccAddress, coin: &Coin) -> Result<(), BankError>;

    fn supply(&self, denom: &str) -> u64;

    fn transfer(&mut self, from: &AccAddress, to: &AccAddress, coin: &Coin) -> Result<(), BankError> {
        self.debit(from, coin)?;
        self.credit(to, coin)
    }
}

/// State and collaborators for one block height.
pub struct Context<'a> {
    height: u64,
    time: u64,
    pub store: &'a mut dyn KvStore,
    pub staking: &'a mut dyn Staking,
    pub bank: &'a mut dyn Bank,
    params: Params,
    events: Vec<Event>,
}

impl<'a> Context<'a> {
    /// Build a context, loading parameters from the store.
    pub fn new(
        height: u64,
        time: u64,
        store: &'a mut dyn KvStore,
        staking: &'a mut dyn Staking,
        bank: &'a mut dyn Bank,
    ) -> StoreResult<Self> {
        let params = Params::load(&*store)?;
        Ok(Self::with_params(height, time, store, staking, bank, params))
    }

    pub fn with_params(
        height: u64,
        time: u64,
        store: &'a mut dyn KvStore,
        staking: &'a mut dyn Staking,
        bank: &'a mut dyn Bank,
        params: Params,
    ) -> Self {
        Self {
            height,
            time,
            store,
            staking,
            bank,
            params,
            events: Vec::new(),
        }
    }

    pub fn height(&self) -> u64 {
        self.height
    }

    /// Chain time in unix seconds.
    pub fn time(&self) -> u64 {
        self.time
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn clock(&self) -> EpochClock {
        EpochClock::new(self.params.clock.blocks_per_epoch)
    }

    pub fn epoch(&self) -> u64 {
        self.clock().epoch(self.height)
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }
}
