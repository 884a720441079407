// Copyright (c) 2024 Botho Foundation

//! In-memory collaborators and a block-stepping harness for tests and
//! simulations.

use std::collections::BTreeMap;

use crate::{
    context::{Bank, BankError, Context, Staking},
    error::StabilityResult,
    event::Event,
    genesis::{init_genesis, GenesisState},
    handler::{self, Msg},
    params::Params,
    store::MemStore,
    types::{AccAddress, Coin, ValAddress},
};

/// Deterministic validator address for index `i`.
pub fn val(i: u8) -> ValAddress {
    ValAddress::from_bytes([i; 20])
}

/// Deterministic account address for index `i`.
pub fn acc(i: u8) -> AccAddress {
    val(i).account()
}

/// Fixed validator set that records miss signals.
#[derive(Clone, Debug, Default)]
pub struct MockStaking {
    validators: BTreeMap<ValAddress, u64>,
    pub miss_signals: Vec<(ValAddress, u64)>,
}

impl MockStaking {
    pub fn new(validators: impl IntoIterator<Item = (ValAddress, u64)>) -> Self {
        Self {
            validators: validators.into_iter().collect(),
            miss_signals: Vec::new(),
        }
    }

    /// Set power; zero unbonds.
    pub fn set_power(&mut self, validator: ValAddress, power: u64) {
        if power == 0 {
            self.validators.remove(&validator);
        } else {
            self.validators.insert(validator, power);
        }
    }
}

impl Staking for MockStaking {
    fn bonded_validators(&self) -> Vec<(ValAddress, u64)> {
        self.validators
            .iter()
            .filter(|(_, p)| **p > 0)
            .map(|(v, p)| (*v, *p))
            .collect()
    }

    fn power(&self, validator: &ValAddress) -> u64 {
        self.validators.get(validator).copied().unwrap_or(0)
    }

    fn signal_oracle_misses(&mut self, validator: &ValAddress, misses: u64) {
        self.miss_signals.push((*validator, misses));
    }
}

/// Balances with supply tracking. Credit mints, debit burns.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MockBank {
    balances: BTreeMap<(AccAddress, String), u64>,
    supply: BTreeMap<String, u64>,
}

impl Bank for MockBank {
    fn balance(&self, addr: &AccAddress, denom: &str) -> u64 {
        self.balances
            .get(&(*addr, denom.to_string()))
            .copied()
            .unwrap_or(0)
    }

    fn credit(&mut self, addr: &AccAddress, coin: &Coin) -> Result<(), BankError> {
        let supply = self.supply.entry(coin.denom.clone()).or_default();
        let new_supply = supply.checked_add(coin.amount).ok_or(BankError::Overflow)?;
        let balance = self
            .balances
            .entry((*addr, coin.denom.clone()))
            .or_default();
        *balance = balance.checked_add(coin.amount).ok_or(BankError::Overflow)?;
        *self.supply.entry(coin.denom.clone()).or_default() = new_supply;
        Ok(())
    }

    fn debit(&mut self, addr: &AccAddress, coin: &Coin) -> Result<(), BankError> {
        let available = self.balance(addr, &coin.denom);
        if available < coin.amount {
            return Err(BankError::InsufficientFunds {
                available,
                requested: coin.amount,
            });
        }
        self.balances
            .insert((*addr, coin.denom.clone()), available - coin.amount);
        let supply = self.supply.entry(coin.denom.clone()).or_default();
        *supply = supply.saturating_sub(coin.amount);
        Ok(())
    }

    fn supply(&self, denom: &str) -> u64 {
        self.supply.get(denom).copied().unwrap_or(0)
    }
}

/// A single-node chain: store, collaborators and the current height.
///
/// Messages are delivered at `height`; [`TestEnv::end_block`] runs the
/// end-of-block hook at `height` and then advances it.
pub struct TestEnv {
    pub store: MemStore,
    pub staking: MockStaking,
    pub bank: MockBank,
    pub params: Params,
    pub height: u64,
    pub time: u64,
}

impl TestEnv {
    /// Genesis with `params` and the given validator set, at height 1.
    pub fn new(params: Params, validators: impl IntoIterator<Item = (ValAddress, u64)>) -> Self {
        let mut env = Self {
            store: MemStore::new(),
            staking: MockStaking::new(validators),
            bank: MockBank::default(),
            params: params.clone(),
            height: 1,
            time: 0,
        };
        let genesis = GenesisState {
            params,
            ..Default::default()
        };
        if let Err(err) = init_genesis(&mut env.store, &env.bank, &genesis) {
            panic!("test genesis failed: {err}");
        }
        env
    }

    /// `n` validators `val(1)..=val(n)` with equal power.
    pub fn with_validators(n: u8, power: u64) -> Self {
        Self::new(Params::default(), (1..=n).map(|i| (val(i), power)))
    }

    /// Persist `self.params` after editing them.
    pub fn save_params(&mut self) {
        if let Err(err) = self.params.save(&mut self.store) {
            panic!("saving params failed: {err}");
        }
    }

    pub fn ctx(&mut self) -> Context<'_> {
        Context::with_params(
            self.height,
            self.time,
            &mut self.store,
            &mut self.staking,
            &mut self.bank,
            self.params.clone(),
        )
    }

    pub fn deliver(&mut self, msg: Msg) -> StabilityResult<Vec<Event>> {
        handler::deliver(&mut self.ctx(), &msg)
    }

    /// End the current block and move to the next one.
    pub fn end_block(&mut self) -> StabilityResult<Vec<Event>> {
        let events = handler::end_block(&mut self.ctx())?;
        self.height += 1;
        self.time += 6;
        Ok(events)
    }

    /// End blocks until `height` is the current (not yet ended) block.
    pub fn advance_to(&mut self, height: u64) -> StabilityResult<Vec<Event>> {
        let mut events = Vec::new();
        while self.height < height {
            events.extend(self.end_block()?);
        }
        Ok(events)
    }

    /// Mint `amount` of `denom` to `addr`.
    pub fn fund(&mut self, addr: &AccAddress, denom: &str, amount: u64) {
        if let Err(err) = self.bank.credit(addr, &Coin::new(denom, amount)) {
            panic!("funding failed: {err}");
        }
    }
}
