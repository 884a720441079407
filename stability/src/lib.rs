//! Epoch-based macro-stability engine for multi-denomination stablecoins.
//!
//! The engine is a deterministic state machine driven by block height. It
//! has three coupled parts:
//!
//! 1. **Oracle**: validators commit to exchange rates with a hashed prevote,
//!    reveal them in the same voting period, and a power-weighted median
//!    becomes the price when enough power revealed.
//!
//! 2. **Treasury**: once per epoch, native-supply contraction is re-minted as
//!    seigniorage and split between the oracle reward pool and the budget
//!    pool; the tax rate and reward weight are then steered by feedback from
//!    a rolling window of indicators.
//!
//! 3. **Budget**: funding programs are submitted with a deposit, voted on by
//!    validators, evaluated once after a fixed vote period, and paid from the
//!    budget pool while active.
//!
//! ## Block lifecycle
//!
//! | Phase         | What runs                                                 |
//! |---------------|-----------------------------------------------------------|
//! | Messages      | [`handler::deliver`], each atomically against a cache     |
//! | End of block  | oracle period close, budget queue sweep                   |
//! | End of epoch  | seigniorage, tax rate, reward weight, program funding     |
//!
//! All rates are 18-decimal fixed point ([`Dec`]); nothing in a state
//! transition uses floating point.

pub mod budget;
pub mod config;
pub mod context;
pub mod dec;
pub mod epoch;
pub mod error;
pub mod event;
pub mod genesis;
pub mod handler;
pub mod oracle;
pub mod params;
pub mod query;
pub mod store;
pub mod telemetry;
pub mod treasury;
pub mod types;

#[cfg(any(test, feature = "test_utils"))]
pub mod mock;

pub use context::{Bank, BankError, Context, Staking};
pub use dec::Dec;
pub use epoch::EpochClock;
pub use error::{StabilityError, StabilityResult};
pub use event::Event;
pub use genesis::{export_genesis, init_genesis, GenesisState};
pub use handler::{deliver, end_block, Msg};
pub use params::{BudgetParams, ClockParams, DepositPolicy, OracleParams, Params, PolicyConstraints, TreasuryParams};
pub use query::Querier;
pub use store::{CachedStore, KvStore, LmdbStore, MemStore, StoreError};
pub use types::{AccAddress, Coin, ModuleAccount, ValAddress};
