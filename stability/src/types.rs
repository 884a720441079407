// Copyright (c) 2024 Botho Foundation

//! Addresses, coins and module accounts.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::{fmt, str::FromStr};

use crate::error::StabilityError;

/// Length in bytes of validator and account addresses.
pub const ADDRESS_LEN: usize = 20;

/// Longest accepted denomination name.
pub const MAX_DENOM_LEN: usize = 64;

macro_rules! address_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name([u8; ADDRESS_LEN]);

        impl $name {
            pub const fn from_bytes(bytes: [u8; ADDRESS_LEN]) -> Self {
                Self(bytes)
            }

            pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
                &self.0
            }

            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.to_hex())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), &self.to_hex()[..8])
            }
        }

        // hex in human-readable formats, raw bytes otherwise
        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                if serializer.is_human_readable() {
                    serializer.collect_str(self)
                } else {
                    self.0.serialize(serializer)
                }
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                if deserializer.is_human_readable() {
                    let text = String::deserialize(deserializer)?;
                    text.parse().map_err(de::Error::custom)
                } else {
                    Ok(Self(<[u8; ADDRESS_LEN]>::deserialize(deserializer)?))
                }
            }
        }

        impl FromStr for $name {
            type Err = StabilityError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let mut bytes = [0u8; ADDRESS_LEN];
                hex::decode_to_slice(s, &mut bytes)
                    .map_err(|e| StabilityError::InvalidMsg(format!("bad address {s}: {e}")))?;
                Ok(Self(bytes))
            }
        }
    };
}

address_type!(
    /// Validator operator address.
    ValAddress
);

address_type!(
    /// Account address holding balances.
    AccAddress
);

impl ValAddress {
    /// The operator's own account, which receives oracle rewards.
    pub fn account(&self) -> AccAddress {
        AccAddress(self.0)
    }
}

impl AccAddress {
    /// Deterministic address of a named module account.
    pub fn module(name: &str) -> Self {
        let digest = Sha256::digest(name.as_bytes());
        let mut bytes = [0u8; ADDRESS_LEN];
        bytes.copy_from_slice(&digest[..ADDRESS_LEN]);
        Self(bytes)
    }
}

/// Accounts owned by the engine itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ModuleAccount {
    /// Funds oracle vote rewards; receives the miner share of seigniorage.
    RewardPool,
    /// Receives the non-miner share of seigniorage; pays active programs.
    BudgetPool,
    /// Holds program deposits while a program exists.
    DepositEscrow,
}

impl ModuleAccount {
    pub fn name(&self) -> &'static str {
        match self {
            ModuleAccount::RewardPool => "oracle_reward_pool",
            ModuleAccount::BudgetPool => "budget_pool",
            ModuleAccount::DepositEscrow => "budget_deposit_escrow",
        }
    }

    pub fn address(&self) -> AccAddress {
        AccAddress::module(self.name())
    }
}

/// An amount of a single denomination.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    pub amount: u64,
}

impl Coin {
    pub fn new(denom: impl Into<String>, amount: u64) -> Self {
        Self {
            denom: denom.into(),
            amount,
        }
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

/// Denominations are short lowercase alphanumeric names starting with a
/// letter, e.g. `ukrw`.
pub fn validate_denom(denom: &str) -> Result<(), StabilityError> {
    let mut chars = denom.chars();
    let starts_with_letter = chars.next().is_some_and(|c| c.is_ascii_lowercase());
    if !starts_with_letter
        || denom.len() > MAX_DENOM_LEN
        || !denom
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
    {
        return Err(StabilityError::InvalidMsg(format!("invalid denom: {denom:?}")));
    }
    Ok(())
}
