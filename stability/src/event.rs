// Copyright (c) 2024 Botho Foundation

//! Events emitted by handlers and end-of-block processing.

use serde::{Deserialize, Serialize};

pub const EVENT_PREVOTE: &str = "price_prevote";
pub const EVENT_VOTE: &str = "price_vote";
pub const EVENT_PRICE_UPDATE: &str = "price_update";
pub const EVENT_DENOM_INACTIVE: &str = "denom_inactive";
pub const EVENT_ORACLE_REWARD: &str = "oracle_reward";
pub const EVENT_MISS_THRESHOLD: &str = "oracle_miss_threshold";
pub const EVENT_SEIGNIORAGE: &str = "seigniorage";
pub const EVENT_POLICY_UPDATE: &str = "policy_update";
pub const EVENT_POLICY_PROBATION: &str = "policy_probation";
pub const EVENT_SUBMIT_PROGRAM: &str = "submit_program";
pub const EVENT_VOTE_PROGRAM: &str = "vote_program";
pub const EVENT_WITHDRAW_PROGRAM: &str = "withdraw_program";
pub const EVENT_PROGRAM_PASSED: &str = "program_passed";
pub const EVENT_PROGRAM_REJECTED: &str = "program_rejected";
pub const EVENT_PROGRAM_FUNDED: &str = "program_funded";
pub const EVENT_DEPOSIT_UNSETTLED: &str = "deposit_unsettled";

/// A typed event with string attributes, in emission order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub kind: String,
    pub attributes: Vec<(String, String)>,
}

impl Event {
    pub fn new(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            attributes: Vec::new(),
        }
    }

    pub fn attr(mut self, key: &str, value: impl ToString) -> Self {
        self.attributes.push((key.to_string(), value.to_string()));
        self
    }

    /// First value recorded under `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}
