// Copyright (c) 2024 Botho Foundation

//! Vote hashes and per-validator vote state.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::{
    dec::Dec,
    error::StabilityError,
    types::ValAddress,
};

/// Length in bytes of a prevote hash.
pub const VOTE_HASH_LEN: usize = 20;

/// Commitment to `(salt, rate, denom, voter)` submitted in a prevote.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VoteHash([u8; VOTE_HASH_LEN]);

impl VoteHash {
    /// First 20 bytes of `SHA-256("{salt}:{rate}:{denom}:{voter}")`, with the
    /// rate in canonical 18-decimal form and the voter in lowercase hex.
    pub fn compute(salt: &str, rate: Dec, denom: &str, voter: &ValAddress) -> Self {
        let preimage = format!("{salt}:{rate}:{denom}:{voter}");
        let digest = Sha256::digest(preimage.as_bytes());
        let mut bytes = [0u8; VOTE_HASH_LEN];
        bytes.copy_from_slice(&digest[..VOTE_HASH_LEN]);
        Self(bytes)
    }

    pub fn from_hex(s: &str) -> Result<Self, StabilityError> {
        let mut bytes = [0u8; VOTE_HASH_LEN];
        hex::decode_to_slice(s, &mut bytes)
            .map_err(|e| StabilityError::InvalidHash(format!("{s}: {e}")))?;
        Ok(Self(bytes))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for VoteHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for VoteHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VoteHash({})", self.to_hex())
    }
}

/// Commit-reveal state of one (validator, denom, period).
///
/// `None` is never stored; entries are deleted when their period closes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoteState {
    None,
    Prevoted { hash: VoteHash },
    Revealed { rate: Dec },
}

/// A stored vote with its coordinates.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteEntry {
    pub period: u64,
    pub denom: String,
    pub voter: ValAddress,
    pub state: VoteState,
}
