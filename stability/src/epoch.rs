// Copyright (c) 2024 Botho Foundation

//! Block height to epoch and voting-period mapping.
//!
//! Epoch `e` covers heights `[e × len, (e + 1) × len)`. Its last block is the
//! one at which end-of-epoch processing runs. Voting periods follow the same
//! shape with their own length.

/// Maps heights onto fixed-length epochs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EpochClock {
    blocks_per_epoch: u64,
}

impl EpochClock {
    /// A zero length behaves as one block per epoch.
    pub fn new(blocks_per_epoch: u64) -> Self {
        Self {
            blocks_per_epoch: blocks_per_epoch.max(1),
        }
    }

    pub fn blocks_per_epoch(&self) -> u64 {
        self.blocks_per_epoch
    }

    pub fn epoch(&self, height: u64) -> u64 {
        height / self.blocks_per_epoch
    }

    pub fn is_epoch_end(&self, height: u64) -> bool {
        is_period_end(height, self.blocks_per_epoch)
    }

    /// First height belonging to `epoch`.
    pub fn epoch_start(&self, epoch: u64) -> u64 {
        epoch.saturating_mul(self.blocks_per_epoch)
    }
}

/// Voting period containing `height`.
pub fn period(height: u64, len: u64) -> u64 {
    height / len.max(1)
}

/// True at the last block of a period of `len` blocks.
pub fn is_period_end(height: u64, len: u64) -> bool {
    height.wrapping_add(1) % len.max(1) == 0
}
