// Copyright (c) 2024 Botho Foundation

//! Error types for the stability engine.

use displaydoc::Display;
use thiserror::Error;

use crate::{context::BankError, store::StoreError};

/// Errors returned by message handlers and end-of-block processing.
///
/// Every protocol violation leaves state untouched: handlers run against a
/// write buffer that is only committed on success.
#[derive(Clone, Debug, Display, Error, PartialEq, Eq)]
pub enum StabilityError {
    /// Prevote already submitted for {denom} by {voter} in this period
    DuplicatePrevote { voter: String, denom: String },

    /// No prevote found for {denom} by {voter} in this period
    NoMatchingPrevote { voter: String, denom: String },

    /// Vote already revealed for {denom} by {voter} in this period
    DuplicateVote { voter: String, denom: String },

    /// Revealed vote does not match the prevote hash
    HashMismatch,

    /// Exchange rate must not be negative: {0}
    NegativeRate(String),

    /// Invalid vote hash: {0}
    InvalidHash(String),

    /// Denomination is not whitelisted: {0}
    UnknownDenom(String),

    /// Not a bonded validator: {0}
    NotValidator(String),

    /// Program not found or no longer open: {0}
    ProgramNotFound(u64),

    /// Only the submitter may withdraw program {0}
    Unauthorized(u64),

    /// Deposit could not be escrowed: {0}
    InsufficientDeposit(BankError),

    /// Invalid program: {0}
    InvalidProgram(String),

    /// Invalid message: {0}
    InvalidMsg(String),

    /// Invalid parameters: {0}
    InvalidParams(String),

    /// Bank error: {0}
    Bank(#[from] BankError),

    /// Store error: {0}
    Store(#[from] StoreError),
}

/// Result alias for the stability engine.
pub type StabilityResult<T> = Result<T, StabilityError>;
