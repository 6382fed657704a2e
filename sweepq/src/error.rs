// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("concurrency limit must be at least 1, got {0}")]
    InvalidConcurrencyLimit(usize),

    #[error("global dispatcher has already been initialized")]
    AlreadyInitialized,

    #[error("global dispatcher has not been initialized")]
    NotInitialized,
}

pub type Result<T> = std::result::Result<T, DispatchError>;
