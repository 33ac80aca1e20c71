// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Errors surfaced by the engine runtime, composed over the core error
//! taxonomy (§7) and the adapter/storage error types.

use conductor_adapters::AdapterError;
use conductor_core::CoreError;
use conductor_storage::StorageError;
use thiserror::Error;

/// Errors that can occur while driving an executor operation.
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl From<AdapterError> for ExecutorError {
    fn from(e: AdapterError) -> Self {
        ExecutorError::Core(CoreError::AdapterError(e.to_string()))
    }
}
