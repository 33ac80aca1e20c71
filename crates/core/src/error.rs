// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The exhaustive error taxonomy (§7) the core surfaces to its embedder.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("provider not found: {0}")]
    ProviderNotFound(String),

    #[error("resume token invalid")]
    TokenInvalid,

    #[error("resume token expired")]
    TokenExpired,

    #[error("resume token revoked")]
    TokenRevoked,

    #[error("operation timed out")]
    Timeout,

    #[error("executor is shutting down")]
    Shutdown,

    /// Bubbled up verbatim from an adapter; never treated as a core
    /// invariant violation.
    #[error("adapter error: {0}")]
    AdapterError(String),

    #[error("terminal not supported")]
    TerminalNotSupported,
}
