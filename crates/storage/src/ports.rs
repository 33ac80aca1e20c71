// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Storage ports: the trait surface the engine depends on, independent of
//! any particular backing implementation.

use crate::error::StorageError;
use conductor_core::{Message, ResumeToken, ResumeTokenId, RunAttempt, RunAttemptId, Session, SessionId, TerminalRecord};

/// Durable storage of session records.
pub trait SessionStore: Send + Sync {
    fn save(&self, session: &Session) -> Result<(), StorageError>;
    fn load(&self, id: &SessionId) -> Result<Option<Session>, StorageError>;
    fn list(&self) -> Result<Vec<Session>, StorageError>;
    fn delete(&self, id: &SessionId) -> Result<(), StorageError>;
}

/// Durable append-only log of a session's message history.
pub trait MessageLogAppender: Send + Sync {
    /// Append a message, assigning it the next sequence number for this session.
    fn append(&self, session_id: &SessionId, message: &Message) -> Result<(), StorageError>;

    /// Replay every message appended for this session, in order.
    fn replay(&self, session_id: &SessionId) -> Result<Vec<Message>, StorageError>;
}

/// Durable storage of run attempt records.
pub trait RunAttemptStore: Send + Sync {
    fn save(&self, attempt: &RunAttempt) -> Result<(), StorageError>;
    fn load(&self, id: &RunAttemptId) -> Result<Option<RunAttempt>, StorageError>;
    fn list_for_session(&self, session_id: &SessionId) -> Result<Vec<RunAttempt>, StorageError>;
}

/// Durable storage of resume tokens.
pub trait ResumeTokenStore: Send + Sync {
    fn save(&self, token: &ResumeToken) -> Result<(), StorageError>;
    fn load(&self, id: &ResumeTokenId) -> Result<Option<ResumeToken>, StorageError>;
}

/// Durable storage of the last known terminal snapshot per session.
pub trait TerminalStore: Send + Sync {
    fn save(&self, record: &TerminalRecord) -> Result<(), StorageError>;
    fn load(&self, session_id: &SessionId) -> Result<Option<TerminalRecord>, StorageError>;
    fn list(&self) -> Result<Vec<TerminalRecord>, StorageError>;
}
