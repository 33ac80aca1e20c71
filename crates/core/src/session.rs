// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session identifier and the persisted session domain record.
//!
//! A `Session` is the durable record of one long-running agent conversation;
//! it is distinct from a `Run` (engine::session_context), which is the
//! in-memory handle to the currently executing activity, if any.

use crate::message::Message;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

crate::define_id! {
    /// Unique identifier for a session.
    pub struct SessionId;
}

/// Backend family a session talks to (e.g. "claude", "gemini", "bash-pty").
/// Opaque to the core; adapters register which kinds they serve.
pub type ProviderKind = String;

/// The three states a session may occupy. See component design §4.1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Running,
    Suspended,
}

/// Opaque payload an adapter hands back from `suspend()`, stored verbatim and
/// returned to it unmodified on `resume()`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SuspensionPayload(pub Vec<u8>);

/// The persisted, durable record of a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub provider_kind: ProviderKind,
    pub working_dir: PathBuf,
    pub project_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_task: Option<String>,
    pub created_at_ms: u64,
    pub updated_at_ms: u64,
    pub state: SessionState,
    #[serde(default)]
    pub history: Vec<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suspension: Option<SuspensionPayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_provider_id: Option<String>,
    #[serde(default)]
    pub provider_config: serde_json::Value,
}

impl Session {
    pub fn new(
        id: SessionId,
        provider_kind: impl Into<String>,
        working_dir: PathBuf,
        project_id: impl Into<String>,
        title: impl Into<String>,
        now_ms: u64,
    ) -> Self {
        Self {
            id,
            provider_kind: provider_kind.into(),
            working_dir,
            project_id: project_id.into(),
            title: title.into(),
            current_task: None,
            created_at_ms: now_ms,
            updated_at_ms: now_ms,
            state: SessionState::Idle,
            history: Vec::new(),
            suspension: None,
            preferred_provider_id: None,
            provider_config: serde_json::Value::Null,
        }
    }

    /// Append-only: push a new message and bump `updated_at_ms`. `now_ms`
    /// must be monotonically non-decreasing across calls for a session.
    pub fn push_message(&mut self, message: Message, now_ms: u64) {
        self.history.push(message);
        self.touch(now_ms);
    }

    /// Returns the mutable tail message if it exists and is an Output
    /// message, the only kind eligible for delta-append (§3 invariant).
    pub fn tail_output_mut(&mut self) -> Option<&mut Message> {
        match self.history.last_mut() {
            Some(m) if m.kind == crate::message::MessageKind::Output => Some(m),
            _ => None,
        }
    }

    pub fn next_message_seq(&self) -> u64 {
        self.history.last().map(|m| m.seq + 1).unwrap_or(0)
    }

    pub fn set_state(&mut self, state: SessionState, now_ms: u64) {
        self.state = state;
        self.touch(now_ms);
    }

    pub fn touch(&mut self, now_ms: u64) {
        self.updated_at_ms = self.updated_at_ms.max(now_ms);
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
