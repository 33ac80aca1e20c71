// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Terminal (PTY) snapshot/diff model shared by the Terminal Hub (C4) and the
//! terminal store port (C7).

use crate::session::SessionId;
use serde::{Deserialize, Serialize};

/// Kind of terminal a session exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalKind {
    Pty,
    AdHoc,
}

/// A full terminal screen: dimensions plus the complete line buffer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerminalSnapshot {
    pub rows: u32,
    pub cols: u32,
    pub lines: Vec<String>,
}

/// A rectangular region of a terminal screen a Diff update replaces.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TerminalRegion {
    pub row_start: u32,
    pub row_end: u32,
}

/// An upstream update an adapter's TerminalProvider capability emits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TerminalUpdate {
    Snapshot(TerminalSnapshot),
    Diff { region: TerminalRegion, lines: Vec<String> },
    Error { code: String, message: String, resync: bool },
}

/// One event in a terminal subscriber's stream: an update plus its
/// hub-assigned seq.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerminalStreamEvent {
    pub seq: u64,
    pub update: TerminalUpdate,
}

/// Persisted last-known state of a session's terminal (§3 "Terminal record").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerminalRecord {
    pub session_id: SessionId,
    pub kind: TerminalKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_snapshot: Option<TerminalSnapshot>,
    pub last_seq: u64,
    pub last_updated_at_ms: u64,
}

impl TerminalRecord {
    pub fn new(session_id: SessionId, kind: TerminalKind, now_ms: u64) -> Self {
        Self {
            session_id,
            kind,
            last_snapshot: None,
            last_seq: 0,
            last_updated_at_ms: now_ms,
        }
    }

    /// Applies a stream event to the cached record; only `Snapshot` updates
    /// move `last_snapshot` forward, matching the hub's own cache semantics.
    pub fn apply(&mut self, event: &TerminalStreamEvent, now_ms: u64) {
        self.last_seq = event.seq;
        self.last_updated_at_ms = now_ms;
        if let TerminalUpdate::Snapshot(snapshot) = &event.update {
            self.last_snapshot = Some(snapshot.clone());
        }
    }
}

#[cfg(test)]
#[path = "terminal_tests.rs"]
mod tests;
