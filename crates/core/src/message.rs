// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-session message history: the durable, human-readable trace of a
//! session's conversation independent of the broadcaster's event stream.

use serde::{Deserialize, Serialize};

/// Per-session monotonically assigned message identity.
pub type MessageSeq = u64;

/// Kind of a history message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    User,
    Output,
    Thought,
    ToolUse,
    System,
    Error,
    Metric,
    Plan,
}

/// A single entry in a session's message history.
///
/// Invariant: once appended, `contents` may only grow by delta-append when
/// `kind == Output` and the message is the tail of the history; every other
/// kind, and every non-tail message, is immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub seq: MessageSeq,
    pub kind: MessageKind,
    pub contents: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<Vec<u8>>,
    pub timestamp_ms: u64,
}

impl Message {
    pub fn new(seq: MessageSeq, kind: MessageKind, contents: impl Into<String>, timestamp_ms: u64) -> Self {
        Self {
            seq,
            kind,
            contents: contents.into(),
            raw: None,
            timestamp_ms,
        }
    }

    pub fn with_raw(mut self, raw: Vec<u8>) -> Self {
        self.raw = Some(raw);
        self
    }

    /// Append a delta to this message's contents in place. Caller is
    /// responsible for only calling this on the tail `Output` message.
    pub fn append_delta(&mut self, delta: &str) {
        self.contents.push_str(delta);
    }
}

/// Which message-log projection an event produced. See §4.5 of the
/// component design: every event yields exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Projection {
    /// A brand-new message was appended (no raw payload carried).
    Append,
    /// A brand-new message was appended, carrying the adapter's raw payload.
    AppendRaw,
    /// An existing tail Output message grew by a delta.
    OutputDelta,
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
