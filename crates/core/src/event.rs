// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event model (C1): the tagged variants an adapter emits, and the
//! broadcaster-stamped envelope that carries them to subscribers.

use crate::session::SessionId;
use serde::{Deserialize, Serialize};

/// Global, per-broadcaster monotonic event identity.
pub type EventId = u64;

/// Status of a tool call as reported by the adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCallStatus {
    Pending,
    Waiting,
    Running,
    Completed,
    Failed,
}

impl ToolCallStatus {
    /// Whether this status should drive the session into Suspended (§4.3).
    pub fn triggers_suspend(&self) -> bool {
        matches!(self, ToolCallStatus::Pending | ToolCallStatus::Waiting)
    }
}

/// One step of a Plan event, rendered in the message log as `id: description`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanStep {
    pub id: String,
    pub description: String,
}

/// Variant-specific payload of an event. Tagged the way the rest of the
/// corpus tags its domain enums, so downstream consumers (and the message
/// log projection in §4.5) can match exhaustively.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    StatusChange { old: String, new: String },
    Output { content: String, delta: bool },
    Thought { content: String },
    Error { message: String },
    Metric { input_tokens: u64, output_tokens: u64, requests: u64 },
    Metadata { key: String, value: String },
    ToolCall { id: String, name: String, status: ToolCallStatus },
    Plan { steps: Vec<PlanStep> },
}

impl EventPayload {
    /// Short name used in tracing spans and log lines.
    pub fn name(&self) -> &'static str {
        match self {
            EventPayload::StatusChange { .. } => "status_change",
            EventPayload::Output { .. } => "output",
            EventPayload::Thought { .. } => "thought",
            EventPayload::Error { .. } => "error",
            EventPayload::Metric { .. } => "metric",
            EventPayload::Metadata { .. } => "metadata",
            EventPayload::ToolCall { .. } => "tool_call",
            EventPayload::Plan { .. } => "plan",
        }
    }
}

/// An event as produced by an adapter, before the broadcaster has assigned
/// it an id. This is what `send-input`'s event channel carries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEvent {
    pub session_id: SessionId,
    pub timestamp_ms: u64,
    pub payload: EventPayload,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<Vec<u8>>,
}

impl RawEvent {
    pub fn new(session_id: SessionId, timestamp_ms: u64, payload: EventPayload) -> Self {
        Self {
            session_id,
            timestamp_ms,
            payload,
            raw: None,
        }
    }

    pub fn with_raw(mut self, raw: Vec<u8>) -> Self {
        self.raw = Some(raw);
        self
    }

    /// Stamp this event with a broadcaster-assigned id, producing the
    /// wire/subscriber-facing `Event`.
    pub fn stamp(self, id: EventId) -> Event {
        Event {
            id,
            session_id: self.session_id,
            timestamp_ms: self.timestamp_ms,
            payload: self.payload,
            raw: self.raw,
        }
    }
}

/// A broadcaster-assigned, globally ordered event. Lives in memory only;
/// persisted indirectly via message-log projections (§4.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub session_id: SessionId,
    pub timestamp_ms: u64,
    pub payload: EventPayload,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<Vec<u8>>,
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
