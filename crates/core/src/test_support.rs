// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::event::{EventPayload, RawEvent, ToolCallStatus};
use crate::session::SessionId;

/// An Output event carrying a complete (non-delta) message.
pub fn output_event(session_id: &str, content: &str, now_ms: u64) -> RawEvent {
    RawEvent::new(
        SessionId::new(session_id),
        now_ms,
        EventPayload::Output {
            content: content.to_string(),
            delta: false,
        },
    )
}

/// An Output event carrying a delta to be coalesced into the tail message.
pub fn output_delta_event(session_id: &str, delta: &str, now_ms: u64) -> RawEvent {
    RawEvent::new(
        SessionId::new(session_id),
        now_ms,
        EventPayload::Output {
            content: delta.to_string(),
            delta: true,
        },
    )
}

pub fn tool_call_event(session_id: &str, id: &str, name: &str, status: ToolCallStatus, now_ms: u64) -> RawEvent {
    RawEvent::new(
        SessionId::new(session_id),
        now_ms,
        EventPayload::ToolCall {
            id: id.to_string(),
            name: name.to_string(),
            status,
        },
    )
}

pub fn error_event(session_id: &str, message: &str, now_ms: u64) -> RawEvent {
    RawEvent::new(
        SessionId::new(session_id),
        now_ms,
        EventPayload::Error {
            message: message.to_string(),
        },
    )
}

pub fn status_change_event(session_id: &str, old: &str, new: &str, now_ms: u64) -> RawEvent {
    RawEvent::new(
        SessionId::new(session_id),
        now_ms,
        EventPayload::StatusChange {
            old: old.to_string(),
            new: new.to_string(),
        },
    )
}

pub fn metric_event(session_id: &str, input_tokens: u64, output_tokens: u64, requests: u64, now_ms: u64) -> RawEvent {
    RawEvent::new(
        SessionId::new(session_id),
        now_ms,
        EventPayload::Metric {
            input_tokens,
            output_tokens,
            requests,
        },
    )
}
