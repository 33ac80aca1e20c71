// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn tool_call_status_triggers_suspend_only_for_pending_and_waiting() {
    assert!(ToolCallStatus::Pending.triggers_suspend());
    assert!(ToolCallStatus::Waiting.triggers_suspend());
    assert!(!ToolCallStatus::Running.triggers_suspend());
    assert!(!ToolCallStatus::Completed.triggers_suspend());
    assert!(!ToolCallStatus::Failed.triggers_suspend());
}

#[test]
fn stamp_assigns_id_and_preserves_payload() {
    let raw = RawEvent::new(
        SessionId::new("s1"),
        1_000,
        EventPayload::Output {
            content: "hi".into(),
            delta: false,
        },
    );
    let event = raw.stamp(42);
    assert_eq!(event.id, 42);
    assert_eq!(event.session_id, "s1");
    matches!(event.payload, EventPayload::Output { .. });
}

#[test]
fn payload_name_matches_tag() {
    let payload = EventPayload::ToolCall {
        id: "t1".into(),
        name: "grep".into(),
        status: ToolCallStatus::Pending,
    };
    assert_eq!(payload.name(), "tool_call");
}

#[test]
fn event_serde_tags_payload_variant() {
    let raw = RawEvent::new(
        SessionId::new("s1"),
        1_000,
        EventPayload::Metric {
            input_tokens: 10,
            output_tokens: 20,
            requests: 1,
        },
    );
    let json = serde_json::to_value(&raw).unwrap();
    assert_eq!(json["payload"]["type"], "metric");
}
