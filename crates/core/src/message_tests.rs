// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn append_delta_grows_contents() {
    let mut msg = Message::new(1, MessageKind::Output, "hello", 1_000);
    msg.append_delta(" world");
    assert_eq!(msg.contents, "hello world");
}

#[test]
fn with_raw_attaches_payload() {
    let msg = Message::new(1, MessageKind::Output, "x", 1_000).with_raw(vec![1, 2, 3]);
    assert_eq!(msg.raw, Some(vec![1, 2, 3]));
}

#[test]
fn message_serde_roundtrip() {
    let msg = Message::new(7, MessageKind::ToolUse, "grep: t1", 42);
    let json = serde_json::to_string(&msg).unwrap();
    let back: Message = serde_json::from_str(&json).unwrap();
    assert_eq!(back.seq, 7);
    assert_eq!(back.kind, MessageKind::ToolUse);
    assert_eq!(back.contents, "grep: t1");
}
