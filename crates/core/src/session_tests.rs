// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::message::{Message, MessageKind};
use std::path::PathBuf;

fn sample_session() -> Session {
    Session::new(
        SessionId::new("s1"),
        "mock",
        PathBuf::from("/tmp/work"),
        "proj1",
        "untitled",
        1_000,
    )
}

#[test]
fn new_session_starts_idle() {
    let session = sample_session();
    assert_eq!(session.state, SessionState::Idle);
    assert!(session.history.is_empty());
    assert_eq!(session.created_at_ms, session.updated_at_ms);
}

#[test]
fn push_message_bumps_updated_at_and_appends() {
    let mut session = sample_session();
    session.push_message(Message::new(0, MessageKind::User, "hi", 1_500), 1_500);
    assert_eq!(session.history.len(), 1);
    assert_eq!(session.updated_at_ms, 1_500);
}

#[test]
fn touch_never_moves_backward() {
    let mut session = sample_session();
    session.touch(2_000);
    session.touch(1_000);
    assert_eq!(session.updated_at_ms, 2_000);
}

#[test]
fn tail_output_mut_only_matches_output_kind() {
    let mut session = sample_session();
    session.push_message(Message::new(0, MessageKind::User, "hi", 1_000), 1_000);
    assert!(session.tail_output_mut().is_none());
    session.push_message(Message::new(1, MessageKind::Output, "partial", 1_000), 1_000);
    assert!(session.tail_output_mut().is_some());
}

#[test]
fn next_message_seq_continues_from_tail() {
    let mut session = sample_session();
    assert_eq!(session.next_message_seq(), 0);
    session.push_message(Message::new(0, MessageKind::User, "hi", 1_000), 1_000);
    assert_eq!(session.next_message_seq(), 1);
}

#[test]
fn session_id_define_id_basics() {
    let id = SessionId::new("abc");
    assert_eq!(id.as_str(), "abc");
    assert_eq!(id.to_string(), "abc");
}
