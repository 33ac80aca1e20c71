// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use conductor_adapters::ReferenceAdapter;
use conductor_core::{RunAttemptId, SessionId, SessionState};
use std::path::PathBuf;

fn test_session() -> Session {
    Session::new(
        SessionId::new("s1"),
        "reference".to_string(),
        PathBuf::from("/work/project"),
        "proj-1".to_string(),
        "title".to_string(),
        1_000,
    )
}

#[test]
fn new_context_has_no_run() {
    let ctx = SessionContext::new(test_session());
    assert!(!ctx.has_run());
    assert!(ctx.run_scope().is_none());
}

#[test]
fn set_run_then_take_run_clears_it() {
    let ctx = SessionContext::new(test_session());
    let adapter: Arc<dyn SessionAdapter> = Arc::new(ReferenceAdapter::new(SessionId::new("s1")));
    ctx.set_run(Run {
        adapter,
        scope: CancellationToken::new(),
        attempt_id: RunAttemptId::new("a1"),
        started_at_ms: 1_000,
    });
    assert!(ctx.has_run());
    let run = ctx.take_run().expect("run was set");
    assert_eq!(run.attempt_id, RunAttemptId::new("a1"));
    assert!(!ctx.has_run());
}

#[test]
fn with_session_mut_observes_subsequent_snapshot() {
    let ctx = SessionContext::new(test_session());
    ctx.with_session_mut(|session| session.set_state(SessionState::Running, 2_000));
    assert_eq!(ctx.session_snapshot().state, SessionState::Running);
}

#[test]
fn suspended_adapter_round_trips() {
    let ctx = SessionContext::new(test_session());
    assert!(ctx.take_suspended_adapter().is_none());
    let adapter: Arc<dyn SessionAdapter> = Arc::new(ReferenceAdapter::new(SessionId::new("s1")));
    ctx.set_suspended_adapter(adapter);
    let taken = ctx.take_suspended_adapter();
    assert!(taken.is_some());
    assert!(ctx.take_suspended_adapter().is_none());
}

#[test]
fn terminal_hub_round_trips() {
    let ctx = SessionContext::new(test_session());
    assert!(ctx.terminal_hub().is_none());
    ctx.set_terminal_hub(Arc::new(TerminalHub::new()));
    assert!(ctx.terminal_hub().is_some());
    assert!(ctx.take_terminal_hub().is_some());
    assert!(ctx.terminal_hub().is_none());
}
