// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use conductor_core::{FakeClock, IdGen, SequentialIdGen};

fn manager(dir: &std::path::Path, clock: Arc<FakeClock>, ttl_ms: u64) -> ResumeTokenManager {
    let store = conductor_storage::open(dir);
    let gen = SequentialIdGen::new("tok");
    ResumeTokenManager::new(store, clock, Arc::new(move || gen.next()), ttl_ms)
}

#[test]
fn mint_then_consume_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(FakeClock::new(1_000));
    let mgr = manager(dir.path(), clock, 60_000);

    let token = mgr
        .mint(SessionId::new("s1"), RunAttemptId::new("a1"))
        .unwrap();
    assert!(!token.is_consumed());

    let consumed = mgr.consume(&token.id).unwrap();
    assert!(consumed.is_consumed());
    assert!(consumed.is_revoked());
}

#[test]
fn consume_twice_returns_revoked() {
    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(FakeClock::new(1_000));
    let mgr = manager(dir.path(), clock, 60_000);

    let token = mgr
        .mint(SessionId::new("s1"), RunAttemptId::new("a1"))
        .unwrap();
    mgr.consume(&token.id).unwrap();

    let err = mgr.consume(&token.id).unwrap_err();
    assert!(matches!(err, ExecutorError::Core(CoreError::TokenRevoked)));
}

#[test]
fn consume_expired_returns_expired() {
    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(FakeClock::new(1_000));
    let mgr = manager(dir.path(), Arc::clone(&clock), 1_000);

    let token = mgr
        .mint(SessionId::new("s1"), RunAttemptId::new("a1"))
        .unwrap();
    clock.advance_ms(5_000);

    let err = mgr.consume(&token.id).unwrap_err();
    assert!(matches!(err, ExecutorError::Core(CoreError::TokenExpired)));
}

#[test]
fn consume_unknown_token_returns_invalid() {
    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(FakeClock::new(1_000));
    let mgr = manager(dir.path(), clock, 60_000);

    let err = mgr.consume(&ResumeTokenId::new("ghost")).unwrap_err();
    assert!(matches!(err, ExecutorError::Core(CoreError::TokenInvalid)));
}

#[test]
fn mint_assigns_distinct_ids() {
    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(FakeClock::new(1_000));
    let mgr = manager(dir.path(), clock, 60_000);
    let t1 = mgr.mint(SessionId::new("s1"), RunAttemptId::new("a1")).unwrap();
    let t2 = mgr.mint(SessionId::new("s1"), RunAttemptId::new("a1")).unwrap();
    assert_ne!(t1.id, t2.id);
}
