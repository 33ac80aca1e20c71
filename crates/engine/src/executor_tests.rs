// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use async_trait::async_trait;
use conductor_adapters::{AdapterError, AdapterStatus, ReferenceAdapter, SessionAdapter, Suspendable};
use conductor_core::{
    FakeClock, MessageKind, RawEvent, SessionId, SessionState, SuspensionPayload, ToolCallStatus,
};
use parking_lot::Mutex as PLMutex;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::tempdir;

fn test_config() -> ExecutorConfig {
    ExecutorConfig {
        op_timeout: Duration::from_millis(200),
        checkpoint_interval: Duration::from_secs(3600),
        resume_token_ttl: Duration::from_secs(3600),
        terminal_update_buffer: 8,
        subscriber_buffer: 8,
        boot_id: "boot-test".to_string(),
    }
}

fn sequential_ids(prefix: &'static str) -> IdFactory {
    let counter = std::sync::atomic::AtomicU64::new(0);
    Arc::new(move || format!("{prefix}-{}", counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst)))
}

struct Harness {
    executor: Arc<Executor>,
    root: tempfile::TempDir,
}

fn build_harness(factories: HashMap<String, AdapterFactory>) -> Harness {
    let root = tempdir().expect("tempdir");
    let store = conductor_storage::open(root.path());
    let deps = ExecutorDeps {
        session_store: store.clone(),
        message_log: store.clone(),
        run_attempt_store: store.clone(),
        resume_token_store: store.clone(),
        terminal_store: store,
        clock: Arc::new(FakeClock::new(1_000)),
        id_gen: sequential_ids("id"),
        adapter_factories: factories,
    };
    Harness { executor: Executor::new(deps, test_config()), root }
}

fn reference_factory() -> AdapterFactory {
    Arc::new(|session_id, _config| Ok(Arc::new(ReferenceAdapter::new(session_id.clone())) as Arc<dyn SessionAdapter>))
}

fn reference_harness() -> Harness {
    let mut factories: HashMap<String, AdapterFactory> = HashMap::new();
    factories.insert("reference".to_string(), reference_factory());
    build_harness(factories)
}

fn make_session(executor: &Executor, id: &str) -> SessionId {
    let session_id = SessionId::new(id);
    executor
        .create_session(session_id.clone(), "reference", PathBuf::from("/work"), "proj-1", "title", None, Vec::new())
        .expect("create_session");
    session_id
}

async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
    tokio::time::sleep(Duration::from_millis(20)).await;
}

#[tokio::test]
async fn create_session_rejects_duplicate_id() {
    let harness = reference_harness();
    let id = make_session(&harness.executor, "s1");
    let err = harness
        .executor
        .create_session(id, "reference", PathBuf::from("/work"), "proj-1", "title", None, Vec::new())
        .unwrap_err();
    assert!(matches!(err, ExecutorError::Core(CoreError::AlreadyExists(_))));
    drop(harness.root);
}

#[tokio::test]
async fn send_message_unknown_provider_is_rejected_synchronously() {
    let harness = reference_harness();
    let id = make_session(&harness.executor, "s1");
    let err = harness
        .executor
        .send_message(&id, "hi", Some("nonexistent".to_string()))
        .await
        .unwrap_err();
    assert!(matches!(err, ExecutorError::Core(CoreError::ProviderNotFound(_))));
    drop(harness.root);
}

#[tokio::test]
async fn send_message_runs_to_completion_and_projects_history() {
    let harness = reference_harness();
    let id = make_session(&harness.executor, "s1");

    let session = harness.executor.send_message(&id, "hello", None).await.expect("send_message");
    assert_eq!(session.state, SessionState::Running);

    settle().await;

    let session = harness.executor.get_session(&id).expect("get_session");
    assert_eq!(session.state, SessionState::Idle);
    let kinds: Vec<MessageKind> = session.history.iter().map(|m| m.kind).collect();
    assert_eq!(
        kinds,
        vec![MessageKind::User, MessageKind::ToolUse, MessageKind::Output, MessageKind::ToolUse]
    );
    drop(harness.root);
}

#[tokio::test]
async fn send_message_while_running_is_rejected() {
    let harness = reference_harness();
    let id = make_session(&harness.executor, "s1");
    harness.executor.send_message(&id, "hello", None).await.expect("first send");

    let err = harness.executor.send_message(&id, "again", None).await.unwrap_err();
    assert!(matches!(err, ExecutorError::Core(CoreError::InvalidState(_))));
    settle().await;
    drop(harness.root);
}

#[tokio::test]
async fn send_message_adapter_failure_is_recorded_without_state_change() {
    let mut factories: HashMap<String, AdapterFactory> = HashMap::new();
    factories.insert(
        "broken".to_string(),
        Arc::new(|_id, _config| Err(AdapterError::Failed("cannot construct".to_string()))),
    );
    let harness = build_harness(factories);
    let session_id = SessionId::new("s1");
    harness
        .executor
        .create_session(session_id.clone(), "broken", PathBuf::from("/work"), "proj-1", "title", None, Vec::new())
        .expect("create_session");

    let session = harness.executor.send_message(&session_id, "hi", None).await.expect("send_message");
    assert_eq!(session.state, SessionState::Idle);
    assert!(session.history.iter().any(|m| m.kind == MessageKind::Error));
    drop(harness.root);
}

#[tokio::test]
async fn cancel_run_stops_and_returns_to_idle() {
    let harness = reference_harness();
    let id = make_session(&harness.executor, "s1");
    harness.executor.send_message(&id, "hello", None).await.expect("send_message");

    harness.executor.cancel_run(&id).await.expect("cancel_run");
    let session = harness.executor.get_session(&id).expect("get_session");
    assert_eq!(session.state, SessionState::Idle);
    drop(harness.root);
}

#[tokio::test]
async fn cancel_run_on_idle_session_is_rejected() {
    let harness = reference_harness();
    let id = make_session(&harness.executor, "s1");
    let err = harness.executor.cancel_run(&id).await.unwrap_err();
    assert!(matches!(err, ExecutorError::Core(CoreError::InvalidState(_))));
    drop(harness.root);
}

#[tokio::test]
async fn stop_session_on_idle_is_a_no_op() {
    let harness = reference_harness();
    let id = make_session(&harness.executor, "s1");
    harness.executor.stop_session(&id).await.expect("stop is a no-op");
    drop(harness.root);
}

/// A controllable adapter that suspends on command: the executor's pump
/// sees a `ToolCall{Pending}` event and must transition the session to
/// Suspended and mint a resume token.
struct SuspendingAdapter {
    tx: PLMutex<Option<mpsc::Sender<RawEvent>>>,
    session_id: SessionId,
}

impl SuspendingAdapter {
    fn new(session_id: SessionId) -> Self {
        Self { tx: PLMutex::new(None), session_id }
    }
}

#[async_trait]
impl SessionAdapter for SuspendingAdapter {
    async fn send_input(
        &self,
        _scope: CancellationToken,
        _config: &serde_json::Value,
        _content: &str,
    ) -> Result<mpsc::Receiver<RawEvent>, AdapterError> {
        let (tx, rx) = mpsc::channel(8);
        let _ = tx.try_send(RawEvent::new(
            self.session_id.clone(),
            0,
            EventPayload::ToolCall { id: "wait-1".to_string(), name: "approval".to_string(), status: ToolCallStatus::Pending },
        ));
        *self.tx.lock() = Some(tx);
        Ok(rx)
    }

    async fn stop(&self, _scope: CancellationToken) -> Result<(), AdapterError> {
        Ok(())
    }

    async fn kill(&self) -> Result<(), AdapterError> {
        Ok(())
    }

    async fn status(&self) -> AdapterStatus {
        AdapterStatus { alive: true, detail: "suspending adapter".to_string() }
    }

    fn as_suspendable(&self) -> Option<&dyn Suspendable> {
        Some(self)
    }
}

#[async_trait]
impl Suspendable for SuspendingAdapter {
    async fn suspend(&self, _scope: CancellationToken) -> Result<SuspensionPayload, AdapterError> {
        Ok(SuspensionPayload(b"saved".to_vec()))
    }

    async fn resume(&self, _scope: CancellationToken, _payload: SuspensionPayload) -> Result<(), AdapterError> {
        Ok(())
    }
}

fn suspending_harness() -> Harness {
    let mut factories: HashMap<String, AdapterFactory> = HashMap::new();
    factories.insert(
        "suspending".to_string(),
        Arc::new(|session_id, _config| Ok(Arc::new(SuspendingAdapter::new(session_id.clone())) as Arc<dyn SessionAdapter>)),
    );
    build_harness(factories)
}

#[tokio::test]
async fn tool_call_pending_suspends_the_run() {
    let harness = suspending_harness();
    let session_id = SessionId::new("s1");
    harness
        .executor
        .create_session(session_id.clone(), "suspending", PathBuf::from("/work"), "proj-1", "title", None, Vec::new())
        .expect("create_session");

    harness.executor.send_message(&session_id, "hi", None).await.expect("send_message");
    settle().await;

    let session = harness.executor.get_session(&session_id).expect("get_session");
    assert_eq!(session.state, SessionState::Suspended);
    assert!(session.suspension.is_some());
    drop(harness.root);
}

#[tokio::test]
async fn resume_session_returns_to_idle_with_resume_message() {
    let harness = suspending_harness();
    let session_id = SessionId::new("s1");
    harness
        .executor
        .create_session(session_id.clone(), "suspending", PathBuf::from("/work"), "proj-1", "title", None, Vec::new())
        .expect("create_session");
    harness.executor.send_message(&session_id, "hi", None).await.expect("send_message");
    settle().await;

    let session = harness.executor.resume_session(&session_id).await.expect("resume_session");
    assert_eq!(session.state, SessionState::Idle);
    assert!(session.history.last().expect("history").contents.contains("resume"));
    drop(harness.root);
}

#[tokio::test]
async fn resume_session_on_non_suspended_session_is_rejected() {
    let harness = reference_harness();
    let id = make_session(&harness.executor, "s1");
    let err = harness.executor.resume_session(&id).await.unwrap_err();
    assert!(matches!(err, ExecutorError::Core(CoreError::InvalidState(_))));
    drop(harness.root);
}

#[tokio::test]
async fn recover_finalizes_open_attempts_and_is_idempotent() {
    let harness = reference_harness();
    let id = make_session(&harness.executor, "s1");
    harness.executor.send_message(&id, "hi", None).await.expect("send_message");

    // Simulate a crash mid-run: a fresh executor reads back what was
    // persisted, with the attempt still open.
    let root = harness.root.path().to_path_buf();
    drop(harness.executor);

    let store = conductor_storage::open(&root);
    let mut factories: HashMap<String, AdapterFactory> = HashMap::new();
    factories.insert("reference".to_string(), reference_factory());
    let deps = ExecutorDeps {
        session_store: store.clone(),
        message_log: store.clone(),
        run_attempt_store: store.clone(),
        resume_token_store: store.clone(),
        terminal_store: store,
        clock: Arc::new(FakeClock::new(2_000)),
        id_gen: sequential_ids("recover"),
        adapter_factories: factories,
    };
    let executor = Executor::new(deps, test_config());
    executor.recover().expect("recover");

    let session = executor.get_session(&id).expect("get_session");
    assert_eq!(session.state, SessionState::Idle);
    assert!(session.history.iter().any(|m| m.contents.contains("[recovery]")));

    // Second recovery pass finds nothing left open and adds no new message.
    let before = executor.get_session(&id).expect("get_session").history.len();
    executor.recover().expect("recover again");
    let after = executor.get_session(&id).expect("get_session").history.len();
    assert_eq!(before, after);
}

#[tokio::test]
async fn subscribe_events_receives_broadcast_events() {
    let harness = reference_harness();
    let id = make_session(&harness.executor, "s1");
    let (mut rx, replay) = harness.executor.subscribe_events("sub-1", Some(id.clone()), None);
    assert!(replay.is_empty());

    harness.executor.send_message(&id, "hi", None).await.expect("send_message");
    settle().await;

    let mut saw_status_change = false;
    while let Ok(event) = rx.try_recv() {
        if matches!(event.payload, EventPayload::StatusChange { .. }) {
            saw_status_change = true;
        }
    }
    assert!(saw_status_change);
    drop(harness.root);
}

#[tokio::test]
async fn delete_project_sessions_removes_every_matching_session() {
    let harness = reference_harness();
    let _ = make_session(&harness.executor, "s1");
    let _ = make_session(&harness.executor, "s2");
    harness.executor.delete_project_sessions("proj-1").expect("delete_project_sessions");
    assert!(harness.executor.list_sessions().is_empty());
    drop(harness.root);
}
