// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The executor (C6): owns every session context, enforces the session
//! state machine of §4.1-§4.3, and drives runs from `send_input` through
//! completion, suspension, or cancellation.

use conductor_adapters::{SessionAdapter, TerminalProvider};
use conductor_core::{
    Clock, CoreError, Event, EventId, EventPayload, Message, MessageKind, RawEvent, ResumeTokenId,
    RunAttempt, RunAttemptId, Session, SessionId, SessionState, TerminalKind, TerminalReason,
    TerminalRecord, TerminalSnapshot, TerminalStreamEvent,
};
use conductor_storage::{MessageLogAppender, ResumeTokenStore, RunAttemptStore, SessionStore, TerminalStore};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::broadcaster::{Broadcaster, SubscriberId};
use crate::config::ExecutorConfig;
use crate::error::ExecutorError;
use crate::resume_token_manager::ResumeTokenManager;
use crate::session_context::{Run, SessionContext};
use crate::terminal_hub::TerminalHub;
use crate::{AdapterFactory, IdFactory};

/// How often the terminal drain task checks whether its hub has been
/// closed while no update has arrived to wake it.
const TERMINAL_DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Everything the executor needs to construct itself, gathered into one
/// struct so callers assemble storage, clock, id generation, and adapter
/// registration in one place.
pub struct ExecutorDeps {
    pub session_store: Arc<dyn SessionStore>,
    pub message_log: Arc<dyn MessageLogAppender>,
    pub run_attempt_store: Arc<dyn RunAttemptStore>,
    pub resume_token_store: Arc<dyn ResumeTokenStore>,
    pub terminal_store: Arc<dyn TerminalStore>,
    pub clock: Arc<dyn Clock>,
    pub id_gen: IdFactory,
    /// One entry per provider kind this executor can dispatch to.
    pub adapter_factories: HashMap<String, AdapterFactory>,
}

/// One session's entry in an [`Executor::status`] snapshot.
#[derive(Debug, Clone)]
pub struct ExecutorHandle {
    pub session_id: SessionId,
    pub state: SessionState,
    pub attempt_id: Option<RunAttemptId>,
}

/// Owns every live session context and drives the run lifecycle.
pub struct Executor {
    sessions: RwLock<HashMap<SessionId, Arc<SessionContext>>>,
    broadcaster: Arc<Broadcaster>,
    resume_tokens: ResumeTokenManager,
    session_store: Arc<dyn SessionStore>,
    message_log: Arc<dyn MessageLogAppender>,
    run_attempt_store: Arc<dyn RunAttemptStore>,
    terminal_store: Arc<dyn TerminalStore>,
    adapter_factories: HashMap<String, AdapterFactory>,
    clock: Arc<dyn Clock>,
    id_gen: IdFactory,
    config: ExecutorConfig,
    root_scope: CancellationToken,
}

impl Executor {
    pub fn new(deps: ExecutorDeps, config: ExecutorConfig) -> Arc<Self> {
        let resume_tokens = ResumeTokenManager::new(
            deps.resume_token_store,
            Arc::clone(&deps.clock),
            Arc::clone(&deps.id_gen),
            config.resume_token_ttl.as_millis() as u64,
        );
        Arc::new(Self {
            sessions: RwLock::new(HashMap::new()),
            broadcaster: Arc::new(Broadcaster::new(config.subscriber_buffer)),
            resume_tokens,
            session_store: deps.session_store,
            message_log: deps.message_log,
            run_attempt_store: deps.run_attempt_store,
            terminal_store: deps.terminal_store,
            adapter_factories: deps.adapter_factories,
            clock: deps.clock,
            id_gen: deps.id_gen,
            config,
            root_scope: CancellationToken::new(),
        })
    }

    fn get_context(&self, id: &SessionId) -> Result<Arc<SessionContext>, ExecutorError> {
        self.sessions
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| CoreError::NotFound(id.to_string()).into())
    }

    fn now(&self) -> u64 {
        self.clock.now_ms()
    }

    // ---- session lifecycle (§6) ----------------------------------------

    #[allow(clippy::too_many_arguments)]
    pub fn create_session(
        &self,
        id: SessionId,
        provider_kind: impl Into<String>,
        working_dir: PathBuf,
        project_id: impl Into<String>,
        title: impl Into<String>,
        terminal_kind: Option<TerminalKind>,
        resume_messages: Vec<Message>,
    ) -> Result<Session, ExecutorError> {
        let now = self.now();
        let mut session = Session::new(id.clone(), provider_kind, working_dir, project_id, title, now);
        session.history = resume_messages;

        {
            let mut sessions = self.sessions.write();
            if sessions.contains_key(&id) {
                return Err(CoreError::AlreadyExists(id.to_string()).into());
            }
            sessions.insert(id.clone(), Arc::new(SessionContext::new(session.clone())));
        }

        self.session_store.save(&session)?;
        if let Some(kind) = terminal_kind {
            self.terminal_store.save(&TerminalRecord::new(id, kind, now))?;
        }
        Ok(session)
    }

    pub fn get_session(&self, id: &SessionId) -> Result<Session, ExecutorError> {
        Ok(self.get_context(id)?.session_snapshot())
    }

    pub fn list_sessions(&self) -> Vec<Session> {
        self.sessions.read().values().map(|ctx| ctx.session_snapshot()).collect()
    }

    /// Read-only snapshot of every in-memory session context: id, state,
    /// and open attempt id if one exists. For an embedding RPC layer's
    /// observability surface; never used to drive control-flow decisions.
    pub fn status(&self) -> Vec<ExecutorHandle> {
        self.sessions
            .read()
            .values()
            .map(|ctx| {
                let session = ctx.session_snapshot();
                ExecutorHandle { session_id: session.id, state: session.state, attempt_id: ctx.current_attempt_id() }
            })
            .collect()
    }

    /// Removes every in-memory and persisted session belonging to a project.
    /// Best-effort: a failure deleting one session does not stop the rest;
    /// every failure is collected and returned together.
    pub fn delete_project_sessions(&self, project_id: &str) -> Result<(), Vec<ExecutorError>> {
        let ids: Vec<SessionId> = self
            .sessions
            .read()
            .values()
            .filter(|ctx| ctx.with_session(|s| s.project_id == project_id))
            .map(|ctx| ctx.with_session(|s| s.id.clone()))
            .collect();

        let errors: Vec<ExecutorError> = ids
            .into_iter()
            .filter_map(|id| {
                self.sessions.write().remove(&id);
                self.session_store.delete(&id).err().map(ExecutorError::from)
            })
            .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    // ---- send-message / run start (§4.1) --------------------------------

    pub async fn send_message(
        self: &Arc<Self>,
        id: &SessionId,
        content: &str,
        provider_override: Option<String>,
    ) -> Result<Session, ExecutorError> {
        let ctx = self.get_context(id)?;
        if ctx.has_run() {
            return Err(CoreError::InvalidState("a run is already active".to_string()).into());
        }

        let snapshot = ctx.session_snapshot();
        if snapshot.state == SessionState::Suspended {
            return Err(CoreError::InvalidState("session is suspended; resume before sending".to_string()).into());
        }

        let provider_kind = provider_override
            .clone()
            .or_else(|| snapshot.preferred_provider_id.clone())
            .unwrap_or_else(|| snapshot.provider_kind.clone());

        if provider_override.is_some() && provider_override != snapshot.preferred_provider_id {
            ctx.with_session_mut(|s| s.preferred_provider_id = provider_override.clone());
        }

        // A resident adapter left over from a live resume is reused as-is;
        // otherwise a fresh instance is built from the registered factory.
        let adapter = match ctx.take_suspended_adapter() {
            Some(adapter) => adapter,
            None => {
                let factory = self
                    .adapter_factories
                    .get(&provider_kind)
                    .cloned()
                    .ok_or_else(|| CoreError::ProviderNotFound(provider_kind.clone()))?;
                match factory(id, &snapshot.provider_config) {
                    Ok(adapter) => adapter,
                    Err(e) => {
                        // Step 3's documented failure path: remain Idle, record
                        // the error, no state change.
                        let now = self.now();
                        self.record_error(&ctx, id, &e.to_string(), now);
                        return Ok(ctx.session_snapshot());
                    }
                }
            }
        };

        let now = self.now();
        let attempt_id = RunAttemptId::new((self.id_gen)());
        let scope = self.root_scope.child_token();
        let attempt = RunAttempt::new(
            attempt_id.clone(),
            id.clone(),
            provider_kind,
            provider_override,
            self.config.boot_id.clone(),
            now,
        );
        self.run_attempt_store.save(&attempt)?;
        ctx.set_run(Run {
            adapter: Arc::clone(&adapter),
            scope: scope.clone(),
            attempt_id: attempt_id.clone(),
            started_at_ms: now,
        });

        let seq = ctx.with_session(|s| s.next_message_seq());
        let user_message = Message::new(seq, MessageKind::User, content, now);
        ctx.with_session_mut(|s| s.push_message(user_message.clone(), now));
        if let Err(e) = self.message_log.append(id, &user_message) {
            warn!(session_id = %id, error = %e, "failed to append user message to log");
        }
        self.session_store.save(&ctx.session_snapshot())?;

        let provider_config = ctx.with_session(|s| s.provider_config.clone());
        let send_result =
            tokio::time::timeout(self.config.op_timeout, adapter.send_input(scope.clone(), &provider_config, content)).await;

        let rx = match send_result {
            Ok(Ok(rx)) => rx,
            Ok(Err(e)) => {
                self.finalize_failed(&ctx, &attempt_id, &e.to_string());
                return Err(e.into());
            }
            Err(_) => {
                self.finalize_failed(&ctx, &attempt_id, "send-input timed out");
                return Err(CoreError::Timeout.into());
            }
        };

        let old_state = snapshot.state;
        ctx.with_session_mut(|s| s.set_state(SessionState::Running, now));
        self.session_store.save(&ctx.session_snapshot())?;
        self.broadcaster.broadcast(RawEvent::new(
            id.clone(),
            now,
            EventPayload::StatusChange { old: state_label(old_state).to_string(), new: "running".to_string() },
        ));

        if adapter.as_terminal_provider().is_some() {
            if let Some(stale) = ctx.take_terminal_hub() {
                stale.close();
            }
            let hub = Arc::new(TerminalHub::new());
            ctx.set_terminal_hub(Arc::clone(&hub));
            Self::spawn_terminal_drain(Arc::clone(&adapter), hub, self.config.terminal_update_buffer);
        }

        self.spawn_run_worker(Arc::clone(&ctx), rx, scope, attempt_id);
        Ok(ctx.session_snapshot())
    }

    /// Pumps an adapter's upstream terminal update channel into the hub's
    /// fan-out, so real `Snapshot`/`Diff`/`Error` updates reach subscribers
    /// rather than only the synthetic initial snapshot `TerminalHub::subscribe`
    /// produces. Runs for the hub's lifetime rather than the owning run's,
    /// since a resident adapter may keep streaming terminal output across a
    /// suspension; it exits once `close_terminal_hub` closes the hub, or
    /// when the adapter's own channel ends.
    fn spawn_terminal_drain(adapter: Arc<dyn SessionAdapter>, hub: Arc<TerminalHub>, buffer: usize) {
        tokio::spawn(async move {
            let Some(provider) = adapter.as_terminal_provider() else { return };
            let (mut rx, unsubscribe) = match provider.subscribe_terminal_updates(buffer).await {
                Ok(pair) => pair,
                Err(e) => {
                    warn!(error = %e, "failed to subscribe to adapter terminal updates");
                    return;
                }
            };

            let mut poll = tokio::time::interval(TERMINAL_DRAIN_POLL_INTERVAL);
            poll.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                if hub.is_closed() {
                    break;
                }
                tokio::select! {
                    _ = poll.tick() => {}
                    maybe_update = rx.recv() => {
                        match maybe_update {
                            Some(update) => hub.broadcast(update),
                            None => break,
                        }
                    }
                }
            }
            unsubscribe.unsubscribe();
        });
    }

    fn spawn_run_worker(
        self: &Arc<Self>,
        ctx: Arc<SessionContext>,
        rx: mpsc::Receiver<RawEvent>,
        scope: CancellationToken,
        attempt_id: RunAttemptId,
    ) {
        let executor = Arc::clone(self);
        let pump_ctx = Arc::clone(&ctx);
        let pump_attempt = attempt_id.clone();
        let handle = tokio::spawn(async move { executor.run_pump(pump_ctx, rx, scope, pump_attempt).await });

        let supervisor = Arc::clone(self);
        tokio::spawn(async move {
            match handle.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => supervisor.finalize_failed(&ctx, &attempt_id, &e.to_string()),
                Err(join_err) => {
                    let message = if join_err.is_panic() { "panic during event pump" } else { "event pump cancelled" };
                    supervisor.finalize_failed(&ctx, &attempt_id, message);
                }
            }
        });
    }

    async fn run_pump(
        self: Arc<Self>,
        ctx: Arc<SessionContext>,
        mut rx: mpsc::Receiver<RawEvent>,
        scope: CancellationToken,
        attempt_id: RunAttemptId,
    ) -> Result<(), ExecutorError> {
        let mut ticker = tokio::time::interval(self.config.checkpoint_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = scope.cancelled() => return Ok(()),
                _ = ticker.tick() => {
                    self.checkpoint(&ctx, &attempt_id);
                }
                maybe_event = rx.recv() => {
                    match maybe_event {
                        Some(raw) => {
                            if let Some(wait_ref) = self.project_event(&ctx, &attempt_id, raw) {
                                self.suspend_run(&ctx, &attempt_id, &scope, wait_ref).await?;
                                return Ok(());
                            }
                        }
                        None => {
                            self.finalize_completed(&ctx, &attempt_id);
                            return Ok(());
                        }
                    }
                }
            }
        }
    }

    /// Projects one adapter event into the session's message history (§4.5)
    /// and fans it out via the broadcaster. Returns the tool-call id to wait
    /// on if this event should suspend the run.
    fn project_event(&self, ctx: &Arc<SessionContext>, attempt_id: &RunAttemptId, raw: RawEvent) -> Option<String> {
        let session_id = raw.session_id.clone();
        let event = self.broadcaster.broadcast(raw);
        let now = self.now();
        let mut wait_ref = None;
        let mut task_update = None;

        let log_message = match &event.payload {
            EventPayload::Output { content, delta } if *delta => {
                let seq = ctx.with_session_mut(|s| match s.tail_output_mut() {
                    Some(tail) => {
                        tail.append_delta(content);
                        tail.seq
                    }
                    None => {
                        let seq = s.next_message_seq();
                        s.push_message(Message::new(seq, MessageKind::Output, content.clone(), event.timestamp_ms), now);
                        seq
                    }
                });
                Message::new(seq, MessageKind::Output, content.clone(), event.timestamp_ms)
            }
            EventPayload::Output { content, .. } => {
                push_new(ctx, now, MessageKind::Output, content.clone(), event.timestamp_ms, event.raw.clone())
            }
            EventPayload::Thought { content } => {
                push_new(ctx, now, MessageKind::Thought, content.clone(), event.timestamp_ms, None)
            }
            EventPayload::Error { message } => push_new(ctx, now, MessageKind::Error, message.clone(), event.timestamp_ms, None),
            EventPayload::ToolCall { id, name, status } => {
                if status.triggers_suspend() {
                    wait_ref = Some(id.clone());
                }
                push_new(ctx, now, MessageKind::ToolUse, format!("{name}: {id} ({status:?})"), event.timestamp_ms, None)
            }
            EventPayload::Metadata { key, value } => {
                if key == "current_task" {
                    task_update = Some(value.clone());
                }
                push_new(ctx, now, MessageKind::System, format!("{key}={value}"), event.timestamp_ms, None)
            }
            EventPayload::Metric { input_tokens, output_tokens, requests } => push_new(
                ctx,
                now,
                MessageKind::Metric,
                format!("in={input_tokens} out={output_tokens} requests={requests}"),
                event.timestamp_ms,
                None,
            ),
            EventPayload::StatusChange { old, new } => {
                push_new(ctx, now, MessageKind::System, format!("status: {old} -> {new}"), event.timestamp_ms, None)
            }
            EventPayload::Plan { steps } => {
                let contents = steps.iter().map(|s| format!("{}: {}", s.id, s.description)).collect::<Vec<_>>().join("\n");
                push_new(ctx, now, MessageKind::Plan, contents, event.timestamp_ms, None)
            }
        };

        if let Some(task) = task_update {
            ctx.with_session_mut(|s| s.current_task = Some(task));
        }
        if let Err(e) = self.message_log.append(&session_id, &log_message) {
            warn!(session_id = %session_id, error = %e, "failed to append message projection");
        }
        if let Err(e) = self.session_store.save(&ctx.session_snapshot()) {
            warn!(session_id = %session_id, error = %e, "failed to persist session snapshot");
        }
        self.heartbeat(attempt_id);
        wait_ref
    }

    fn heartbeat(&self, attempt_id: &RunAttemptId) {
        let now = self.now();
        match self.run_attempt_store.load(attempt_id) {
            Ok(Some(mut attempt)) => {
                attempt.heartbeat(now);
                if let Err(e) = self.run_attempt_store.save(&attempt) {
                    warn!(attempt_id = %attempt_id, error = %e, "failed to persist heartbeat");
                }
            }
            Ok(None) => {}
            Err(e) => warn!(attempt_id = %attempt_id, error = %e, "failed to load attempt for heartbeat"),
        }
    }

    fn checkpoint(&self, ctx: &Arc<SessionContext>, attempt_id: &RunAttemptId) {
        let session_id = ctx.with_session(|s| s.id.clone());
        if let Err(e) = self.session_store.save(&ctx.session_snapshot()) {
            warn!(session_id = %session_id, error = %e, "checkpoint save failed");
        }
        self.heartbeat(attempt_id);
    }

    fn record_error(&self, ctx: &SessionContext, session_id: &SessionId, message: &str, now: u64) {
        let seq = ctx.with_session(|s| s.next_message_seq());
        let entry = Message::new(seq, MessageKind::Error, message, now);
        ctx.with_session_mut(|s| s.push_message(entry.clone(), now));
        if let Err(e) = self.message_log.append(session_id, &entry) {
            warn!(session_id = %session_id, error = %e, "failed to append error message");
        }
        self.broadcaster
            .broadcast(RawEvent::new(session_id.clone(), now, EventPayload::Error { message: message.to_string() }));
        if let Err(e) = self.session_store.save(&ctx.session_snapshot()) {
            warn!(session_id = %session_id, error = %e, "failed to persist session after error");
        }
    }

    fn finalize_completed(&self, ctx: &Arc<SessionContext>, attempt_id: &RunAttemptId) {
        let now = self.now();
        match self.run_attempt_store.load(attempt_id) {
            Ok(Some(mut attempt)) => {
                attempt.finalize(TerminalReason::Completed, None, now);
                if let Err(e) = self.run_attempt_store.save(&attempt) {
                    warn!(attempt_id = %attempt_id, error = %e, "failed to persist completed attempt");
                }
            }
            Ok(None) => {}
            Err(e) => warn!(attempt_id = %attempt_id, error = %e, "failed to load attempt to finalize"),
        }
        ctx.take_run();
        let session_id = ctx.with_session(|s| s.id.clone());
        ctx.with_session_mut(|s| s.set_state(SessionState::Idle, now));
        self.broadcaster.broadcast(RawEvent::new(
            session_id.clone(),
            now,
            EventPayload::StatusChange { old: "running".to_string(), new: "idle".to_string() },
        ));
        if let Err(e) = self.session_store.save(&ctx.session_snapshot()) {
            warn!(session_id = %session_id, error = %e, "failed to persist session after completion");
        }
    }

    fn finalize_failed(&self, ctx: &Arc<SessionContext>, attempt_id: &RunAttemptId, message: &str) {
        let now = self.now();
        let session_id = ctx.with_session(|s| s.id.clone());
        self.record_error(ctx, &session_id, message, now);
        match self.run_attempt_store.load(attempt_id) {
            Ok(Some(mut attempt)) => {
                attempt.finalize(TerminalReason::Failed, Some(message.to_string()), now);
                if let Err(e) = self.run_attempt_store.save(&attempt) {
                    warn!(attempt_id = %attempt_id, error = %e, "failed to persist failed attempt");
                }
            }
            Ok(None) => {}
            Err(e) => warn!(attempt_id = %attempt_id, error = %e, "failed to load attempt to finalize"),
        }
        ctx.take_run();
        ctx.with_session_mut(|s| s.set_state(SessionState::Idle, now));
        if let Err(e) = self.session_store.save(&ctx.session_snapshot()) {
            warn!(session_id = %session_id, error = %e, "failed to persist session after failure");
        }
    }

    // ---- suspension / resumption (§4.3) ----------------------------------

    async fn suspend_run(
        &self,
        ctx: &Arc<SessionContext>,
        attempt_id: &RunAttemptId,
        scope: &CancellationToken,
        wait_ref: String,
    ) -> Result<(), ExecutorError> {
        let now = self.now();
        let session_id = ctx.with_session(|s| s.id.clone());
        let run_adapter = ctx.run_adapter();

        let mut suspension_payload = None;
        if let Some(adapter) = &run_adapter {
            if let Some(suspendable) = adapter.as_suspendable() {
                match tokio::time::timeout(self.config.op_timeout, suspendable.suspend(scope.clone())).await {
                    Ok(Ok(payload)) => suspension_payload = Some(payload),
                    Ok(Err(e)) => warn!(session_id = %session_id, error = %e, "suspend call failed"),
                    Err(_) => warn!(session_id = %session_id, "suspend call timed out"),
                }
            }
        }

        let token = self.resume_tokens.mint(session_id.clone(), attempt_id.clone())?;

        if let Ok(Some(mut attempt)) = self.run_attempt_store.load(attempt_id) {
            attempt.mark_waiting("tool_call", wait_ref.clone(), token.id.clone());
            attempt.finalize(
                TerminalReason::Interrupted,
                Some(format!("interrupted while waiting for tool_call: {wait_ref}")),
                now,
            );
            self.run_attempt_store.save(&attempt)?;
        }

        ctx.with_session_mut(|s| {
            s.suspension = suspension_payload;
            s.set_state(SessionState::Suspended, now);
        });

        scope.cancel();
        ctx.take_run();
        if let Some(adapter) = run_adapter {
            ctx.set_suspended_adapter(adapter);
        }
        self.session_store.save(&ctx.session_snapshot())?;
        Ok(())
    }

    pub async fn cancel_run(&self, id: &SessionId) -> Result<(), ExecutorError> {
        self.stop_like(id, true, false).await
    }

    pub async fn stop_session(&self, id: &SessionId) -> Result<(), ExecutorError> {
        self.stop_like(id, false, false).await
    }

    pub async fn kill_session(&self, id: &SessionId) -> Result<(), ExecutorError> {
        self.stop_like(id, false, true).await
    }

    /// Shared convergence point for cancel/stop/kill (§4.2): all three close
    /// the live Run or resident suspended adapter if one exists, then
    /// transition the session to Idle. Stop and kill are no-ops on an
    /// already-Idle session; cancel on Idle is rejected as invalid state.
    async fn stop_like(&self, id: &SessionId, reject_idle: bool, force: bool) -> Result<(), ExecutorError> {
        let ctx = self.get_context(id)?;
        let state = ctx.session_snapshot().state;

        if let Some(run) = ctx.take_run() {
            return self.teardown_run(&ctx, id, run, force).await;
        }

        if let Some(adapter) = ctx.take_suspended_adapter() {
            if force {
                let _ = adapter.kill().await;
            } else {
                let _ = tokio::time::timeout(self.config.op_timeout, adapter.stop(CancellationToken::new())).await;
            }
            return self.close_suspended(&ctx, id);
        }

        if state == SessionState::Idle {
            return if reject_idle {
                Err(CoreError::InvalidState("no active run to cancel".to_string()).into())
            } else {
                Ok(())
            };
        }

        // Suspended with no resident adapter, e.g. after a process restart.
        self.close_suspended(&ctx, id)
    }

    async fn teardown_run(&self, ctx: &Arc<SessionContext>, session_id: &SessionId, run: Run, force: bool) -> Result<(), ExecutorError> {
        run.scope.cancel();
        if force {
            let _ = run.adapter.kill().await;
        } else {
            let _ = tokio::time::timeout(self.config.op_timeout, run.adapter.stop(run.scope.clone())).await;
        }

        self.close_terminal_hub(ctx, session_id)?;

        let now = self.now();
        if let Ok(Some(mut attempt)) = self.run_attempt_store.load(&run.attempt_id) {
            attempt.finalize(TerminalReason::Cancelled, None, now);
            self.run_attempt_store.save(&attempt)?;
        }

        let seq = ctx.with_session(|s| s.next_message_seq());
        let message = Message::new(seq, MessageKind::System, "run cancelled", now);
        ctx.with_session_mut(|s| {
            s.push_message(message.clone(), now);
            s.set_state(SessionState::Idle, now);
        });
        if let Err(e) = self.message_log.append(session_id, &message) {
            warn!(session_id = %session_id, error = %e, "failed to append cancellation message");
        }
        self.session_store.save(&ctx.session_snapshot())?;
        Ok(())
    }

    fn close_suspended(&self, ctx: &Arc<SessionContext>, session_id: &SessionId) -> Result<(), ExecutorError> {
        self.close_terminal_hub(ctx, session_id)?;
        let now = self.now();
        let seq = ctx.with_session(|s| s.next_message_seq());
        let message = Message::new(seq, MessageKind::System, "run cancelled", now);
        ctx.with_session_mut(|s| {
            s.suspension = None;
            s.push_message(message.clone(), now);
            s.set_state(SessionState::Idle, now);
        });
        if let Err(e) = self.message_log.append(session_id, &message) {
            warn!(session_id = %session_id, error = %e, "failed to append cancellation message");
        }
        self.session_store.save(&ctx.session_snapshot())?;
        Ok(())
    }

    fn close_terminal_hub(&self, ctx: &Arc<SessionContext>, session_id: &SessionId) -> Result<(), ExecutorError> {
        let Some(hub) = ctx.take_terminal_hub() else { return Ok(()) };
        if let Some(snapshot) = hub.close() {
            let kind = self.terminal_store.load(session_id)?.map(|r| r.kind).unwrap_or(TerminalKind::Pty);
            self.terminal_store
                .save(&TerminalRecord { session_id: session_id.clone(), kind, last_snapshot: Some(snapshot), last_seq: 0, last_updated_at_ms: self.now() })?;
        }
        Ok(())
    }

    pub async fn resume_session(&self, id: &SessionId) -> Result<Session, ExecutorError> {
        let ctx = self.get_context(id)?;
        if ctx.session_snapshot().state != SessionState::Suspended {
            return Err(CoreError::InvalidState("session is not suspended".to_string()).into());
        }
        self.resume_inner(id, &ctx).await
    }

    pub async fn resume_session_with_token(&self, id: &SessionId, token_id: &ResumeTokenId) -> Result<Session, ExecutorError> {
        let ctx = self.get_context(id)?;
        let token = self.resume_tokens.load(token_id)?;
        if &token.session_id != id {
            return Err(CoreError::TokenInvalid.into());
        }
        let attempt = self.run_attempt_store.load(&token.attempt_id)?.ok_or(CoreError::TokenInvalid)?;
        if attempt.resume_token_id.as_ref() != Some(&token.id) {
            return Err(CoreError::TokenInvalid.into());
        }
        self.resume_tokens.consume(token_id)?;

        let mut attempt = attempt;
        attempt.clear_wait();
        self.run_attempt_store.save(&attempt)?;

        self.resume_inner(id, &ctx).await
    }

    /// Resumes a suspended session. If a resident adapter from a live
    /// same-process suspension is still present, `resume` is called on it
    /// so the backend can flush the accepted tool result internally; either
    /// way the session lands back in Idle with a `[resume]` system message,
    /// ready to accept a fresh `send_message` (which will pick the resident
    /// adapter back up rather than rebuilding one via the factory).
    async fn resume_inner(&self, id: &SessionId, ctx: &Arc<SessionContext>) -> Result<Session, ExecutorError> {
        let now = self.now();
        let adapter = ctx.take_suspended_adapter();

        if let Some(adapter) = &adapter {
            if let Some(suspendable) = adapter.as_suspendable() {
                let payload = ctx.with_session(|s| s.suspension.clone()).unwrap_or_default();
                let scope = self.root_scope.child_token();
                match tokio::time::timeout(self.config.op_timeout, suspendable.resume(scope, payload)).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => warn!(session_id = %id, error = %e, "resume call failed"),
                    Err(_) => warn!(session_id = %id, "resume call timed out"),
                }
            }
        }

        let seq = ctx.with_session(|s| s.next_message_seq());
        let message = Message::new(seq, MessageKind::System, "[resume] send a new message to continue", now);
        ctx.with_session_mut(|s| {
            s.suspension = None;
            s.push_message(message.clone(), now);
            s.set_state(SessionState::Idle, now);
        });
        if let Err(e) = self.message_log.append(id, &message) {
            warn!(session_id = %id, error = %e, "failed to append resume message");
        }
        if let Some(adapter) = adapter {
            ctx.set_suspended_adapter(adapter);
        }
        self.session_store.save(&ctx.session_snapshot())?;
        Ok(ctx.session_snapshot())
    }

    // ---- events / terminal (§6) ------------------------------------------

    pub fn subscribe_events(
        &self,
        subscriber_id: impl Into<SubscriberId>,
        session_filter: Option<SessionId>,
        last_event_id: Option<EventId>,
    ) -> (mpsc::Receiver<Event>, Vec<Event>) {
        self.broadcaster
            .subscribe_with_replay(subscriber_id, session_filter, self.config.subscriber_buffer, last_event_id)
    }

    pub async fn terminal_subscribe(
        &self,
        id: &SessionId,
        subscriber_id: impl Into<SubscriberId>,
    ) -> Result<mpsc::Receiver<TerminalStreamEvent>, ExecutorError> {
        let ctx = self.get_context(id)?;
        let adapter = ctx.run_adapter().ok_or(CoreError::TerminalNotSupported)?;
        let provider = adapter.as_terminal_provider().ok_or(CoreError::TerminalNotSupported)?;
        let hub = ctx.terminal_hub().ok_or(CoreError::TerminalNotSupported)?;
        Ok(hub.subscribe(subscriber_id, self.config.subscriber_buffer, provider).await?)
    }

    pub async fn terminal_input(&self, id: &SessionId, input: &[u8]) -> Result<(), ExecutorError> {
        let ctx = self.get_context(id)?;
        let adapter = ctx.run_adapter().ok_or(CoreError::TerminalNotSupported)?;
        let provider = adapter.as_terminal_provider().ok_or(CoreError::TerminalNotSupported)?;
        let scope = ctx.run_scope().unwrap_or_else(CancellationToken::new);
        provider.handle_terminal_input(scope, input).await?;
        Ok(())
    }

    pub async fn terminal_snapshot(&self, id: &SessionId) -> Result<TerminalSnapshot, ExecutorError> {
        let ctx = self.get_context(id)?;
        if let Some(adapter) = ctx.run_adapter() {
            if let Some(provider) = adapter.as_terminal_provider() {
                return Ok(provider.terminal_snapshot().await?);
            }
        }
        if let Some(record) = self.terminal_store.load(id)? {
            if let Some(snapshot) = record.last_snapshot {
                return Ok(snapshot);
            }
        }
        Err(CoreError::TerminalNotSupported.into())
    }

    // ---- startup recovery (§4.1) -----------------------------------------

    /// Walks every persisted session, finalizing any run attempt that was
    /// left open by a prior boot as `Interrupted`, appending one
    /// `[recovery]`-tagged system message per attempt recovered. Idempotent:
    /// a second call finds no open attempts and writes nothing new.
    pub fn recover(&self) -> Result<(), ExecutorError> {
        for mut session in self.session_store.list()? {
            let attempts = self.run_attempt_store.list_for_session(&session.id)?;
            let now = self.now();
            let mut recovered_any = false;
            let mut recovered_wait = false;

            for mut attempt in attempts {
                if !attempt.is_open() {
                    continue;
                }
                recovered_any = true;
                let reason = match (&attempt.wait_kind, &attempt.wait_ref) {
                    (Some(kind), Some(wait_ref)) => {
                        recovered_wait = true;
                        format!("startup recovery: interrupted while waiting for {kind}: {wait_ref}")
                    }
                    _ => "startup recovery: interrupted while running".to_string(),
                };
                attempt.finalize(TerminalReason::Interrupted, Some(reason.clone()), now);
                self.run_attempt_store.save(&attempt)?;

                let seq = session.next_message_seq();
                let message = Message::new(seq, MessageKind::System, format!("[recovery] attempt {} {reason}", attempt.id), now);
                session.push_message(message.clone(), now);
                self.message_log.append(&session.id, &message)?;
            }

            if recovered_any {
                let new_state = if recovered_wait { SessionState::Suspended } else { SessionState::Idle };
                session.set_state(new_state, now);
            }

            self.session_store.save(&session)?;
            self.sessions.write().insert(session.id.clone(), Arc::new(SessionContext::new(session)));
        }
        Ok(())
    }

    /// Cancels every in-flight run so a clean process exit doesn't leave a
    /// `RunAttempt` open; startup recovery is the backstop for whatever this
    /// misses (a hard crash, a killed process).
    pub async fn shutdown(self: &Arc<Self>, deadline: Duration) {
        self.root_scope.cancel();
        let ids: Vec<SessionId> = self.sessions.read().keys().cloned().collect();

        let mut set = tokio::task::JoinSet::new();
        for id in ids.clone() {
            let executor = Arc::clone(self);
            set.spawn(async move { executor.stop_session(&id).await });
        }
        let _ = tokio::time::timeout(deadline, async { while set.join_next().await.is_some() {} }).await;

        for id in &ids {
            if let Ok(ctx) = self.get_context(id) {
                if ctx.has_run() {
                    let _ = self.kill_session(id).await;
                }
            }
        }
    }
}

fn state_label(state: SessionState) -> &'static str {
    match state {
        SessionState::Idle => "idle",
        SessionState::Running => "running",
        SessionState::Suspended => "suspended",
    }
}

fn push_new(
    ctx: &Arc<SessionContext>,
    now: u64,
    kind: MessageKind,
    contents: String,
    timestamp_ms: u64,
    raw: Option<Vec<u8>>,
) -> Message {
    let seq = ctx.with_session(|s| s.next_message_seq());
    let mut message = Message::new(seq, kind, contents, timestamp_ms);
    if let Some(raw) = raw {
        message = message.with_raw(raw);
    }
    ctx.with_session_mut(|s| s.push_message(message.clone(), now));
    message
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
