// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session context (C5): the executor's per-session handle, holding the
//! domain record plus at most one currently executing Run.

use conductor_adapters::SessionAdapter;
use conductor_core::{RunAttemptId, Session};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::terminal_hub::TerminalHub;

/// The in-memory handle to a session's currently executing activity, if
/// any (§3 "Run"). One-to-one with a persisted `RunAttempt`.
pub struct Run {
    pub adapter: Arc<dyn SessionAdapter>,
    pub scope: CancellationToken,
    pub attempt_id: RunAttemptId,
    pub started_at_ms: u64,
}

/// Owns the domain `Session` record and, while one exists, its single open
/// `Run`. Protected by one fine-grained lock per §5's shared-resource
/// policy ("each session context has its own fine-grained lock for its
/// attempt-metadata pointer") — the lock here additionally guards the
/// session record itself since both are always mutated together.
pub struct SessionContext {
    state: Mutex<State>,
}

struct State {
    session: Session,
    run: Option<Run>,
    terminal_hub: Option<Arc<TerminalHub>>,
    /// The adapter handle kept resident across a suspension so a live
    /// same-process resume (§4.3) can call `resume` on it directly, without
    /// reconstructing a fresh adapter via the factory. Distinct from `run`:
    /// the owning attempt has already ended (interrupted) by the time this
    /// is set, so a live Run must not also be present (§8 invariant 2).
    suspended_adapter: Option<Arc<dyn SessionAdapter>>,
}

impl SessionContext {
    pub fn new(session: Session) -> Self {
        Self {
            state: Mutex::new(State { session, run: None, terminal_hub: None, suspended_adapter: None }),
        }
    }

    pub fn with_session<T>(&self, f: impl FnOnce(&Session) -> T) -> T {
        f(&self.state.lock().session)
    }

    pub fn with_session_mut<T>(&self, f: impl FnOnce(&mut Session) -> T) -> T {
        f(&mut self.state.lock().session)
    }

    pub fn session_snapshot(&self) -> Session {
        self.state.lock().session.clone()
    }

    /// True if a live Run exists — the "Running" half of the derived state
    /// query in §4.1.
    pub fn has_run(&self) -> bool {
        self.state.lock().run.is_some()
    }

    pub fn set_run(&self, run: Run) {
        self.state.lock().run = Some(run);
    }

    pub fn take_run(&self) -> Option<Run> {
        self.state.lock().run.take()
    }

    pub fn run_scope(&self) -> Option<CancellationToken> {
        self.state.lock().run.as_ref().map(|run| run.scope.clone())
    }

    pub fn run_adapter(&self) -> Option<Arc<dyn SessionAdapter>> {
        self.state.lock().run.as_ref().map(|run| Arc::clone(&run.adapter))
    }

    pub fn current_attempt_id(&self) -> Option<RunAttemptId> {
        self.state.lock().run.as_ref().map(|run| run.attempt_id.clone())
    }

    pub fn set_terminal_hub(&self, hub: Arc<TerminalHub>) {
        self.state.lock().terminal_hub = Some(hub);
    }

    pub fn terminal_hub(&self) -> Option<Arc<TerminalHub>> {
        self.state.lock().terminal_hub.clone()
    }

    pub fn take_terminal_hub(&self) -> Option<Arc<TerminalHub>> {
        self.state.lock().terminal_hub.take()
    }

    pub fn set_suspended_adapter(&self, adapter: Arc<dyn SessionAdapter>) {
        self.state.lock().suspended_adapter = Some(adapter);
    }

    pub fn take_suspended_adapter(&self) -> Option<Arc<dyn SessionAdapter>> {
        self.state.lock().suspended_adapter.take()
    }
}

#[cfg(test)]
#[path = "session_context_tests.rs"]
mod tests;
