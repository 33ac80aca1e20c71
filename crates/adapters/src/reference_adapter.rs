// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A complete, deterministic implementation of [`SessionAdapter`] that needs
//! no external process. It demonstrates every required and optional
//! capability of §4.7 and doubles as the workspace's default test backend.
//!
//! Every call is recorded so tests can assert on adapter interaction order;
//! production embedders that only want the capability surface can ignore
//! `calls()` entirely.

use crate::adapter::{AdapterError, AdapterStatus, SessionAdapter, Suspendable, TerminalProvider, TerminalUnsubscribe};
use async_trait::async_trait;
use conductor_core::{
    EventPayload, RawEvent, SessionId, SuspensionPayload, TerminalSnapshot, TerminalUpdate, ToolCallStatus,
};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Recorded adapter call, for test assertions.
#[derive(Debug, Clone, PartialEq)]
pub enum AdapterCall {
    SendInput { content: String },
    Stop,
    Kill,
    Suspend,
    Resume,
    TerminalInput(Vec<u8>),
}

struct State {
    calls: Vec<AdapterCall>,
    alive: bool,
    send_input_error: Option<String>,
    suspend_payload: Option<SuspensionPayload>,
    terminal_lines: Vec<String>,
}

/// Reference [`SessionAdapter`] implementation: echoes input back as output
/// events, with a scripted tool call in between, and supports suspend/resume
/// and a minimal terminal (the echoed lines).
#[derive(Clone)]
pub struct ReferenceAdapter {
    session_id: SessionId,
    state: Arc<Mutex<State>>,
    killed: Arc<AtomicBool>,
}

impl ReferenceAdapter {
    pub fn new(session_id: SessionId) -> Self {
        Self {
            session_id,
            state: Arc::new(Mutex::new(State {
                calls: Vec::new(),
                alive: true,
                send_input_error: None,
                suspend_payload: None,
                terminal_lines: Vec::new(),
            })),
            killed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn calls(&self) -> Vec<AdapterCall> {
        self.state.lock().calls.clone()
    }

    /// Inject a failure the next `send_input` call returns synchronously.
    pub fn set_send_input_error(&self, message: impl Into<String>) {
        self.state.lock().send_input_error = Some(message.into());
    }
}

#[async_trait]
impl SessionAdapter for ReferenceAdapter {
    async fn send_input(
        &self,
        scope: CancellationToken,
        _config: &Value,
        content: &str,
    ) -> Result<mpsc::Receiver<RawEvent>, AdapterError> {
        {
            let mut state = self.state.lock();
            state.calls.push(AdapterCall::SendInput { content: content.to_string() });
            if let Some(message) = state.send_input_error.take() {
                return Err(AdapterError::Failed(message));
            }
            state.terminal_lines.push(content.to_string());
        }

        let (tx, rx) = mpsc::channel(32);
        let session_id = self.session_id.clone();
        let content = content.to_string();
        let killed = self.killed.clone();

        tokio::spawn(async move {
            let steps = [
                RawEvent::new(
                    session_id.clone(),
                    0,
                    EventPayload::ToolCall { id: "echo-1".into(), name: "echo".into(), status: ToolCallStatus::Running },
                ),
                RawEvent::new(
                    session_id.clone(),
                    0,
                    EventPayload::Output { content: format!("echo: {content}"), delta: false },
                ),
                RawEvent::new(
                    session_id,
                    0,
                    EventPayload::ToolCall { id: "echo-1".into(), name: "echo".into(), status: ToolCallStatus::Completed },
                ),
            ];
            for event in steps {
                if scope.is_cancelled() || killed.load(Ordering::SeqCst) {
                    return;
                }
                if tx.send(event).await.is_err() {
                    return;
                }
            }
        });

        Ok(rx)
    }

    async fn stop(&self, _scope: CancellationToken) -> Result<(), AdapterError> {
        self.state.lock().calls.push(AdapterCall::Stop);
        self.state.lock().alive = false;
        Ok(())
    }

    async fn kill(&self) -> Result<(), AdapterError> {
        self.state.lock().calls.push(AdapterCall::Kill);
        self.state.lock().alive = false;
        self.killed.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn status(&self) -> AdapterStatus {
        let state = self.state.lock();
        AdapterStatus {
            alive: state.alive,
            detail: format!("{} calls recorded", state.calls.len()),
        }
    }

    fn as_suspendable(&self) -> Option<&dyn Suspendable> {
        Some(self)
    }

    fn as_terminal_provider(&self) -> Option<&dyn TerminalProvider> {
        Some(self)
    }
}

#[async_trait]
impl Suspendable for ReferenceAdapter {
    async fn suspend(&self, _scope: CancellationToken) -> Result<SuspensionPayload, AdapterError> {
        let mut state = self.state.lock();
        state.calls.push(AdapterCall::Suspend);
        let payload = SuspensionPayload(serde_json::to_vec(&state.terminal_lines).unwrap_or_default());
        state.suspend_payload = Some(payload.clone());
        Ok(payload)
    }

    async fn resume(&self, _scope: CancellationToken, payload: SuspensionPayload) -> Result<(), AdapterError> {
        let mut state = self.state.lock();
        state.calls.push(AdapterCall::Resume);
        state.terminal_lines = serde_json::from_slice(&payload.0).unwrap_or_default();
        Ok(())
    }
}

#[async_trait]
impl TerminalProvider for ReferenceAdapter {
    async fn terminal_snapshot(&self) -> Result<TerminalSnapshot, AdapterError> {
        let state = self.state.lock();
        Ok(TerminalSnapshot { rows: 24, cols: 80, lines: state.terminal_lines.clone() })
    }

    async fn subscribe_terminal_updates(
        &self,
        buffer: usize,
    ) -> Result<(mpsc::Receiver<TerminalUpdate>, TerminalUnsubscribe), AdapterError> {
        let (_tx, rx) = mpsc::channel(buffer.max(1));
        Ok((rx, TerminalUnsubscribe::new(CancellationToken::new())))
    }

    async fn handle_terminal_input(&self, _scope: CancellationToken, input: &[u8]) -> Result<(), AdapterError> {
        self.state.lock().calls.push(AdapterCall::TerminalInput(input.to_vec()));
        Ok(())
    }
}

#[cfg(test)]
#[path = "reference_adapter_tests.rs"]
mod tests;
