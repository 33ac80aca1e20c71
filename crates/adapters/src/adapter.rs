// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The session adapter contract every backend implements (§4.7), plus its
//! two optional capabilities, detected by interface probe rather than by
//! downcasting a concrete type.

use async_trait::async_trait;
use conductor_core::{SuspensionPayload, TerminalSnapshot, TerminalUpdate};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Errors an adapter reports back to the executor. Adapters never panic out;
/// every failure, sync or async, surfaces through this type or an Error
/// event on the channel returned by `send_input`.
#[derive(Debug, Error, Clone)]
pub enum AdapterError {
    #[error("{0}")]
    Failed(String),
    #[error("capability not supported")]
    NotSupported,
}

/// Point-in-time snapshot of adapter-internal state, for observability only.
#[derive(Debug, Clone)]
pub struct AdapterStatus {
    pub alive: bool,
    pub detail: String,
}

/// Unsubscribe handle for a terminal update subscription. Dropping it also
/// cancels the subscription; `unsubscribe()` is provided for callers that
/// want to do so explicitly without waiting on drop.
pub struct TerminalUnsubscribe {
    cancel: CancellationToken,
}

impl TerminalUnsubscribe {
    pub fn new(cancel: CancellationToken) -> Self {
        Self { cancel }
    }

    pub fn unsubscribe(self) {
        self.cancel.cancel();
    }
}

impl Drop for TerminalUnsubscribe {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Required capability: suspend an in-flight turn to an opaque payload and
/// resume it later, possibly in a different process.
#[async_trait]
pub trait Suspendable: Send + Sync {
    async fn suspend(&self, scope: CancellationToken) -> Result<SuspensionPayload, AdapterError>;
    async fn resume(&self, scope: CancellationToken, payload: SuspensionPayload) -> Result<(), AdapterError>;
}

/// Optional capability: expose a PTY-like terminal alongside the event stream.
#[async_trait]
pub trait TerminalProvider: Send + Sync {
    async fn terminal_snapshot(&self) -> Result<TerminalSnapshot, AdapterError>;

    async fn subscribe_terminal_updates(
        &self,
        buffer: usize,
    ) -> Result<(mpsc::Receiver<TerminalUpdate>, TerminalUnsubscribe), AdapterError>;

    async fn handle_terminal_input(&self, scope: CancellationToken, input: &[u8]) -> Result<(), AdapterError>;
}

/// Uniform contract every backend implements (§4.7).
///
/// `send_input` both starts the backend on the first call and injects
/// further input into a still-running session on later calls. The returned
/// channel closes when the adapter believes the turn is done; a clean close
/// (no trailing Error event) means the turn completed normally.
#[async_trait]
pub trait SessionAdapter: Send + Sync + 'static {
    async fn send_input(
        &self,
        scope: CancellationToken,
        config: &Value,
        content: &str,
    ) -> Result<mpsc::Receiver<conductor_core::RawEvent>, AdapterError>;

    /// Graceful shutdown, bounded by the caller's scope.
    async fn stop(&self, scope: CancellationToken) -> Result<(), AdapterError>;

    /// Unconditional termination. Must be safe to call multiple times.
    async fn kill(&self) -> Result<(), AdapterError>;

    async fn status(&self) -> AdapterStatus;

    /// Interface probe for the Suspendable capability. `None` means the
    /// backend cannot suspend; the executor must then refuse suspend/resume
    /// for sessions on this provider.
    fn as_suspendable(&self) -> Option<&dyn Suspendable> {
        None
    }

    /// Interface probe for the TerminalProvider capability.
    fn as_terminal_provider(&self) -> Option<&dyn TerminalProvider> {
        None
    }
}
