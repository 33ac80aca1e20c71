// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tracing wrapper for any `SessionAdapter`.

use crate::adapter::{AdapterError, AdapterStatus, SessionAdapter, Suspendable, TerminalProvider};
use async_trait::async_trait;
use conductor_core::RawEvent;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Wraps any [`SessionAdapter`] and adds `tracing` spans around every call.
/// Capability probes forward to the inner adapter unchanged; tracing does
/// not add overhead to a capability an adapter doesn't have.
#[derive(Clone)]
pub struct TracedAdapter<A> {
    inner: A,
}

impl<A> TracedAdapter<A> {
    pub fn new(inner: A) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<A: SessionAdapter> SessionAdapter for TracedAdapter<A> {
    async fn send_input(
        &self,
        scope: CancellationToken,
        config: &Value,
        content: &str,
    ) -> Result<mpsc::Receiver<RawEvent>, AdapterError> {
        async {
            tracing::info!(content_len = content.len(), "send_input");
            let start = std::time::Instant::now();
            let result = self.inner.send_input(scope, config, content).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;
            match &result {
                Ok(_) => tracing::info!(elapsed_ms, "send_input accepted"),
                Err(e) => tracing::error!(elapsed_ms, error = %e, "send_input failed"),
            }
            result
        }
        .instrument(tracing::info_span!("adapter.send_input"))
        .await
    }

    async fn stop(&self, scope: CancellationToken) -> Result<(), AdapterError> {
        let result = self.inner.stop(scope).await;
        tracing::info_span!("adapter.stop").in_scope(|| match &result {
            Ok(()) => tracing::info!("stopped"),
            Err(e) => tracing::warn!(error = %e, "stop failed"),
        });
        result
    }

    async fn kill(&self) -> Result<(), AdapterError> {
        let result = self.inner.kill().await;
        tracing::info_span!("adapter.kill").in_scope(|| match &result {
            Ok(()) => tracing::info!("killed"),
            Err(e) => tracing::warn!(error = %e, "kill failed (may be expected)"),
        });
        result
    }

    async fn status(&self) -> AdapterStatus {
        self.inner.status().await
    }

    fn as_suspendable(&self) -> Option<&dyn Suspendable> {
        self.inner.as_suspendable()
    }

    fn as_terminal_provider(&self) -> Option<&dyn TerminalProvider> {
        self.inner.as_terminal_provider()
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
