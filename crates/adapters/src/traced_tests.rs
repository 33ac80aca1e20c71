// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::reference_adapter::ReferenceAdapter;
use conductor_core::SessionId;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::MakeWriter;

#[derive(Clone, Default)]
struct CapturedLogs {
    logs: Arc<Mutex<Vec<u8>>>,
}

impl CapturedLogs {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.logs.lock().unwrap()).to_string()
    }
}

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.logs.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn with_tracing<F, Fut>(f: F) -> (String, Fut::Output)
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future,
{
    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_writer(logs.clone())
        .with_ansi(false)
        .without_time()
        .finish();

    let result = tracing::subscriber::with_default(subscriber, || {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
            .block_on(f())
    });

    (logs.contents(), result)
}

fn assert_log(logs: &str, label: &str, expected: &str) {
    assert!(logs.contains(expected), "should log {label}. Logs:\n{logs}");
}

#[test]
fn send_input_logs_entry_and_completion() {
    let (logs, result) = with_tracing(|| async {
        let traced = TracedAdapter::new(ReferenceAdapter::new(SessionId::new("s1")));
        traced.send_input(CancellationToken::new(), &Value::Null, "hello").await
    });

    assert!(result.is_ok());
    assert_log(&logs, "span name", "adapter.send_input");
    assert_log(&logs, "entry message", "send_input");
    assert_log(&logs, "completion", "send_input accepted");
    assert_log(&logs, "timing", "elapsed_ms");
}

#[test]
fn send_input_logs_error_on_failure() {
    let (logs, result) = with_tracing(|| async {
        let adapter = ReferenceAdapter::new(SessionId::new("s1"));
        adapter.set_send_input_error("boom");
        let traced = TracedAdapter::new(adapter);
        traced.send_input(CancellationToken::new(), &Value::Null, "hello").await
    });

    assert!(result.is_err());
    assert_log(&logs, "failure", "send_input failed");
}

#[test]
fn kill_logs_operation() {
    let (logs, result) = with_tracing(|| async {
        let traced = TracedAdapter::new(ReferenceAdapter::new(SessionId::new("s1")));
        traced.kill().await
    });

    assert!(result.is_ok());
    assert_log(&logs, "kill span", "adapter.kill");
    assert_log(&logs, "kill completion", "killed");
}

#[tokio::test]
async fn traced_adapter_delegates_send_input_to_inner() {
    let inner = ReferenceAdapter::new(SessionId::new("s1"));
    let traced = TracedAdapter::new(inner.clone());

    let _ = traced.send_input(CancellationToken::new(), &Value::Null, "hello").await.unwrap();

    let calls = inner.calls();
    assert_eq!(calls.len(), 1);
    assert!(matches!(&calls[0], crate::reference_adapter::AdapterCall::SendInput { content } if content == "hello"));
}

#[tokio::test]
async fn traced_adapter_forwards_capability_probes() {
    let traced = TracedAdapter::new(ReferenceAdapter::new(SessionId::new("s1")));
    assert!(traced.as_suspendable().is_some());
    assert!(traced.as_terminal_provider().is_some());
}
