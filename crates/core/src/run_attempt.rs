// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persisted run-attempt metadata (§3 "RunAttempt (persisted)").
//!
//! One `RunAttempt` per execution of a session's Run; sessions accumulate
//! many over their lifetime. The in-memory `Run` handle (engine crate)
//! points at exactly one open attempt at a time.

use crate::resume_token::ResumeTokenId;
use crate::session::{ProviderKind, SessionId};
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for a run attempt.
    pub struct RunAttemptId;
}

/// Why an attempt ended. Serializes to the lowercase strings used in the
/// public operation contracts (§6) and the end-to-end scenarios (§8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalReason {
    Completed,
    Cancelled,
    Interrupted,
    Failed,
}

impl std::fmt::Display for TerminalReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TerminalReason::Completed => "completed",
            TerminalReason::Cancelled => "cancelled",
            TerminalReason::Interrupted => "interrupted",
            TerminalReason::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// A persisted execution attempt of a session's Run.
///
/// Invariant: once `ended_at_ms` is set, every other field is frozen —
/// `finalize` silently no-ops on an already-ended attempt rather than
/// overwriting history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunAttempt {
    pub id: RunAttemptId,
    pub session_id: SessionId,
    pub provider_kind: ProviderKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,
    pub boot_id: String,
    pub started_at_ms: u64,
    pub heartbeat_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminal_reason: Option<TerminalReason>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interruption_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait_kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume_token_id: Option<ResumeTokenId>,
}

impl RunAttempt {
    pub fn new(
        id: RunAttemptId,
        session_id: SessionId,
        provider_kind: ProviderKind,
        provider_id: Option<String>,
        boot_id: impl Into<String>,
        now_ms: u64,
    ) -> Self {
        Self {
            id,
            session_id,
            provider_kind,
            provider_id,
            boot_id: boot_id.into(),
            started_at_ms: now_ms,
            heartbeat_at_ms: now_ms,
            ended_at_ms: None,
            terminal_reason: None,
            interruption_reason: None,
            wait_kind: None,
            wait_ref: None,
            resume_token_id: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.ended_at_ms.is_none()
    }

    pub fn heartbeat(&mut self, now_ms: u64) {
        self.heartbeat_at_ms = now_ms;
    }

    /// Mark the attempt as waiting on an external reply (§4.3 suspension).
    pub fn mark_waiting(&mut self, wait_kind: impl Into<String>, wait_ref: impl Into<String>, token_id: ResumeTokenId) {
        self.wait_kind = Some(wait_kind.into());
        self.wait_ref = Some(wait_ref.into());
        self.resume_token_id = Some(token_id);
    }

    /// Clear wait fields on a successful resume (§4.3).
    pub fn clear_wait(&mut self) {
        self.wait_kind = None;
        self.wait_ref = None;
        self.resume_token_id = None;
    }

    /// Freeze the attempt with a terminal reason. No-ops if already ended.
    pub fn finalize(&mut self, reason: TerminalReason, interruption_reason: Option<String>, now_ms: u64) {
        if self.ended_at_ms.is_some() {
            return;
        }
        self.ended_at_ms = Some(now_ms);
        self.terminal_reason = Some(reason);
        self.interruption_reason = interruption_reason;
    }
}

/// Test-only fluent builder, mirroring the corpus's `AgentRunBuilder` pattern.
#[cfg(any(test, feature = "test-support"))]
pub struct RunAttemptBuilder {
    attempt: RunAttempt,
}

#[cfg(any(test, feature = "test-support"))]
impl RunAttemptBuilder {
    pub fn new(id: &str, session_id: &str) -> Self {
        Self {
            attempt: RunAttempt::new(
                RunAttemptId::new(id),
                SessionId::new(session_id),
                "mock".to_string(),
                None,
                "boot-1",
                0,
            ),
        }
    }

    pub fn provider_kind(mut self, kind: impl Into<String>) -> Self {
        self.attempt.provider_kind = kind.into();
        self
    }

    pub fn started_at_ms(mut self, ms: u64) -> Self {
        self.attempt.started_at_ms = ms;
        self.attempt.heartbeat_at_ms = ms;
        self
    }

    pub fn waiting(mut self, wait_kind: &str, wait_ref: &str, token_id: &str) -> Self {
        self.attempt
            .mark_waiting(wait_kind, wait_ref, ResumeTokenId::new(token_id));
        self
    }

    pub fn ended(mut self, reason: TerminalReason, now_ms: u64) -> Self {
        self.attempt.finalize(reason, None, now_ms);
        self
    }

    pub fn build(self) -> RunAttempt {
        self.attempt
    }
}

#[cfg(test)]
#[path = "run_attempt_tests.rs"]
mod tests;
