// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-use resume tokens (C8 / §3 "ResumeToken (persisted)").

use crate::run_attempt::RunAttemptId;
use crate::session::SessionId;
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for a resume token.
    pub struct ResumeTokenId;
}

/// Authorizes a single out-of-band resumption of an interrupted run.
///
/// Invariant: single-use — consuming a token sets `consumed_at_ms` and
/// `revoked_at_ms` atomically (`consume`), so a second attempt always finds
/// the token already revoked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumeToken {
    pub id: ResumeTokenId,
    pub session_id: SessionId,
    pub attempt_id: RunAttemptId,
    pub created_at_ms: u64,
    pub expires_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consumed_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revoked_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revocation_reason: Option<String>,
}

impl ResumeToken {
    pub fn new(
        id: ResumeTokenId,
        session_id: SessionId,
        attempt_id: RunAttemptId,
        now_ms: u64,
        ttl_ms: u64,
    ) -> Self {
        Self {
            id,
            session_id,
            attempt_id,
            created_at_ms: now_ms,
            expires_at_ms: now_ms + ttl_ms,
            consumed_at_ms: None,
            revoked_at_ms: None,
            revocation_reason: None,
        }
    }

    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms >= self.expires_at_ms
    }

    pub fn is_consumed(&self) -> bool {
        self.consumed_at_ms.is_some()
    }

    pub fn is_revoked(&self) -> bool {
        self.revoked_at_ms.is_some()
    }

    /// Atomically mark the token consumed and revoked. No-op if already
    /// revoked, preserving the original revocation reason.
    pub fn consume(&mut self, now_ms: u64) {
        if self.revoked_at_ms.is_some() {
            return;
        }
        self.consumed_at_ms = Some(now_ms);
        self.revoked_at_ms = Some(now_ms);
        self.revocation_reason = Some("consumed".to_string());
    }
}

#[cfg(test)]
#[path = "resume_token_tests.rs"]
mod tests;
