// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resume-token manager (C8): mints, validates, and consumes the single-use
//! tokens that authorize out-of-band resumption of an interrupted run.

use conductor_core::{Clock, CoreError, ResumeToken, ResumeTokenId, RunAttemptId, SessionId};
use conductor_storage::ResumeTokenStore;
use std::sync::Arc;

use crate::error::ExecutorError;
use crate::IdFactory;

pub struct ResumeTokenManager {
    store: Arc<dyn ResumeTokenStore>,
    clock: Arc<dyn Clock>,
    id_gen: IdFactory,
    ttl_ms: u64,
}

impl ResumeTokenManager {
    pub fn new(
        store: Arc<dyn ResumeTokenStore>,
        clock: Arc<dyn Clock>,
        id_gen: IdFactory,
        ttl_ms: u64,
    ) -> Self {
        Self { store, clock, id_gen, ttl_ms }
    }

    /// Mint and persist a fresh token for the given session/attempt pair.
    pub fn mint(&self, session_id: SessionId, attempt_id: RunAttemptId) -> Result<ResumeToken, ExecutorError> {
        let now = self.clock.now_ms();
        let token = ResumeToken::new(
            ResumeTokenId::new((self.id_gen)()),
            session_id,
            attempt_id,
            now,
            self.ttl_ms,
        );
        self.store.save(&token)?;
        Ok(token)
    }

    /// Load a token without consuming it.
    pub fn load(&self, token_id: &ResumeTokenId) -> Result<ResumeToken, ExecutorError> {
        self.store
            .load(token_id)?
            .ok_or_else(|| CoreError::TokenInvalid.into())
    }

    /// Validate and atomically consume a token. The caller is responsible
    /// for cross-checking the owning attempt still names this token
    /// (§4.3); this only enforces the token's own lifecycle.
    pub fn consume(&self, token_id: &ResumeTokenId) -> Result<ResumeToken, ExecutorError> {
        let mut token = self
            .store
            .load(token_id)?
            .ok_or(CoreError::TokenInvalid)?;

        if token.is_revoked() {
            return Err(CoreError::TokenRevoked.into());
        }
        let now = self.clock.now_ms();
        if token.is_expired(now) {
            return Err(CoreError::TokenExpired.into());
        }

        token.consume(now);
        self.store.save(&token)?;
        Ok(token)
    }
}

#[cfg(test)]
#[path = "resume_token_manager_tests.rs"]
mod tests;
