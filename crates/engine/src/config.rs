// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Executor configuration: the constants of §5's timeout and buffer-size
//! model, gathered into one builder-style struct.

use std::time::Duration;

/// Tunables for an [`crate::Executor`] instance.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Bound on a single adapter operation (`send_input`, `stop`, `suspend`, `resume`).
    pub op_timeout: Duration,
    /// Interval between session snapshot checkpoints during a run.
    pub checkpoint_interval: Duration,
    /// Time-to-live for minted resume tokens.
    pub resume_token_ttl: Duration,
    /// Buffer size for a terminal hub's upstream update channel.
    pub terminal_update_buffer: usize,
    /// Default buffer size for event and terminal subscribers, and the
    /// per-session history ring capacity seeded from it.
    pub subscriber_buffer: usize,
    /// Identifies this executor instance in persisted `RunAttempt.boot_id`.
    pub boot_id: String,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            op_timeout: Duration::from_secs(30),
            checkpoint_interval: Duration::from_secs(30),
            resume_token_ttl: Duration::from_secs(3600),
            terminal_update_buffer: 128,
            subscriber_buffer: 32,
            boot_id: "boot-1".to_string(),
        }
    }
}
