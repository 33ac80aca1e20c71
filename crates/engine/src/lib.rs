// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! conductor-engine: the executor that owns session contexts, enforces the
//! session state machine, spawns and pumps runs, and drives checkpoints,
//! suspension/resumption, and startup recovery.

mod broadcaster;
mod config;
mod error;
mod executor;
mod resume_token_manager;
mod session_context;
mod terminal_hub;

use std::sync::Arc;

pub use broadcaster::{Broadcaster, SubscriberId};
pub use config::ExecutorConfig;
pub use error::ExecutorError;
pub use executor::{Executor, ExecutorDeps, ExecutorHandle};
pub use resume_token_manager::ResumeTokenManager;
pub use session_context::{Run, SessionContext};
pub use terminal_hub::TerminalHub;

/// Closure-based id factory, used in place of `Arc<dyn IdGen>`: `IdGen`
/// carries `Clone` as a supertrait, which makes it non-object-safe.
pub type IdFactory = Arc<dyn Fn() -> String + Send + Sync>;

/// Builds adapter instances for one provider kind. Used in place of a
/// static generic type parameter on `Executor`, since it must dispatch
/// across several provider kinds registered at once, which a compile-time
/// type parameter can't express.
pub type AdapterFactory = Arc<
    dyn Fn(&conductor_core::SessionId, &serde_json::Value) -> Result<Arc<dyn conductor_adapters::SessionAdapter>, conductor_adapters::AdapterError>
        + Send
        + Sync,
>;
