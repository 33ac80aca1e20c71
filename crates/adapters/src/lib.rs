// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! The session adapter contract (§4.7), a tracing decorator for any
//! implementation, and a complete reference implementation.

mod adapter;
mod reference_adapter;
mod traced;

pub use adapter::{AdapterError, AdapterStatus, SessionAdapter, Suspendable, TerminalProvider, TerminalUnsubscribe};
pub use reference_adapter::{AdapterCall, ReferenceAdapter};
pub use traced::TracedAdapter;
