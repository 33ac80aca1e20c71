// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! conductor-core: data model, event model, error taxonomy, and the clock
//! abstraction shared by every other crate in the workspace.

pub mod clock;
pub mod error;
pub mod event;
pub mod id;
pub mod message;
pub mod resume_token;
pub mod run_attempt;
pub mod session;
pub mod terminal;
pub mod time_fmt;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use clock::{Clock, FakeClock, SystemClock};
pub use error::CoreError;
pub use event::{Event, EventId, EventPayload, PlanStep, RawEvent, ToolCallStatus};
pub use id::{IdGen, SequentialIdGen, ShortId, UuidIdGen};
pub use message::{Message, MessageKind, MessageSeq, Projection};
pub use resume_token::{ResumeToken, ResumeTokenId};
pub use run_attempt::{RunAttempt, RunAttemptId, TerminalReason};
#[cfg(any(test, feature = "test-support"))]
pub use run_attempt::RunAttemptBuilder;
pub use session::{ProviderKind, Session, SessionId, SessionState, SuspensionPayload};
pub use terminal::{TerminalKind, TerminalRecord, TerminalRegion, TerminalSnapshot, TerminalStreamEvent, TerminalUpdate};
pub use time_fmt::{format_elapsed, format_elapsed_ms};
