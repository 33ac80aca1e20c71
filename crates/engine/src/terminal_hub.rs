// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Terminal hub (C4): per-session PTY fan-out with snapshot/diff semantics,
//! slow-subscriber drop-with-resync, and a last-known-snapshot cache (§4.6).

use conductor_adapters::{AdapterError, TerminalProvider};
use conductor_core::{TerminalSnapshot, TerminalStreamEvent, TerminalUpdate};
use parking_lot::RwLock;
use std::collections::{HashMap, VecDeque};
use tokio::sync::mpsc;

use crate::broadcaster::SubscriberId;

struct Subscriber {
    tx: mpsc::Sender<TerminalStreamEvent>,
    /// Resync pair awaiting delivery after a previous overflow found this
    /// subscriber's channel still full.
    pending: VecDeque<TerminalStreamEvent>,
}

struct Inner {
    next_seq: u64,
    last_snapshot: Option<TerminalSnapshot>,
    subscribers: HashMap<SubscriberId, Subscriber>,
    closed: bool,
}

/// One hub per session with an active PTY-capable adapter.
pub struct TerminalHub {
    inner: RwLock<Inner>,
}

impl Default for TerminalHub {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalHub {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                next_seq: 0,
                last_snapshot: None,
                subscribers: HashMap::new(),
                closed: false,
            }),
        }
    }

    fn allocate_seq(inner: &mut Inner) -> u64 {
        let seq = inner.next_seq;
        inner.next_seq += 1;
        seq
    }

    /// Register a subscriber and deliver a synthetic initial Snapshot event,
    /// built from the cached snapshot or, absent one, fetched from `provider`.
    pub async fn subscribe(
        &self,
        subscriber_id: impl Into<SubscriberId>,
        buffer: usize,
        provider: &dyn TerminalProvider,
    ) -> Result<mpsc::Receiver<TerminalStreamEvent>, AdapterError> {
        let cached = self.inner.read().last_snapshot.clone();
        let snapshot = match cached {
            Some(snapshot) => snapshot,
            None => provider.terminal_snapshot().await?,
        };

        let (tx, rx) = mpsc::channel(buffer);
        let mut inner = self.inner.write();
        inner.last_snapshot = Some(snapshot.clone());
        let seq = Self::allocate_seq(&mut inner);
        let _ = tx.try_send(TerminalStreamEvent {
            seq,
            update: TerminalUpdate::Snapshot(snapshot),
        });
        inner
            .subscribers
            .insert(subscriber_id.into(), Subscriber { tx, pending: VecDeque::new() });
        Ok(rx)
    }

    /// Assign a seq to `update`, update the snapshot cache, and fan it out.
    pub fn broadcast(&self, update: TerminalUpdate) -> TerminalStreamEvent {
        let mut inner = self.inner.write();
        let seq = Self::allocate_seq(&mut inner);
        if let TerminalUpdate::Snapshot(snapshot) = &update {
            inner.last_snapshot = Some(snapshot.clone());
        }
        let event = TerminalStreamEvent { seq, update };

        let ids: Vec<SubscriberId> = inner.subscribers.keys().cloned().collect();
        for id in ids {
            Self::deliver_or_resync(&mut inner, &id, event.clone());
        }
        event
    }

    /// Drain any pending resync pair, then attempt delivery of `event`;
    /// a full channel triggers a fresh resync pair (§4.6).
    fn deliver_or_resync(inner: &mut Inner, id: &str, event: TerminalStreamEvent) {
        let still_full = match inner.subscribers.get_mut(id) {
            Some(sub) => {
                while let Some(pending_event) = sub.pending.pop_front() {
                    if sub.tx.try_send(pending_event.clone()).is_err() {
                        sub.pending.push_front(pending_event);
                        return;
                    }
                }
                sub.tx.try_send(event.clone()).is_err()
            }
            None => return,
        };
        if !still_full {
            return;
        }

        let error_seq = Self::allocate_seq(inner);
        let snapshot_seq = Self::allocate_seq(inner);
        let snapshot = inner
            .last_snapshot
            .clone()
            .unwrap_or_else(|| TerminalSnapshot { rows: 0, cols: 0, lines: Vec::new() });

        let error_event = TerminalStreamEvent {
            seq: error_seq,
            update: TerminalUpdate::Error {
                code: "overflow".to_string(),
                message: "terminal subscriber overflow".to_string(),
                resync: true,
            },
        };
        let snapshot_event = TerminalStreamEvent { seq: snapshot_seq, update: TerminalUpdate::Snapshot(snapshot) };

        if let Some(sub) = inner.subscribers.get_mut(id) {
            if sub.tx.try_send(error_event.clone()).is_err() {
                sub.pending.push_back(error_event);
                sub.pending.push_back(snapshot_event);
                return;
            }
            if sub.tx.try_send(snapshot_event.clone()).is_err() {
                sub.pending.push_back(snapshot_event);
            }
        }
    }

    /// Idempotent. Drops every subscriber channel and returns the last
    /// known snapshot so the caller can persist it to the terminal store.
    pub fn close(&self) -> Option<TerminalSnapshot> {
        let mut inner = self.inner.write();
        if inner.closed {
            return None;
        }
        inner.closed = true;
        inner.subscribers.clear();
        inner.last_snapshot.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.read().closed
    }
}

#[cfg(test)]
#[path = "terminal_hub_tests.rs"]
mod tests;
