// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event broadcaster (C3): single mutating sink that assigns monotonic
//! event ids, keeps a per-session history ring, and fans events out to
//! buffered subscribers with a drop-on-slow policy.

use conductor_core::{Event, EventId, RawEvent, SessionId};
use parking_lot::RwLock;
use std::collections::{HashMap, VecDeque};
use tokio::sync::mpsc;

/// Caller-supplied identity for a subscriber connection.
pub type SubscriberId = String;

struct Subscriber {
    session_filter: Option<SessionId>,
    tx: mpsc::Sender<Event>,
}

struct Inner {
    next_id: EventId,
    history: HashMap<SessionId, VecDeque<Event>>,
    subscribers: HashMap<SubscriberId, Subscriber>,
}

/// At-most-once, sequence-numbered fan-out from the executor to N event
/// subscribers (§4.4).
pub struct Broadcaster {
    inner: RwLock<Inner>,
    history_capacity: usize,
}

impl Broadcaster {
    /// `history_capacity` is the per-session ring size; §9 pins this to the
    /// broadcaster's default subscriber buffer rather than any one
    /// subscription's buffer.
    pub fn new(history_capacity: usize) -> Self {
        Self {
            inner: RwLock::new(Inner {
                next_id: 0,
                history: HashMap::new(),
                subscribers: HashMap::new(),
            }),
            history_capacity,
        }
    }

    /// Stamp `raw` with the next id, append it to its session's history
    /// ring, and fan it out to matching subscribers. Full subscriber
    /// channels are dropped silently.
    pub fn broadcast(&self, raw: RawEvent) -> Event {
        let mut inner = self.inner.write();
        inner.next_id += 1;
        let event = raw.stamp(inner.next_id);

        let ring = inner.history.entry(event.session_id.clone()).or_default();
        ring.push_back(event.clone());
        while ring.len() > self.history_capacity {
            ring.pop_front();
        }

        for sub in inner.subscribers.values() {
            if sub
                .session_filter
                .as_ref()
                .map_or(true, |filter| *filter == event.session_id)
            {
                let _ = sub.tx.try_send(event.clone());
            }
        }

        event
    }

    /// Register a new subscriber with a freshly buffered channel. An empty
    /// `session_filter` observes every session.
    pub fn subscribe(
        &self,
        subscriber_id: impl Into<SubscriberId>,
        session_filter: Option<SessionId>,
        buffer: usize,
    ) -> mpsc::Receiver<Event> {
        let (tx, rx) = mpsc::channel(buffer);
        self.inner.write().subscribers.insert(
            subscriber_id.into(),
            Subscriber { session_filter, tx },
        );
        rx
    }

    /// As [`Broadcaster::subscribe`], additionally returning the events
    /// still resident in the filtered session's history ring with id
    /// strictly greater than `last_event_id`. A `None` session filter has
    /// no well-defined single ring to replay from, so it always replays
    /// empty (see DESIGN.md).
    pub fn subscribe_with_replay(
        &self,
        subscriber_id: impl Into<SubscriberId>,
        session_filter: Option<SessionId>,
        buffer: usize,
        last_event_id: Option<EventId>,
    ) -> (mpsc::Receiver<Event>, Vec<Event>) {
        let (tx, rx) = mpsc::channel(buffer);
        let mut inner = self.inner.write();

        let replay = match &session_filter {
            Some(session_id) => {
                let last = last_event_id.unwrap_or(0);
                inner
                    .history
                    .get(session_id)
                    .map(|ring| ring.iter().filter(|e| e.id > last).cloned().collect())
                    .unwrap_or_default()
            }
            None => Vec::new(),
        };

        inner.subscribers.insert(
            subscriber_id.into(),
            Subscriber { session_filter, tx },
        );
        (rx, replay)
    }

    /// Remove a subscriber, closing its channel.
    pub fn unsubscribe(&self, subscriber_id: &str) {
        self.inner.write().subscribers.remove(subscriber_id);
    }

    /// Snapshot of a session's history ring, id-ascending. Test/introspection only.
    pub fn history(&self, session_id: &SessionId) -> Vec<Event> {
        self.inner
            .read()
            .history
            .get(session_id)
            .map(|ring| ring.iter().cloned().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
#[path = "broadcaster_tests.rs"]
mod tests;
