// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use conductor_core::{EventPayload, SessionId};

fn raw(session_id: &str, n: u64) -> RawEvent {
    RawEvent::new(
        SessionId::new(session_id),
        n,
        EventPayload::Output {
            content: format!("out-{n}"),
            delta: false,
        },
    )
}

#[test]
fn broadcast_assigns_monotonically_increasing_ids() {
    let bc = Broadcaster::new(32);
    let e1 = bc.broadcast(raw("s1", 1));
    let e2 = bc.broadcast(raw("s1", 2));
    assert_eq!(e1.id, 1);
    assert_eq!(e2.id, 2);
}

#[test]
fn subscribe_then_broadcast_delivers_event() {
    let bc = Broadcaster::new(32);
    let mut rx = bc.subscribe("sub1", None, 8);
    bc.broadcast(raw("s1", 1));
    let event = rx.try_recv().expect("event delivered");
    assert_eq!(event.id, 1);
}

#[test]
fn session_filter_only_delivers_matching_session() {
    let bc = Broadcaster::new(32);
    let mut rx = bc.subscribe("sub1", Some(SessionId::new("s1")), 8);
    bc.broadcast(raw("s2", 1));
    bc.broadcast(raw("s1", 2));
    let event = rx.try_recv().expect("matching event delivered");
    assert_eq!(event.session_id, SessionId::new("s1"));
    assert!(rx.try_recv().is_err());
}

#[test]
fn full_channel_drops_silently() {
    let bc = Broadcaster::new(32);
    let mut rx = bc.subscribe("sub1", None, 1);
    for n in 1..=5 {
        bc.broadcast(raw("s1", n));
    }
    let first = rx.try_recv().expect("one event delivered");
    assert_eq!(first.id, 1);
    assert!(rx.try_recv().is_err());
}

#[test]
fn history_ring_evicts_oldest_beyond_capacity() {
    let bc = Broadcaster::new(2);
    for n in 1..=3 {
        bc.broadcast(raw("s1", n));
    }
    let history = bc.history(&SessionId::new("s1"));
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].id, 2);
    assert_eq!(history[1].id, 3);
}

#[test]
fn subscribe_with_replay_returns_events_after_last_id() {
    let bc = Broadcaster::new(32);
    for n in 1..=5 {
        bc.broadcast(raw("s1", n));
    }
    let (_rx, replay) = bc.subscribe_with_replay("sub1", Some(SessionId::new("s1")), 32, Some(2));
    let ids: Vec<EventId> = replay.iter().map(|e| e.id).collect();
    assert_eq!(ids, vec![3, 4, 5]);
}

#[test]
fn subscribe_with_replay_without_session_filter_replays_nothing() {
    let bc = Broadcaster::new(32);
    bc.broadcast(raw("s1", 1));
    let (_rx, replay) = bc.subscribe_with_replay("sub1", None, 32, Some(0));
    assert!(replay.is_empty());
}

#[test]
fn unsubscribe_stops_delivery() {
    let bc = Broadcaster::new(32);
    let mut rx = bc.subscribe("sub1", None, 8);
    bc.unsubscribe("sub1");
    bc.broadcast(raw("s1", 1));
    assert_eq!(
        rx.try_recv().unwrap_err(),
        tokio::sync::mpsc::error::TryRecvError::Disconnected
    );
}
