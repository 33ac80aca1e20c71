// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn apply_snapshot_updates_cache() {
    let mut record = TerminalRecord::new(SessionId::new("s1"), TerminalKind::Pty, 1_000);
    let event = TerminalStreamEvent {
        seq: 1,
        update: TerminalUpdate::Snapshot(TerminalSnapshot {
            rows: 24,
            cols: 80,
            lines: vec!["hello".into()],
        }),
    };
    record.apply(&event, 2_000);
    assert_eq!(record.last_seq, 1);
    assert!(record.last_snapshot.is_some());
    assert_eq!(record.last_updated_at_ms, 2_000);
}

#[test]
fn apply_diff_does_not_touch_cached_snapshot() {
    let mut record = TerminalRecord::new(SessionId::new("s1"), TerminalKind::Pty, 1_000);
    record.apply(
        &TerminalStreamEvent {
            seq: 1,
            update: TerminalUpdate::Snapshot(TerminalSnapshot {
                rows: 24,
                cols: 80,
                lines: vec!["first".into()],
            }),
        },
        1_000,
    );
    record.apply(
        &TerminalStreamEvent {
            seq: 2,
            update: TerminalUpdate::Diff {
                region: TerminalRegion { row_start: 0, row_end: 1 },
                lines: vec!["second".into()],
            },
        },
        2_000,
    );
    assert_eq!(record.last_seq, 2);
    let snapshot = record.last_snapshot.as_ref().unwrap();
    assert_eq!(snapshot.lines, vec!["first".to_string()]);
}
