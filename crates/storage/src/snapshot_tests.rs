// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use conductor_core::{Session, SessionState};
use std::io::Write as _;
use tempfile::tempdir;

fn test_session() -> Session {
    Session::new(
        conductor_core::SessionId::new("s1"),
        "reference".to_string(),
        std::path::PathBuf::from("/work/project"),
        "proj-1".to_string(),
        "title".to_string(),
        1_000,
    )
}

#[test]
fn save_and_load_round_trips() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("s1.json");

    let session = test_session();
    save(&path, &session).unwrap();
    assert!(path.exists());

    let loaded: Session = load(&path).unwrap().unwrap();
    assert_eq!(loaded.id, session.id);
    assert_eq!(loaded.state, SessionState::Idle);
}

#[test]
fn load_of_missing_path_returns_none() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("missing.json");
    let loaded: Option<Session> = load(&path).unwrap();
    assert!(loaded.is_none());
}

#[test]
fn save_leaves_no_tmp_file_behind() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("s1.json");
    let tmp_path = path.with_extension("tmp");

    save(&path, &test_session()).unwrap();

    assert!(!tmp_path.exists());
    assert!(path.exists());
}

#[test]
fn load_of_corrupt_file_returns_none_and_creates_bak() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("s1.json");

    let mut f = File::create(&path).unwrap();
    f.write_all(b"\xe5\x03\x01binary-garbage").unwrap();
    drop(f);

    let loaded: Option<Session> = load(&path).unwrap();
    assert!(loaded.is_none());
    assert!(!path.exists());

    let bak = path.with_extension("bak");
    assert!(bak.exists());
}

#[test]
fn corrupt_loads_rotate_bak_files_keeping_at_most_three() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("s1.json");

    for i in 1..=4u8 {
        let mut f = File::create(&path).unwrap();
        f.write_all(&[i; 4]).unwrap();
        drop(f);
        let loaded: Option<Session> = load(&path).unwrap();
        assert!(loaded.is_none());
    }

    let bak1 = path.with_extension("bak");
    assert!(bak1.exists());
    assert_eq!(fs::read(&bak1).unwrap(), vec![4u8; 4]);

    let bak2 = path.with_extension("bak.2");
    assert!(bak2.exists());
    assert_eq!(fs::read(&bak2).unwrap(), vec![3u8; 4]);

    let bak3 = path.with_extension("bak.3");
    assert!(bak3.exists());
    assert_eq!(fs::read(&bak3).unwrap(), vec![2u8; 4]);

    let bak4 = path.with_extension("bak.4");
    assert!(!bak4.exists());
}
