// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File-backed implementation of every storage port.
//!
//! Layout under the configured root:
//!
//! ```text
//! root/
//!   sessions/<id>.json
//!   messages/<id>.log
//!   run_attempts/<id>.json
//!   resume_tokens/<id>.json
//!   terminals/<id>.json
//! ```
//!
//! Session/RunAttempt/ResumeToken/Terminal records use the atomic
//! snapshot writer; message history uses the append-only group-commit log.

use crate::error::StorageError;
use crate::message_log::MessageLog;
use crate::ports::{MessageLogAppender, ResumeTokenStore, RunAttemptStore, SessionStore, TerminalStore};
use crate::snapshot;
use conductor_core::{Message, ResumeToken, ResumeTokenId, RunAttempt, RunAttemptId, Session, SessionId, TerminalRecord};
use parking_lot::Mutex;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

struct OpenLog {
    log: MessageLog,
    next_seq: u64,
}

/// A single-root file store implementing every storage port.
///
/// Message logs for sessions that have been written to in this process are
/// kept open in a registry so appends don't reopen the file every call.
pub struct FileStore {
    root: PathBuf,
    open_logs: Mutex<HashMap<SessionId, OpenLog>>,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            open_logs: Mutex::new(HashMap::new()),
        }
    }

    fn session_path(&self, id: &SessionId) -> PathBuf {
        self.root.join("sessions").join(format!("{id}.json"))
    }

    fn message_log_path(&self, id: &SessionId) -> PathBuf {
        self.root.join("messages").join(format!("{id}.log"))
    }

    fn run_attempt_path(&self, id: &RunAttemptId) -> PathBuf {
        self.root.join("run_attempts").join(format!("{id}.json"))
    }

    fn resume_token_path(&self, id: &ResumeTokenId) -> PathBuf {
        self.root.join("resume_tokens").join(format!("{id}.json"))
    }

    fn terminal_path(&self, id: &SessionId) -> PathBuf {
        self.root.join("terminals").join(format!("{id}.json"))
    }

    fn list_json_dir<T: serde::de::DeserializeOwned>(dir: &Path) -> Result<Vec<T>, StorageError> {
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut out = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(record) = snapshot::load::<T>(&path)? {
                out.push(record);
            }
        }
        Ok(out)
    }
}

impl SessionStore for FileStore {
    fn save(&self, session: &Session) -> Result<(), StorageError> {
        snapshot::save(&self.session_path(&session.id), session)
    }

    fn load(&self, id: &SessionId) -> Result<Option<Session>, StorageError> {
        snapshot::load(&self.session_path(id))
    }

    fn list(&self) -> Result<Vec<Session>, StorageError> {
        Self::list_json_dir(&self.root.join("sessions"))
    }

    fn delete(&self, id: &SessionId) -> Result<(), StorageError> {
        let path = self.session_path(id);
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        self.open_logs.lock().remove(id);
        Ok(())
    }
}

impl MessageLogAppender for FileStore {
    fn append(&self, session_id: &SessionId, message: &Message) -> Result<(), StorageError> {
        let mut logs = self.open_logs.lock();
        let entry = match logs.entry(session_id.clone()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let log = MessageLog::open(&self.message_log_path(session_id))?;
                entry.insert(OpenLog { log, next_seq: 0 })
            }
        };
        entry.next_seq += 1;
        entry.log.append(entry.next_seq, message)?;
        if entry.log.needs_flush() {
            entry.log.flush()?;
        }
        Ok(())
    }

    fn replay(&self, session_id: &SessionId) -> Result<Vec<Message>, StorageError> {
        if let Some(entry) = self.open_logs.lock().get_mut(session_id) {
            entry.log.flush()?;
        }
        MessageLog::replay(&self.message_log_path(session_id))
    }
}

impl RunAttemptStore for FileStore {
    fn save(&self, attempt: &RunAttempt) -> Result<(), StorageError> {
        snapshot::save(&self.run_attempt_path(&attempt.id), attempt)
    }

    fn load(&self, id: &RunAttemptId) -> Result<Option<RunAttempt>, StorageError> {
        snapshot::load(&self.run_attempt_path(id))
    }

    fn list_for_session(&self, session_id: &SessionId) -> Result<Vec<RunAttempt>, StorageError> {
        let all: Vec<RunAttempt> = Self::list_json_dir(&self.root.join("run_attempts"))?;
        Ok(all.into_iter().filter(|a| &a.session_id == session_id).collect())
    }
}

impl ResumeTokenStore for FileStore {
    fn save(&self, token: &ResumeToken) -> Result<(), StorageError> {
        snapshot::save(&self.resume_token_path(&token.id), token)
    }

    fn load(&self, id: &ResumeTokenId) -> Result<Option<ResumeToken>, StorageError> {
        snapshot::load(&self.resume_token_path(id))
    }
}

impl TerminalStore for FileStore {
    fn save(&self, record: &TerminalRecord) -> Result<(), StorageError> {
        snapshot::save(&self.terminal_path(&record.session_id), record)
    }

    fn load(&self, session_id: &SessionId) -> Result<Option<TerminalRecord>, StorageError> {
        snapshot::load(&self.terminal_path(session_id))
    }

    fn list(&self) -> Result<Vec<TerminalRecord>, StorageError> {
        Self::list_json_dir(&self.root.join("terminals"))
    }
}

/// Convenience bundle: a single `Arc<FileStore>` implementing every port,
/// for embedders that don't need to mix backends.
pub fn open(root: impl Into<PathBuf>) -> Arc<FileStore> {
    Arc::new(FileStore::new(root))
}

#[cfg(test)]
#[path = "file_store_tests.rs"]
mod tests;
