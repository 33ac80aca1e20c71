// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JSONL append-only log of a session's messages, with group commit.
//!
//! Every message is durably appended before the session record is assumed
//! to reflect it, enabling replay-based recovery: the last saved `Session`
//! snapshot plus everything appended to its log after that point
//! reconstructs the in-memory session exactly.
//!
//! Each entry is a single line of JSON: `{"seq":N,"message":{...}}\n`

use crate::error::StorageError;
use conductor_core::Message;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::warn;

/// Flush interval for group commit.
const FLUSH_INTERVAL: Duration = Duration::from_millis(10);

/// Maximum entries to buffer before forcing flush.
const FLUSH_THRESHOLD: usize = 100;

#[derive(Serialize)]
struct LogRecordRef<'a> {
    seq: u64,
    message: &'a Message,
}

#[derive(Deserialize)]
struct LogRecord {
    #[allow(dead_code)]
    seq: u64,
    message: Message,
}

/// Append-only JSONL log for a single session's message history.
pub struct MessageLog {
    file: File,
    path: PathBuf,
    write_buffer: Vec<Vec<u8>>,
    last_flush: Instant,
}

impl MessageLog {
    /// Open or create the log file at `path`.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;
        Ok(Self {
            file,
            path: path.to_owned(),
            write_buffer: Vec::new(),
            last_flush: Instant::now(),
        })
    }

    /// Buffer a message for append. Not durable until `flush()`.
    pub fn append(&mut self, seq: u64, message: &Message) -> Result<(), StorageError> {
        let record = LogRecordRef { seq, message };
        let mut json_bytes = serde_json::to_vec(&record)?;
        json_bytes.push(b'\n');
        self.write_buffer.push(json_bytes);
        Ok(())
    }

    /// Interval elapsed or buffer full.
    pub fn needs_flush(&self) -> bool {
        !self.write_buffer.is_empty()
            && (self.last_flush.elapsed() >= FLUSH_INTERVAL
                || self.write_buffer.len() >= FLUSH_THRESHOLD)
    }

    /// Flush buffered entries with a single fsync.
    pub fn flush(&mut self) -> Result<(), StorageError> {
        if self.write_buffer.is_empty() {
            return Ok(());
        }
        for bytes in self.write_buffer.drain(..) {
            self.file.write_all(&bytes)?;
        }
        self.file.sync_all()?;
        self.last_flush = Instant::now();
        Ok(())
    }

    /// Replay every message in the log, skipping past the first corrupt
    /// entry encountered (truncated writes from a prior crash).
    ///
    /// Each call to `append` writes a new record even when a tail `Output`
    /// message grows by delta (see `Message::append_delta`), so a session's
    /// logical history may contain several records sharing one `Message::seq`;
    /// collapsing those to the last write per seq is the caller's job
    /// (`Session` hydration), not this log's.
    pub fn replay(path: &Path) -> Result<Vec<Message>, StorageError> {
        if !path.exists() {
            return Ok(Vec::new());
        }
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        reader.seek(SeekFrom::Start(0))?;

        let mut messages = Vec::new();
        let mut line = String::new();
        loop {
            line.clear();
            match reader.read_line(&mut line) {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) if e.kind() == std::io::ErrorKind::InvalidData => break,
                Err(e) => return Err(e.into()),
            }
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<LogRecord>(trimmed) {
                Ok(record) => messages.push(record.message),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "corrupt message log entry, stopping replay");
                    break;
                }
            }
        }
        Ok(messages)
    }
}

impl Drop for MessageLog {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            warn!(path = %self.path.display(), error = %e, "failed to flush message log on drop");
        }
    }
}

#[cfg(test)]
#[path = "message_log_tests.rs"]
mod tests;
