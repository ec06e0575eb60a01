// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ordered log store keyed by raft index
//!
//! [`FileLogStore`] opens `raft.log` read-only under an exclusive advisory
//! lock and scans it once to build an index table. The scan stops at the
//! first torn or corrupt frame; everything before it stays readable.

use crate::frame::{self, FrameFault, HEADER_LEN};
use fs2::FileExt;
use rdbg_core::{IndexRange, RawLog};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from opening or reading a log store
#[derive(Debug, Error)]
pub enum LogStoreError {
    #[error("log store not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("log store is locked by another process: {}", .0.display())]
    Locked(PathBuf),
    #[error("failed to open log store {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("log entry {index} not found")]
    MissingEntry { index: u64 },
    #[error("checksum mismatch at index {index}")]
    ChecksumMismatch { index: u64 },
    #[error("corrupted entry at index {index}: {reason}")]
    Corrupted { index: u64, reason: String },
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl LogStoreError {
    /// Whether the error concerns a single entry rather than the store
    pub fn is_entry_error(&self) -> bool {
        matches!(
            self,
            LogStoreError::MissingEntry { .. }
                | LogStoreError::ChecksumMismatch { .. }
                | LogStoreError::Corrupted { .. }
        )
    }
}

/// Read access to an ordered log
///
/// An empty store reports `0` for both indexes.
pub trait LogStore {
    fn first_index(&self) -> Result<u64, LogStoreError>;
    fn last_index(&self) -> Result<u64, LogStoreError>;
    fn get_log(&self, index: u64) -> Result<RawLog, LogStoreError>;

    fn index_range(&self) -> Result<IndexRange, LogStoreError> {
        Ok(IndexRange::new(self.first_index()?, self.last_index()?))
    }

    /// Lowest stored index in `[from, last]`
    ///
    /// The default treats every index in bounds as stored, so gaps surface
    /// as `MissingEntry` from [`LogStore::get_log`].
    fn next_index(&self, from: u64, last: u64) -> Result<Option<u64>, LogStoreError> {
        Ok((from <= last).then_some(from))
    }
}

/// Framed log file opened for reading
///
/// The lock is released when the store is dropped. Reads seek a shared
/// handle, so a store should not be read from several threads at once.
#[derive(Debug)]
pub struct FileLogStore {
    path: PathBuf,
    file: File,
    /// Index to frame offset
    offsets: BTreeMap<u64, u64>,
}

impl FileLogStore {
    pub fn open(path: &Path) -> Result<Self, LogStoreError> {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(LogStoreError::NotFound(path.to_path_buf()));
            }
            Err(source) => {
                return Err(LogStoreError::Open {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        file.try_lock_exclusive()
            .map_err(|_| LogStoreError::Locked(path.to_path_buf()))?;

        let offsets = scan(&file, path)?;
        tracing::debug!(
            path = %path.display(),
            entries = offsets.len(),
            "opened log store"
        );

        Ok(Self {
            path: path.to_path_buf(),
            file,
            offsets,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of readable entries
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }
}

impl LogStore for FileLogStore {
    fn first_index(&self) -> Result<u64, LogStoreError> {
        Ok(self.offsets.keys().next().copied().unwrap_or(0))
    }

    fn last_index(&self) -> Result<u64, LogStoreError> {
        Ok(self.offsets.keys().next_back().copied().unwrap_or(0))
    }

    fn next_index(&self, from: u64, last: u64) -> Result<Option<u64>, LogStoreError> {
        if from > last {
            return Ok(None);
        }
        Ok(self.offsets.range(from..=last).next().map(|(index, _)| *index))
    }

    fn get_log(&self, index: u64) -> Result<RawLog, LogStoreError> {
        let offset = *self
            .offsets
            .get(&index)
            .ok_or(LogStoreError::MissingEntry { index })?;

        let mut file = &self.file;
        file.seek(SeekFrom::Start(offset))?;
        let body = frame::read_body(&mut file).map_err(|fault| match fault {
            FrameFault::Io(e) => LogStoreError::Io(e),
            FrameFault::ChecksumMismatch => LogStoreError::ChecksumMismatch { index },
            other => LogStoreError::Corrupted {
                index,
                reason: other.reason(),
            },
        })?;

        let log = frame::parse_body(body);
        if log.index != index {
            return Err(LogStoreError::Corrupted {
                index,
                reason: format!("frame holds index {}", log.index),
            });
        }
        Ok(log)
    }
}

/// Build the index table, stopping at the first bad frame
///
/// A frame whose index is not past the previous one rewrites the log from
/// that index on, so the conflicting suffix is dropped.
fn scan(file: &File, path: &Path) -> Result<BTreeMap<u64, u64>, LogStoreError> {
    let mut reader = BufReader::new(file);
    let mut offsets = BTreeMap::new();
    let mut position: u64 = 0;

    loop {
        let body = match frame::read_body(&mut reader) {
            Ok(body) => body,
            Err(FrameFault::Eof) => break,
            Err(FrameFault::Io(e)) => return Err(e.into()),
            Err(fault) => {
                tracing::warn!(
                    path = %path.display(),
                    offset = position,
                    reason = %fault.reason(),
                    "stopping log scan at corrupt frame"
                );
                break;
            }
        };

        let index = frame::body_index(&body);
        if index == 0 {
            tracing::warn!(
                path = %path.display(),
                offset = position,
                "stopping log scan at frame with index 0"
            );
            break;
        }
        if offsets.range(index..).next().is_some() {
            tracing::debug!(index, "log rewritten from index");
            let _ = offsets.split_off(&index);
        }
        offsets.insert(index, position);
        position += (HEADER_LEN + body.len()) as u64;
    }

    Ok(offsets)
}

#[cfg(test)]
#[path = "log_tests.rs"]
mod tests;
