// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Snapshot store
//!
//! Each snapshot lives in its own directory:
//!
//! ```text
//! snapshots/
//!   <term>-<index>-<suffix>/
//!     meta.json
//!     state.bin
//! ```
//!
//! Directories ending in `.tmp` are snapshots still being written and are
//! never listed.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const META_FILE: &str = "meta.json";
pub const STATE_FILE: &str = "state.bin";
const TMP_SUFFIX: &str = ".tmp";

/// Errors from listing or opening snapshots
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("snapshot not found: {0}")]
    NotFound(String),
    #[error("snapshot path is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),
    #[error("unsupported snapshot version {version} in {id}")]
    UnsupportedVersion { id: String, version: u32 },
    #[error("snapshot {id} failed integrity check: {reason}")]
    Integrity { id: String, reason: String },
}

/// Metadata describing one snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SnapshotMeta {
    pub version: u32,
    #[serde(rename = "ID")]
    pub id: String,
    pub index: u64,
    pub term: u64,
    pub size: u64,
    /// crc32 of the state file
    #[serde(rename = "CRC")]
    pub crc: u32,
}

impl SnapshotMeta {
    pub const CURRENT_VERSION: u32 = 1;
}

/// Verified contents of one snapshot
#[derive(Debug)]
pub struct SnapshotSource {
    meta: SnapshotMeta,
    data: Cursor<Vec<u8>>,
}

impl SnapshotSource {
    pub fn new(meta: SnapshotMeta, data: Vec<u8>) -> Self {
        Self {
            meta,
            data: Cursor::new(data),
        }
    }

    pub fn meta(&self) -> &SnapshotMeta {
        &self.meta
    }
}

impl Read for SnapshotSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.data.read(buf)
    }
}

/// Listing and opening of snapshots
pub trait SnapshotStore {
    /// Snapshots in the order they should be tried
    fn list(&self) -> Result<Vec<SnapshotMeta>, SnapshotError>;

    fn open(&self, id: &str) -> Result<SnapshotSource, SnapshotError>;
}

/// Directory-per-snapshot store
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    dir: PathBuf,
}

impl FileSnapshotStore {
    /// Open the store rooted at `dir`
    ///
    /// A missing directory is an empty store.
    pub fn open(dir: &Path) -> Result<Self, SnapshotError> {
        if dir.exists() && !dir.is_dir() {
            return Err(SnapshotError::NotADirectory(dir.to_path_buf()));
        }
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn read_meta(&self, id: &str) -> Result<SnapshotMeta, SnapshotError> {
        let path = self.dir.join(id).join(META_FILE);
        let raw = match fs::read(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(SnapshotError::NotFound(id.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        let meta: SnapshotMeta = serde_json::from_slice(&raw)?;
        if meta.id != id {
            return Err(SnapshotError::Integrity {
                id: id.to_string(),
                reason: format!("meta names snapshot {}", meta.id),
            });
        }
        Ok(meta)
    }
}

impl SnapshotStore for FileSnapshotStore {
    /// Newest first: term, then index, then id, all descending
    fn list(&self) -> Result<Vec<SnapshotMeta>, SnapshotError> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut snapshots = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let Some(id) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if id.ends_with(TMP_SUFFIX) {
                continue;
            }

            match self.read_meta(&id) {
                Ok(meta) => snapshots.push(meta),
                Err(e) => {
                    tracing::warn!(snapshot = %id, error = %e, "skipping unreadable snapshot");
                }
            }
        }

        snapshots.sort_by(|a, b| {
            b.term
                .cmp(&a.term)
                .then(b.index.cmp(&a.index))
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(snapshots)
    }

    fn open(&self, id: &str) -> Result<SnapshotSource, SnapshotError> {
        let meta = self.read_meta(id)?;
        if meta.version != SnapshotMeta::CURRENT_VERSION {
            return Err(SnapshotError::UnsupportedVersion {
                id: id.to_string(),
                version: meta.version,
            });
        }

        let data = fs::read(self.dir.join(id).join(STATE_FILE))?;
        if data.len() as u64 != meta.size {
            return Err(SnapshotError::Integrity {
                id: id.to_string(),
                reason: format!("expected {} bytes, found {}", meta.size, data.len()),
            });
        }
        let crc = crc32fast::hash(&data);
        if crc != meta.crc {
            return Err(SnapshotError::Integrity {
                id: id.to_string(),
                reason: format!("expected crc {:08x}, found {:08x}", meta.crc, crc),
            });
        }

        Ok(SnapshotSource::new(meta, data))
    }
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
