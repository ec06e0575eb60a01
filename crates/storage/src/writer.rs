// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fixture writers for raft data directories
//!
//! The tool itself never writes; these exist so tests can lay down logs,
//! snapshots and client state in the on-disk formats.

use crate::client::{
    ALLOCATIONS_DIR, ALLOC_FILE, DEPLOYMENT_STATUS_FILE, LOCAL_STATE_FILE, TASKS_DIR,
    TASK_STATE_FILE,
};
use crate::frame;
use crate::snapshot::{SnapshotMeta, META_FILE, STATE_FILE};
use rdbg_core::RawLog;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Appends framed entries to a log file
pub struct LogWriter {
    file: File,
}

impl LogWriter {
    /// Create the file (and parent directories), truncating any existing log
    pub fn create(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(Self {
            file: File::create(path)?,
        })
    }

    /// Open an existing log for appending
    pub fn append_to(path: &Path) -> io::Result<Self> {
        Ok(Self {
            file: OpenOptions::new().append(true).open(path)?,
        })
    }

    pub fn append(&mut self, log: &RawLog) -> io::Result<()> {
        self.file.write_all(&frame::encode(log))
    }

    /// Append bytes verbatim, for corrupt-tail fixtures
    pub fn append_raw(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.file.write_all(bytes)
    }

    pub fn sync(&mut self) -> io::Result<()> {
        self.file.sync_all()
    }
}

/// Encode one entry as it appears on disk
pub fn encode_frame(log: &RawLog) -> Vec<u8> {
    frame::encode(log)
}

/// Writes snapshot directories
pub struct SnapshotWriter {
    dir: PathBuf,
}

impl SnapshotWriter {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    /// Write a complete snapshot and return its metadata
    pub fn write(&self, term: u64, index: u64, state: &[u8]) -> io::Result<SnapshotMeta> {
        let suffix = match fs::read_dir(&self.dir) {
            Ok(entries) => entries.count(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => 0,
            Err(e) => return Err(e),
        };
        let meta = SnapshotMeta {
            version: SnapshotMeta::CURRENT_VERSION,
            id: format!("{term}-{index}-{suffix}"),
            index,
            term,
            size: state.len() as u64,
            crc: crc32fast::hash(state),
        };
        self.write_with_meta(&meta, state)?;
        Ok(meta)
    }

    /// Write `state` under `meta` as given, without fixing size or crc
    pub fn write_with_meta(&self, meta: &SnapshotMeta, state: &[u8]) -> io::Result<()> {
        let snapshot_dir = self.dir.join(&meta.id);
        fs::create_dir_all(&snapshot_dir)?;
        let meta_json = serde_json::to_vec_pretty(meta).map_err(io::Error::other)?;
        fs::write(snapshot_dir.join(META_FILE), meta_json)?;
        fs::write(snapshot_dir.join(STATE_FILE), state)?;
        Ok(())
    }
}

/// Writes allocation directories under a client state root
pub struct ClientStateWriter {
    dir: PathBuf,
}

impl ClientStateWriter {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    fn alloc_dir(&self, id: &str) -> PathBuf {
        self.dir.join(ALLOCATIONS_DIR).join(id)
    }

    /// Write the msgpack allocation record for `id`
    pub fn allocation(&self, id: &str, alloc: &[u8]) -> io::Result<()> {
        let dir = self.alloc_dir(id);
        fs::create_dir_all(&dir)?;
        fs::write(dir.join(ALLOC_FILE), alloc)
    }

    pub fn deployment_status(&self, id: &str, status: &[u8]) -> io::Result<()> {
        let dir = self.alloc_dir(id);
        fs::create_dir_all(&dir)?;
        fs::write(dir.join(DEPLOYMENT_STATUS_FILE), status)
    }

    /// Write a task runner's local state and reported task state
    pub fn task_runner_state(
        &self,
        id: &str,
        task: &str,
        local_state: Option<&[u8]>,
        task_state: Option<&[u8]>,
    ) -> io::Result<()> {
        let dir = self.alloc_dir(id).join(TASKS_DIR).join(task);
        fs::create_dir_all(&dir)?;
        if let Some(local_state) = local_state {
            fs::write(dir.join(LOCAL_STATE_FILE), local_state)?;
        }
        if let Some(task_state) = task_state {
            fs::write(dir.join(TASK_STATE_FILE), task_state)?;
        }
        Ok(())
    }
}
