// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client state store
//!
//! A client keeps one directory per allocation it runs:
//!
//! ```text
//! client/
//!   allocations/<alloc-id>/
//!     alloc.bin                 msgpack allocation
//!     deployment_status.bin     msgpack deployment health, optional
//!     tasks/<task>/
//!       local_state.bin         msgpack task runner state, optional
//!       task_state.bin          msgpack task state as reported, optional
//! ```
//!
//! Records are handed back as raw msgpack; decoding is left to the caller.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const ALLOCATIONS_DIR: &str = "allocations";
pub const ALLOC_FILE: &str = "alloc.bin";
pub const DEPLOYMENT_STATUS_FILE: &str = "deployment_status.bin";
pub const TASKS_DIR: &str = "tasks";
pub const LOCAL_STATE_FILE: &str = "local_state.bin";
pub const TASK_STATE_FILE: &str = "task_state.bin";

/// Errors from opening or reading client state
#[derive(Debug, Error)]
pub enum ClientStoreError {
    #[error("client state not found at {}", .0.display())]
    NotFound(PathBuf),
    #[error("client state path is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),
    #[error("allocation not found: {0}")]
    AllocationNotFound(String),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Stored state of one task runner
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskRunnerRecord {
    pub local_state: Option<Vec<u8>>,
    pub task_state: Option<Vec<u8>>,
}

/// Read access to a client's persisted allocations
pub trait ClientStateStore {
    /// Allocation ids in ascending order
    fn allocation_ids(&self) -> Result<Vec<String>, ClientStoreError>;

    fn allocation(&self, id: &str) -> Result<Vec<u8>, ClientStoreError>;

    fn deployment_status(&self, id: &str) -> Result<Option<Vec<u8>>, ClientStoreError>;

    fn task_runner_state(&self, id: &str, task: &str)
        -> Result<TaskRunnerRecord, ClientStoreError>;
}

/// Directory-per-allocation client store
#[derive(Debug, Clone)]
pub struct FileClientStore {
    dir: PathBuf,
}

impl FileClientStore {
    /// Open the client state rooted at `dir`, which must exist
    pub fn open(dir: &Path) -> Result<Self, ClientStoreError> {
        match fs::metadata(dir) {
            Ok(meta) if meta.is_dir() => Ok(Self {
                dir: dir.to_path_buf(),
            }),
            Ok(_) => Err(ClientStoreError::NotADirectory(dir.to_path_buf())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(ClientStoreError::NotFound(dir.to_path_buf()))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn alloc_dir(&self, id: &str) -> PathBuf {
        self.dir.join(ALLOCATIONS_DIR).join(id)
    }
}

impl ClientStateStore for FileClientStore {
    fn allocation_ids(&self) -> Result<Vec<String>, ClientStoreError> {
        let entries = match fs::read_dir(self.dir.join(ALLOCATIONS_DIR)) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(id) => ids.push(id),
                Err(name) => {
                    tracing::warn!(name = ?name, "skipping allocation with non-UTF-8 id");
                }
            }
        }
        ids.sort();
        Ok(ids)
    }

    fn allocation(&self, id: &str) -> Result<Vec<u8>, ClientStoreError> {
        read_optional(&self.alloc_dir(id).join(ALLOC_FILE))?
            .ok_or_else(|| ClientStoreError::AllocationNotFound(id.to_string()))
    }

    fn deployment_status(&self, id: &str) -> Result<Option<Vec<u8>>, ClientStoreError> {
        read_optional(&self.alloc_dir(id).join(DEPLOYMENT_STATUS_FILE))
    }

    fn task_runner_state(
        &self,
        id: &str,
        task: &str,
    ) -> Result<TaskRunnerRecord, ClientStoreError> {
        let task_dir = self.alloc_dir(id).join(TASKS_DIR).join(task);
        Ok(TaskRunnerRecord {
            local_state: read_optional(&task_dir.join(LOCAL_STATE_FILE))?,
            task_state: read_optional(&task_dir.join(TASK_STATE_FILE))?,
        })
    }
}

fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, ClientStoreError> {
    match fs::read(path) {
        Ok(raw) => Ok(Some(raw)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
