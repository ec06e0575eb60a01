// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Paths inside an agent data directory

use std::path::{Path, PathBuf};

/// Locations derived from the data directory root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// `server/raft` under the root
    pub raft_dir: PathBuf,
    /// Framed log file
    pub log_path: PathBuf,
    /// One directory per snapshot
    pub snapshots_dir: PathBuf,
    /// Client allocation state, beside `server`
    pub client_dir: PathBuf,
}

impl Config {
    pub fn for_root(root: &Path) -> Self {
        let raft_dir = root.join("server").join("raft");
        Self {
            log_path: raft_dir.join("raft.log"),
            snapshots_dir: raft_dir.join("snapshots"),
            raft_dir,
            client_dir: root.join("client"),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
