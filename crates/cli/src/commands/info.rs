// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `rdbg raft info`

use super::raft::open_log_store;
use crate::config::Config;
use crate::error::RdbgError;
use crate::output::{self, OutputFormat};
use rdbg_storage::{FileLogStore, LogStore};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Serialize)]
pub struct RaftInfo {
    pub path: PathBuf,
    pub length: u64,
    pub first_index: u64,
    pub last_index: u64,
}

impl RaftInfo {
    pub fn from_store(store: &FileLogStore) -> Result<Self, RdbgError> {
        let range = store
            .index_range()
            .map_err(|e| RdbgError::new("failed to read log bounds").with_source(e))?;
        Ok(Self {
            path: store.path().to_path_buf(),
            length: range.len(),
            first_index: range.first,
            last_index: range.last,
        })
    }
}

impl fmt::Display for RaftInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "path:         {}", self.path.display())?;
        writeln!(f, "length:       {}", self.length)?;
        writeln!(f, "first index:  {}", self.first_index)?;
        writeln!(f, "last index:   {}", self.last_index)
    }
}

pub fn run(config: &Config, format: OutputFormat) -> anyhow::Result<()> {
    let store = open_log_store(config)?;
    let info = RaftInfo::from_store(&store)?;
    output::print(&info, format)
}
