// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Raft commands

use super::{info, logs, state};
use crate::config::Config;
use crate::error::RdbgError;
use crate::output::OutputFormat;
use clap::Subcommand;
use rdbg_storage::FileLogStore;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum RaftCommand {
    /// Print every log entry as JSON
    Logs {
        /// Server data directory
        root: PathBuf,
    },
    /// Replay the log and print the resulting state as JSON
    State {
        /// Server data directory
        root: PathBuf,
        /// Last index to apply; zero or negative counts back from the end of the log
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        last_index: i64,
    },
    /// Print the log's path, length and index bounds
    Info {
        /// Server data directory
        root: PathBuf,
        #[arg(long, value_enum, default_value_t)]
        format: OutputFormat,
    },
}

pub fn handle(command: RaftCommand) -> anyhow::Result<()> {
    match command {
        RaftCommand::Logs { root } => logs::run(&Config::for_root(&root)),
        RaftCommand::State { root, last_index } => state::run(&Config::for_root(&root), last_index),
        RaftCommand::Info { root, format } => info::run(&Config::for_root(&root), format),
    }
}

/// Open the log store, mapping failures to user-facing errors
pub(crate) fn open_log_store(config: &Config) -> Result<FileLogStore, RdbgError> {
    FileLogStore::open(&config.log_path).map_err(|e| RdbgError::log_store(e, &config.raft_dir))
}
