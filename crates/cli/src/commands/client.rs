// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client commands

use crate::config::Config;
use crate::error::RdbgError;
use crate::output;
use clap::Subcommand;
use rdbg_engine::{read_client_state, ClientAllocState};
use rdbg_storage::FileClientStore;
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum ClientCommand {
    /// Print every allocation's persisted state as JSON, keyed by allocation id
    State {
        /// Agent data directory
        root: PathBuf,
    },
}

pub fn handle(command: ClientCommand) -> anyhow::Result<()> {
    match command {
        ClientCommand::State { root } => run_state(&Config::for_root(&root)),
    }
}

fn run_state(config: &Config) -> anyhow::Result<()> {
    let state = load_state(config)?;
    output::print_json(&state)
}

/// Open the client store and decode every allocation in it
pub fn load_state(config: &Config) -> Result<BTreeMap<String, ClientAllocState>, RdbgError> {
    let store = FileClientStore::open(&config.client_dir)
        .map_err(|e| RdbgError::client_store(e, &config.client_dir))?;
    read_client_state(&store).map_err(RdbgError::client_state)
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
