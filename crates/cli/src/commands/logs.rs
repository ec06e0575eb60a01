// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `rdbg raft logs`

use super::raft::open_log_store;
use crate::config::Config;
use crate::error::RdbgError;
use crate::output;
use rdbg_core::{LogDecoder, LogEntry};
use rdbg_storage::LogStore;

pub fn run(config: &Config) -> anyhow::Result<()> {
    let store = open_log_store(config)?;
    let entries = dump(&store, &LogDecoder::default())?;
    output::print_json(&entries)
}

/// Decode every readable entry in ascending order
///
/// Entries that cannot be read or decoded are skipped with a warning, and
/// so are gaps in the stored indexes.
pub fn dump(store: &impl LogStore, decoder: &LogDecoder) -> Result<Vec<LogEntry>, RdbgError> {
    let range = store
        .index_range()
        .map_err(|e| RdbgError::new("failed to read log bounds").with_source(e))?;
    if range.is_empty() {
        return Ok(Vec::new());
    }

    let mut entries = Vec::new();
    let mut cursor = Some(range.first);
    while let Some(from) = cursor {
        let Some(index) = store
            .next_index(from, range.last)
            .map_err(|e| RdbgError::new("failed to read log index").with_source(e))?
        else {
            break;
        };
        if index > from {
            tracing::warn!(from, to = index - 1, "log entries are missing, skipping");
        }
        cursor = index.checked_add(1);

        let raw = match store.get_log(index) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(index, error = %e, "failed to read log entry, skipping");
                continue;
            }
        };
        match decoder.decode(&raw) {
            Ok(entry) => entries.push(entry),
            Err(e) => {
                tracing::warn!(index, error = %e, "failed to decode log entry, skipping");
            }
        }
    }
    Ok(entries)
}

#[cfg(test)]
#[path = "logs_tests.rs"]
mod tests;
