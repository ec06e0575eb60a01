// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ordered replay of log entries into a state machine

use crate::error::ReplayError;
use crate::fsm::StateMachine;
use rdbg_core::IndexRange;
use rdbg_storage::LogStore;

/// Outcome of a replay
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayStats {
    /// Command entries applied
    pub applied: u64,
    /// Non-command entries read and passed over
    pub skipped: u64,
    /// Index of the last applied command
    pub last_applied: Option<u64>,
}

/// Apply every command entry in `range`, in ascending index order
///
/// Any read or apply failure aborts the replay.
pub fn replay<L, M>(log: &L, range: IndexRange, fsm: &mut M) -> Result<ReplayStats, ReplayError>
where
    L: LogStore + ?Sized,
    M: StateMachine + ?Sized,
{
    let mut stats = ReplayStats::default();

    for index in range.indexes() {
        let entry = log
            .get_log(index)
            .map_err(|source| ReplayError::Read { index, source })?;

        if !entry.is_command() {
            stats.skipped += 1;
            continue;
        }

        fsm.apply(&entry)
            .map_err(|source| ReplayError::Apply { index, source })?;
        stats.applied += 1;
        stats.last_applied = Some(index);
    }

    tracing::info!(
        first = range.first,
        last = range.last,
        applied = stats.applied,
        skipped = stats.skipped,
        "replay complete"
    );
    Ok(stats)
}

#[cfg(test)]
#[path = "replay_tests.rs"]
mod tests;
