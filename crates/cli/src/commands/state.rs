// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `rdbg raft state`

use super::raft::open_log_store;
use crate::config::Config;
use crate::error::RdbgError;
use crate::output;
use rdbg_engine::{
    replay, restore_from_snapshot, restored_index, ClusterStateMachine, FsmConfig,
    StateCollections, StateMachine,
};
use rdbg_storage::{FileSnapshotStore, LogStore, SnapshotStore};

pub fn run(config: &Config, last_index: i64) -> anyhow::Result<()> {
    let store = open_log_store(config)?;
    let snapshots = FileSnapshotStore::open(&config.snapshots_dir)
        .map_err(|e| RdbgError::snapshot_store(e, &config.snapshots_dir))?;
    let mut fsm = ClusterStateMachine::new(FsmConfig::default());

    let state = rebuild(&store, &snapshots, &mut fsm, last_index)?;
    output::print_json(&state)
}

/// Restore the newest usable snapshot, then replay the log on top of it
pub fn rebuild<L, S, M>(
    store: &L,
    snapshots: &S,
    fsm: &mut M,
    last_index: i64,
) -> Result<StateCollections, RdbgError>
where
    L: LogStore,
    S: SnapshotStore,
    M: StateMachine,
{
    let restored = restore_from_snapshot(snapshots, fsm).map_err(|e| {
        RdbgError::new(format!("failed to list snapshots: {}", e)).with_source(e)
    })?;
    let snapshot_index = restored_index(restored.as_ref());

    let range = store
        .index_range()
        .map_err(|e| RdbgError::new("failed to read log bounds").with_source(e))?
        .after_snapshot(snapshot_index)
        .map_err(|e| RdbgError::missing_logs(e, snapshot_index))?
        .with_last_override(last_index);

    let stats = replay(store, range, fsm).map_err(RdbgError::replay)?;
    tracing::info!(
        snapshot_index,
        first = range.first,
        last = range.last,
        applied = stats.applied,
        "state rebuilt"
    );

    Ok(fsm.state())
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
