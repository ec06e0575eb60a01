// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Restore a state machine from the first usable snapshot

use crate::error::SnapshotRestoreError;
use crate::fsm::StateMachine;
use rdbg_storage::{SnapshotError, SnapshotMeta, SnapshotStore};

/// Try snapshots in listed order until one restores
///
/// Snapshots that fail to open or restore are logged and skipped. Returns
/// the restored snapshot, or `None` when nothing could be restored. Only a
/// failure to list the store is an error.
pub fn restore_from_snapshot<S, M>(
    snapshots: &S,
    fsm: &mut M,
) -> Result<Option<SnapshotMeta>, SnapshotError>
where
    S: SnapshotStore + ?Sized,
    M: StateMachine + ?Sized,
{
    for meta in snapshots.list()? {
        match restore_one(snapshots, fsm, &meta) {
            Ok(()) => {
                tracing::info!(
                    snapshot = %meta.id,
                    index = meta.index,
                    term = meta.term,
                    "restored from snapshot"
                );
                return Ok(Some(meta));
            }
            Err(e) => {
                tracing::warn!(snapshot = %meta.id, error = %e, "failed to restore snapshot");
            }
        }
    }
    Ok(None)
}

/// Index of the restored snapshot, zero when none was restored
pub fn restored_index(restored: Option<&SnapshotMeta>) -> u64 {
    restored.map_or(0, |meta| meta.index)
}

fn restore_one<S, M>(
    snapshots: &S,
    fsm: &mut M,
    meta: &SnapshotMeta,
) -> Result<(), SnapshotRestoreError>
where
    S: SnapshotStore + ?Sized,
    M: StateMachine + ?Sized,
{
    let mut source = snapshots.open(&meta.id)?;
    fsm.restore(&mut source)?;
    Ok(())
}

#[cfg(test)]
#[path = "restore_tests.rs"]
mod tests;
