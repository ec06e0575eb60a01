// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::fake::FakeStateMachine;
use crate::ApplyError;
use rdbg_core::{LogKind, RawLog};
use rdbg_storage::{FileLogStore, LogStoreError, LogWriter};
use std::collections::BTreeMap;
use tempfile::TempDir;

/// Log store backed by a map, for gaps the file store cannot produce
#[derive(Default)]
struct MemoryLogStore {
    logs: BTreeMap<u64, RawLog>,
}

impl MemoryLogStore {
    fn with(logs: impl IntoIterator<Item = RawLog>) -> Self {
        Self {
            logs: logs.into_iter().map(|l| (l.index, l)).collect(),
        }
    }
}

impl LogStore for MemoryLogStore {
    fn first_index(&self) -> Result<u64, LogStoreError> {
        Ok(self.logs.keys().next().copied().unwrap_or(0))
    }

    fn last_index(&self) -> Result<u64, LogStoreError> {
        Ok(self.logs.keys().next_back().copied().unwrap_or(0))
    }

    fn get_log(&self, index: u64) -> Result<RawLog, LogStoreError> {
        self.logs
            .get(&index)
            .cloned()
            .ok_or(LogStoreError::MissingEntry { index })
    }
}

fn command(index: u64) -> RawLog {
    RawLog::command(index, 1, 0, &[0x80])
}

fn noop(index: u64) -> RawLog {
    RawLog {
        index,
        term: 1,
        log_type: LogKind::NOOP,
        data: vec![],
    }
}

#[test]
fn applies_only_commands_in_order() {
    let store = MemoryLogStore::with([command(5), noop(6), command(7), noop(8), command(9)]);
    let mut fsm = FakeStateMachine::new();

    let stats = replay(&store, IndexRange::new(5, 9), &mut fsm).unwrap();

    assert_eq!(fsm.applied(), vec![5, 7, 9]);
    assert_eq!(
        stats,
        ReplayStats {
            applied: 3,
            skipped: 2,
            last_applied: Some(9),
        }
    );
}

#[test]
fn empty_range_applies_nothing() {
    let store = MemoryLogStore::default();
    let mut fsm = FakeStateMachine::new();

    let stats = replay(&store, IndexRange::new(0, 0), &mut fsm).unwrap();

    assert!(fsm.calls().is_empty());
    assert_eq!(stats, ReplayStats::default());
}

#[test]
fn range_bounds_are_respected() {
    let store = MemoryLogStore::with((1..=10).map(command));
    let mut fsm = FakeStateMachine::new();

    replay(&store, IndexRange::new(4, 6), &mut fsm).unwrap();

    assert_eq!(fsm.applied(), vec![4, 5, 6]);
}

#[test]
fn missing_entry_is_fatal() {
    let store = MemoryLogStore::with([command(1), command(2), command(4)]);
    let mut fsm = FakeStateMachine::new();

    let err = replay(&store, IndexRange::new(1, 4), &mut fsm).unwrap_err();

    assert!(matches!(
        err,
        ReplayError::Read {
            index: 3,
            source: LogStoreError::MissingEntry { index: 3 }
        }
    ));
    assert_eq!(err.to_string(), "failed to read log entry at index 3: log entry 3 not found");
    // nothing past the gap was applied
    assert_eq!(fsm.applied(), vec![1, 2]);
}

#[test]
fn apply_failure_is_fatal() {
    let store = MemoryLogStore::with((1..=5).map(command));
    let mut fsm = FakeStateMachine::new();
    fsm.fail_apply_at(3);

    let err = replay(&store, IndexRange::new(1, 5), &mut fsm).unwrap_err();

    assert!(matches!(
        err,
        ReplayError::Apply {
            index: 3,
            source: ApplyError::UnknownCommand { index: 3, .. }
        }
    ));
    assert_eq!(fsm.applied(), vec![1, 2, 3]);
}

#[test]
fn replays_from_file_store() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("raft.log");
    let mut writer = LogWriter::create(&path).unwrap();
    for log in [noop(1), command(2), command(3)] {
        writer.append(&log).unwrap();
    }
    let store = FileLogStore::open(&path).unwrap();
    let mut fsm = FakeStateMachine::new();

    let range = store.index_range().unwrap();
    let stats = replay(&store, range, &mut fsm).unwrap();

    assert_eq!(fsm.applied(), vec![2, 3]);
    assert_eq!(stats.skipped, 1);
}
