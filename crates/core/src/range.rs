// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Index range resolution for dumping and replay

use std::ops::RangeInclusive;
use thiserror::Error;

/// Errors from resolving the replay range
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RangeError {
    #[error("missing logs after snapshot [{from},{to}]")]
    MissingLogs { from: u64, to: u64 },
    #[error("snapshot index {index} leaves no room for log entries")]
    SnapshotIndexOverflow { index: u64 },
}

/// Closed interval of log indexes
///
/// A store with no entries reports `last == 0`, which yields no indexes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexRange {
    pub first: u64,
    pub last: u64,
}

impl IndexRange {
    pub fn new(first: u64, last: u64) -> Self {
        Self { first, last }
    }

    pub fn is_empty(&self) -> bool {
        self.last == 0 || self.first > self.last
    }

    /// Number of indexes in the range
    pub fn len(&self) -> u64 {
        if self.is_empty() {
            0
        } else {
            self.last - self.first + 1
        }
    }

    /// Iterate indexes in ascending order
    pub fn indexes(&self) -> RangeInclusive<u64> {
        if self.is_empty() {
            // canonical empty inclusive range
            1..=0
        } else {
            self.first..=self.last
        }
    }

    /// Apply a user-supplied last index override
    pub fn with_last_override(self, last_override: i64) -> Self {
        Self {
            first: self.first,
            last: resolve_last_index(self.last, last_override),
        }
    }

    /// Move the first index past a restored snapshot
    pub fn after_snapshot(self, snapshot_index: u64) -> Result<Self, RangeError> {
        Ok(Self {
            first: resolve_first_index(self.first, snapshot_index)?,
            last: self.last,
        })
    }
}

/// Effective last index given a signed override
///
/// Zero keeps the store's last index, a positive value is an absolute
/// index clamped to the store, and a negative value is an offset back from
/// the store's last index, clamped at zero.
pub fn resolve_last_index(store_last: u64, last_override: i64) -> u64 {
    match last_override {
        0 => store_last,
        n if n > 0 => store_last.min(n.unsigned_abs()),
        n => store_last.saturating_sub(n.unsigned_abs()),
    }
}

/// Effective first index after restoring a snapshot at `snapshot_index`
///
/// A snapshot index of zero means no snapshot was restored, so the log has
/// to start at index 1. The log must retain every entry after the
/// snapshot, otherwise replay would silently produce wrong state.
pub fn resolve_first_index(log_first: u64, snapshot_index: u64) -> Result<u64, RangeError> {
    let after_snapshot = snapshot_index
        .checked_add(1)
        .ok_or(RangeError::SnapshotIndexOverflow {
            index: snapshot_index,
        })?;
    if after_snapshot < log_first {
        return Err(RangeError::MissingLogs {
            from: after_snapshot,
            to: log_first - 1,
        });
    }
    if snapshot_index > 0 {
        Ok(after_snapshot)
    } else {
        Ok(log_first)
    }
}

#[cfg(test)]
#[path = "range_tests.rs"]
mod tests;
