// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Read-only access to a data directory
//!
//! ```text
//! server/raft/
//!   raft.log              framed log entries (FileLogStore)
//!   snapshots/<id>/       meta.json + state.bin (FileSnapshotStore)
//! client/
//!   allocations/<id>/     per-allocation records (FileClientStore)
//! ```

pub mod client;
mod frame;
pub mod log;
pub mod snapshot;

pub use client::{ClientStateStore, ClientStoreError, FileClientStore, TaskRunnerRecord};
pub use log::{FileLogStore, LogStore, LogStoreError};
pub use snapshot::{FileSnapshotStore, SnapshotError, SnapshotMeta, SnapshotSource, SnapshotStore};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod writer;
#[cfg(any(test, feature = "test-support"))]
pub use writer::{encode_frame, ClientStateWriter, LogWriter, SnapshotWriter};
