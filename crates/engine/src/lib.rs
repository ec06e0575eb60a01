// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Snapshot restore and log replay against a state machine, plus decoding
//! of client allocation state

mod client;
mod cluster;
mod error;
mod fsm;
mod replay;
mod restore;
pub mod state;

pub use client::{read_client_state, ClientAllocState, ClientStateError, ClientTaskState};
pub use cluster::{ClusterStateMachine, SnapshotRecord};
pub use error::{ApplyError, ReplayError, RestoreError, SnapshotRestoreError};
pub use fsm::{FsmConfig, StateCollections, StateMachine};
pub use replay::{replay, ReplayStats};
pub use restore::{restore_from_snapshot, restored_index};
pub use state::ClusterState;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
mod snapshot_state;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeStateMachine, FsmCall};
#[cfg(any(test, feature = "test-support"))]
pub use snapshot_state::SnapshotStateBuilder;
