// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI command implementations

pub mod client;
pub mod info;
pub mod logs;
pub mod raft;
pub mod state;
