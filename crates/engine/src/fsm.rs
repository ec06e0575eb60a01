// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! State machine seam used by restore and replay

use crate::error::{ApplyError, RestoreError};
use rdbg_core::{Document, RawLog};
use std::collections::BTreeMap;
use std::io::Read;

/// Named collections of a state machine, each in iteration order
pub type StateCollections = BTreeMap<&'static str, Vec<Document>>;

/// Construction parameters for a state machine
#[derive(Debug, Clone)]
pub struct FsmConfig {
    /// Region stamped on jobs that do not carry one
    pub region: String,
}

impl Default for FsmConfig {
    fn default() -> Self {
        Self {
            region: "default".to_string(),
        }
    }
}

/// A replicated state machine driven offline
///
/// Resources are released on drop.
pub trait StateMachine {
    /// Replace current state with the contents of a snapshot stream
    fn restore(&mut self, source: &mut dyn Read) -> Result<(), RestoreError>;

    /// Apply one command entry
    fn apply(&mut self, log: &RawLog) -> Result<(), ApplyError>;

    fn state(&self) -> StateCollections;
}
