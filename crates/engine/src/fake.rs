// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recording state machine for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use crate::error::{ApplyError, RestoreError};
use crate::fsm::{StateCollections, StateMachine};
use rdbg_core::{Document, RawLog};
use std::collections::HashSet;
use std::io::Read;
use std::sync::{Arc, Mutex};

/// Recorded state machine call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FsmCall {
    Restore { data: Vec<u8> },
    Apply { index: u64, term: u64 },
}

/// Fake state machine that records every call
///
/// Restores whose stream starts with [`FakeStateMachine::REJECT`] fail, as
/// do applies at indexes registered with [`FakeStateMachine::fail_apply_at`].
#[derive(Debug, Clone, Default)]
pub struct FakeStateMachine {
    calls: Arc<Mutex<Vec<FsmCall>>>,
    failing: Arc<Mutex<HashSet<u64>>>,
}

impl FakeStateMachine {
    pub const REJECT: &'static [u8] = b"reject";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_apply_at(&self, index: u64) {
        self.failing
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(index);
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<FsmCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Indexes passed to apply, in call order
    pub fn applied(&self) -> Vec<u64> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                FsmCall::Apply { index, .. } => Some(index),
                FsmCall::Restore { .. } => None,
            })
            .collect()
    }

    fn record(&self, call: FsmCall) {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(call);
    }
}

impl StateMachine for FakeStateMachine {
    fn restore(&mut self, source: &mut dyn Read) -> Result<(), RestoreError> {
        let mut data = Vec::new();
        source.read_to_end(&mut data)?;
        let rejected = data.starts_with(Self::REJECT);
        self.record(FsmCall::Restore { data });
        if rejected {
            return Err(RestoreError::UnknownRecordType(0xff));
        }
        Ok(())
    }

    fn apply(&mut self, log: &RawLog) -> Result<(), ApplyError> {
        self.record(FsmCall::Apply {
            index: log.index,
            term: log.term,
        });
        let failing = self
            .failing
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&log.index);
        if failing {
            return Err(ApplyError::UnknownCommand {
                index: log.index,
                tag: log.data.first().copied().unwrap_or(0),
            });
        }
        Ok(())
    }

    fn state(&self) -> StateCollections {
        let applied = self.applied().into_iter().map(Document::from).collect();
        StateCollections::from([("Applied", applied)])
    }
}
