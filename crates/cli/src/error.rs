// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! User-friendly error display with context and suggestions.
//!
//! Each error says what went wrong, why it might have happened, and how
//! to recover.

use rdbg_core::RangeError;
use rdbg_engine::{ClientStateError, ReplayError};
use rdbg_storage::{ClientStoreError, LogStoreError, SnapshotError};
use std::fmt;
use std::path::Path;

/// Error with context and recovery suggestions for user-friendly display.
#[derive(Debug)]
pub struct RdbgError {
    /// What went wrong
    pub message: String,
    /// Why it might have happened
    pub context: Vec<String>,
    /// How to fix it
    pub suggestions: Vec<String>,
    /// Original error if any
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl RdbgError {
    /// Create a new error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: Vec::new(),
            suggestions: Vec::new(),
            source: None,
        }
    }

    /// Add context about why this error might have happened.
    pub fn with_context(mut self, ctx: impl Into<String>) -> Self {
        self.context.push(ctx.into());
        self
    }

    /// Add a suggestion for how to fix this error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    /// Set the source error that caused this error.
    pub fn with_source<E: std::error::Error + Send + Sync + 'static>(mut self, source: E) -> Self {
        self.source = Some(Box::new(source));
        self
    }
}

impl fmt::Display for RdbgError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "error: {}", self.message)?;

        if !self.context.is_empty() {
            writeln!(f)?;
            for ctx in &self.context {
                writeln!(f, "  -> {}", ctx)?;
            }
        }

        if !self.suggestions.is_empty() {
            writeln!(f)?;
            writeln!(f, "suggestions:")?;
            for (i, suggestion) in self.suggestions.iter().enumerate() {
                writeln!(f, "  {}. {}", i + 1, suggestion)?;
            }
        }

        Ok(())
    }
}

impl std::error::Error for RdbgError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Builders for the failures a run can end with.
impl RdbgError {
    /// The log store could not be opened.
    pub fn log_store(err: LogStoreError, raft_dir: &Path) -> Self {
        let base = RdbgError::new(format!("failed to open raft logs: {}", err));
        let base = match &err {
            LogStoreError::NotFound(_) => base
                .with_context(format!("no raft.log under {}", raft_dir.display()))
                .with_suggestion("Pass the data directory that contains server/raft"),
            LogStoreError::Locked(_) => base
                .with_context("Another process holds the log store lock")
                .with_suggestion("Stop the server that owns this data directory")
                .with_suggestion("Or copy the data directory and inspect the copy"),
            _ => base.with_context("The log file could not be read"),
        };
        base.with_source(err)
    }

    /// The snapshot directory could not be used.
    pub fn snapshot_store(err: SnapshotError, snapshots_dir: &Path) -> Self {
        RdbgError::new(format!("failed to open snapshot dir: {}", err))
            .with_context(format!("snapshots are read from {}", snapshots_dir.display()))
            .with_source(err)
    }

    /// The log does not continue from the restored snapshot.
    pub fn missing_logs(err: RangeError, snapshot_index: u64) -> Self {
        let base = RdbgError::new(err.to_string());
        let base = if snapshot_index == 0 {
            base.with_context("No snapshot could be restored and the log has been compacted")
        } else {
            base.with_context(format!(
                "The newest usable snapshot ends at index {}",
                snapshot_index
            ))
        };
        base.with_suggestion("Check the snapshot directory for snapshots skipped with warnings")
            .with_suggestion("Run with RUST_LOG=info to see which snapshot was restored")
            .with_source(err)
    }

    /// Replay stopped on a read or apply failure.
    pub fn replay(err: ReplayError) -> Self {
        let base = RdbgError::new(err.to_string());
        let base = match &err {
            ReplayError::Read { index, .. } => base
                .with_context(format!("Entry {} is missing or corrupt", index))
                .with_suggestion(format!(
                    "Stop replay before the damaged entry: --last-index {}",
                    index.saturating_sub(1)
                )),
            ReplayError::Apply { .. } => base
                .with_context("The entry could not be applied to the state machine")
                .with_suggestion("Inspect the entry with: rdbg raft logs <dir>"),
        };
        base.with_source(err)
    }

    /// The client state directory could not be opened.
    pub fn client_store(err: ClientStoreError, client_dir: &Path) -> Self {
        let base = RdbgError::new(format!("failed to open client state: {}", err));
        let base = match &err {
            ClientStoreError::NotFound(_) => base
                .with_context(format!("no client state at {}", client_dir.display()))
                .with_suggestion("Pass the data directory that contains client"),
            _ => base.with_context(format!(
                "client state is read from {}",
                client_dir.display()
            )),
        };
        base.with_source(err)
    }

    /// An allocation's records could not be decoded.
    pub fn client_state(err: ClientStateError) -> Self {
        RdbgError::new(err.to_string())
            .with_context("The client state records are damaged or from an unsupported version")
            .with_source(err)
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
