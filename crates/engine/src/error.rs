// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for restore, apply and replay

use rdbg_core::{DecodeError, DocumentError};
use rdbg_storage::{LogStoreError, SnapshotError};
use thiserror::Error;

/// Errors from applying one command to a state machine
#[derive(Debug, Error)]
pub enum ApplyError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("unrecognized command type {tag} at index {index}")]
    UnknownCommand { index: u64, tag: u8 },
    #[error("{command} at index {index} is missing {field}")]
    MissingField {
        index: u64,
        command: &'static str,
        field: &'static str,
    },
}

/// Errors from restoring a state machine from a snapshot stream
#[derive(Debug, Error)]
pub enum RestoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to decode snapshot: {0}")]
    Decode(#[from] DocumentError),
    #[error("unrecognized snapshot record type {0}")]
    UnknownRecordType(u8),
    #[error("{record} record is missing {field}")]
    MissingKey {
        record: &'static str,
        field: &'static str,
    },
}

impl From<rmp_serde::decode::Error> for RestoreError {
    fn from(e: rmp_serde::decode::Error) -> Self {
        RestoreError::Decode(DocumentError::Msgpack(e))
    }
}

/// Per-snapshot failure seen by the restorer
#[derive(Debug, Error)]
pub enum SnapshotRestoreError {
    #[error(transparent)]
    Open(#[from] SnapshotError),
    #[error(transparent)]
    Restore(#[from] RestoreError),
}

/// Fatal errors from replaying the log
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("failed to read log entry at index {index}: {source}")]
    Read {
        index: u64,
        #[source]
        source: LogStoreError,
    },
    #[error("failed to apply log entry at index {index}: {source}")]
    Apply {
        index: u64,
        #[source]
        source: ApplyError,
    },
}
