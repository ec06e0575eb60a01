// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! rdbg-core: decoding primitives for offline raft log inspection
//!
//! This crate provides:
//! - A schema-less [`Document`] model for msgpack payloads
//! - Timestamp recovery for times that were encoded as raw strings
//! - The command-type registry and the per-entry [`LogDecoder`]
//! - Index range resolution for replay

pub mod body;
pub mod document;
pub mod entry;
pub mod message_type;
pub mod range;
pub mod timestamp;

pub use body::{BodyDecodeFn, BodyDecoders};
pub use document::{Document, DocumentError};
pub use entry::{
    CommandTag, DecodeError, LogDecoder, LogEntry, LogKind, RawLog, FAILED_TO_DECODE_DATA,
};
pub use message_type::{MessageType, IGNORE_UNKNOWN_TYPE_FLAG};
pub use range::{resolve_first_index, resolve_last_index, IndexRange, RangeError};
pub use timestamp::{recover_timestamps, TimestampError};
