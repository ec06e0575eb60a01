// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Timestamp recovery for schema-less documents
//!
//! The cluster's codec writes time values through their binary marshaling
//! form, which lands in msgpack as an ordinary raw string. Once a body is
//! decoded without a schema those strings look like any other field.
//! [`recover_timestamps`] re-decodes raw strings of exactly the encoded
//! time length.
//!
//! The check is lossy: a raw string that happens to have the right length
//! and a valid encoding is reinterpreted as a time. The decoder has no
//! schema at this layer, so this is accepted.

use crate::document::Document;
use chrono::{DateTime, FixedOffset, Utc};
use std::sync::LazyLock;
use thiserror::Error;

/// Seconds between 0001-01-01T00:00:00Z and the Unix epoch
const SECONDS_TO_UNIX: i64 = 62_135_596_800;

/// Offset marker for UTC in the binary form
const UTC_OFFSET_MARKER: i16 = -1;

const VERSION_V1: u8 = 1;
const VERSION_V2: u8 = 2;

/// Length of an encoded zero time, which is the raw string payload once
/// the one-byte fixstr header is stripped
static ENCODED_LEN: LazyLock<usize> = LazyLock::new(|| encode_binary(None).len());

/// Errors from decoding a binary time value
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TimestampError {
    #[error("bad length: {0}")]
    BadLength(usize),
    #[error("unsupported time encoding version: {0}")]
    UnsupportedVersion(u8),
    #[error("time out of range")]
    OutOfRange,
}

/// Encoded length of a time value
pub fn encoded_len() -> usize {
    *ENCODED_LEN
}

/// Encode a time in its version 1 binary form; `None` encodes the zero time
pub fn encode_binary(value: Option<&DateTime<FixedOffset>>) -> Vec<u8> {
    let (seconds, nanos, offset_min) = match value {
        None => (0i64, 0i32, UTC_OFFSET_MARKER),
        Some(t) => {
            let offset = t.offset().local_minus_utc();
            let offset_min = if offset == 0 {
                UTC_OFFSET_MARKER
            } else {
                (offset / 60) as i16
            };
            (
                t.timestamp() + SECONDS_TO_UNIX,
                t.timestamp_subsec_nanos() as i32,
                offset_min,
            )
        }
    };

    let mut raw = Vec::with_capacity(15);
    raw.push(VERSION_V1);
    raw.extend_from_slice(&seconds.to_be_bytes());
    raw.extend_from_slice(&nanos.to_be_bytes());
    raw.extend_from_slice(&offset_min.to_be_bytes());
    raw
}

/// Decode a binary time value
///
/// Returns `Ok(None)` for the zero time, which means "unset".
pub fn decode_binary(raw: &[u8]) -> Result<Option<DateTime<FixedOffset>>, TimestampError> {
    let version = *raw.first().ok_or(TimestampError::BadLength(0))?;
    let expected = match version {
        VERSION_V1 => 15,
        VERSION_V2 => 16,
        other => return Err(TimestampError::UnsupportedVersion(other)),
    };
    if raw.len() != expected {
        return Err(TimestampError::BadLength(raw.len()));
    }

    let seconds = i64::from_be_bytes(field(raw, 1)?);
    let nanos = i32::from_be_bytes(field(raw, 9)?);
    let offset_min = i16::from_be_bytes(field(raw, 13)?);

    if seconds == 0 && nanos == 0 {
        return Ok(None);
    }

    let mut offset_secs = if offset_min == UTC_OFFSET_MARKER {
        0
    } else {
        i32::from(offset_min) * 60
    };
    if version == VERSION_V2 {
        offset_secs += i32::from(raw[15]);
    }

    let nanos = u32::try_from(nanos).map_err(|_| TimestampError::OutOfRange)?;
    let utc = DateTime::<Utc>::from_timestamp(seconds - SECONDS_TO_UNIX, nanos)
        .ok_or(TimestampError::OutOfRange)?;
    let offset = FixedOffset::east_opt(offset_secs).ok_or(TimestampError::OutOfRange)?;
    Ok(Some(utc.with_timezone(&offset)))
}

fn field<const N: usize>(raw: &[u8], at: usize) -> Result<[u8; N], TimestampError> {
    raw.get(at..at + N)
        .and_then(|s| s.try_into().ok())
        .ok_or(TimestampError::BadLength(raw.len()))
}

/// Replace raw strings that decode as times, in place
///
/// Walks maps and sequences recursively. A recovered zero time becomes
/// [`Document::Null`]; anything that fails the length check or the decode
/// is left as it was.
pub fn recover_timestamps(doc: &mut Document) {
    match doc {
        Document::Map(map) => map.values_mut().for_each(recover_value),
        Document::Seq(items) => items.iter_mut().for_each(recover_value),
        _ => {}
    }
}

fn recover_value(value: &mut Document) {
    let replacement = match value {
        Document::Bytes(raw) => maybe_timestamp(raw),
        Document::String(s) => maybe_timestamp(s.as_bytes()),
        _ => None,
    };
    match replacement {
        Some(recovered) => *value = recovered,
        None => recover_timestamps(value),
    }
}

fn maybe_timestamp(raw: &[u8]) -> Option<Document> {
    if raw.len() != encoded_len() {
        return None;
    }
    match decode_binary(raw) {
        Ok(Some(t)) => Some(Document::Timestamp(t)),
        Ok(None) => Some(Document::Null),
        Err(_) => None,
    }
}

#[cfg(test)]
#[path = "timestamp_tests.rs"]
mod tests;
