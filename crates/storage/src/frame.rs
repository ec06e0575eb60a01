// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! On-disk frame layout of the raft log
//!
//! ```text
//! [len: u32 BE][crc32: u32 BE][index: u64 BE][term: u64 BE][type: u8][data...]
//! ```
//!
//! `len` counts the bytes after the checksum; the checksum covers exactly
//! those bytes.

use rdbg_core::RawLog;
use std::io::{self, Read};

/// Length prefix plus checksum
pub(crate) const HEADER_LEN: usize = 8;

/// Index, term and type that precede the data
pub(crate) const FIXED_BODY_LEN: usize = 17;

/// Refuse frames larger than this rather than allocating for garbage lengths
pub(crate) const MAX_FRAME_LEN: usize = 256 * 1024 * 1024;

/// Why a frame could not be read
#[derive(Debug)]
pub(crate) enum FrameFault {
    /// Clean end of file on a frame boundary
    Eof,
    /// File ends partway through a frame
    Torn,
    /// Length prefix is out of range
    BadLength(usize),
    ChecksumMismatch,
    Io(io::Error),
}

impl FrameFault {
    pub(crate) fn reason(&self) -> String {
        match self {
            FrameFault::Eof => "end of file".to_string(),
            FrameFault::Torn => "truncated frame".to_string(),
            FrameFault::BadLength(len) => format!("invalid frame length {len}"),
            FrameFault::ChecksumMismatch => "checksum mismatch".to_string(),
            FrameFault::Io(e) => e.to_string(),
        }
    }
}

pub(crate) fn encode(log: &RawLog) -> Vec<u8> {
    let body_len = FIXED_BODY_LEN + log.data.len();
    let mut body = Vec::with_capacity(body_len);
    body.extend_from_slice(&log.index.to_be_bytes());
    body.extend_from_slice(&log.term.to_be_bytes());
    body.push(log.log_type);
    body.extend_from_slice(&log.data);

    let mut frame = Vec::with_capacity(HEADER_LEN + body_len);
    frame.extend_from_slice(&(body_len as u32).to_be_bytes());
    frame.extend_from_slice(&crc32fast::hash(&body).to_be_bytes());
    frame.extend_from_slice(&body);
    frame
}

/// Read one frame body, verifying its checksum
///
/// Returns the verified bytes after the header.
pub(crate) fn read_body(reader: &mut impl Read) -> Result<Vec<u8>, FrameFault> {
    let mut header = [0u8; HEADER_LEN];
    match read_full(reader, &mut header)? {
        0 => return Err(FrameFault::Eof),
        n if n < HEADER_LEN => return Err(FrameFault::Torn),
        _ => {}
    }

    let len = u32::from_be_bytes([header[0], header[1], header[2], header[3]]) as usize;
    let crc = u32::from_be_bytes([header[4], header[5], header[6], header[7]]);
    if !(FIXED_BODY_LEN..=MAX_FRAME_LEN).contains(&len) {
        return Err(FrameFault::BadLength(len));
    }

    let mut body = vec![0u8; len];
    if read_full(reader, &mut body)? < len {
        return Err(FrameFault::Torn);
    }
    if crc32fast::hash(&body) != crc {
        return Err(FrameFault::ChecksumMismatch);
    }
    Ok(body)
}

/// Index of a verified body without copying its data
pub(crate) fn body_index(body: &[u8]) -> u64 {
    let mut word = [0u8; 8];
    word.copy_from_slice(&body[0..8]);
    u64::from_be_bytes(word)
}

/// Split a verified body into a record
pub(crate) fn parse_body(mut body: Vec<u8>) -> RawLog {
    let mut word = [0u8; 8];
    word.copy_from_slice(&body[0..8]);
    let index = u64::from_be_bytes(word);
    word.copy_from_slice(&body[8..16]);
    let term = u64::from_be_bytes(word);
    let log_type = body[16];
    let data = body.split_off(FIXED_BODY_LEN);
    RawLog {
        index,
        term,
        log_type,
        data,
    }
}

/// Fill `buf` as far as the reader allows, returning the bytes read
fn read_full(reader: &mut impl Read, buf: &mut [u8]) -> Result<usize, FrameFault> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(FrameFault::Io(e)),
        }
    }
    Ok(filled)
}
