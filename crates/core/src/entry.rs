// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Raw log records and their decoded form
//!
//! A [`RawLog`] is what the log store hands back for one index. The
//! [`LogDecoder`] turns it into a [`LogEntry`] suitable for JSON output.
//! Body decode failures never escape [`LogDecoder::decode`]; they are
//! recorded in the entry as [`FAILED_TO_DECODE_DATA`].

use crate::body::BodyDecoders;
use crate::document::{Document, DocumentError};
use crate::message_type::{tag_name, MessageType, IGNORE_UNKNOWN_TYPE_FLAG};
use crate::timestamp::recover_timestamps;
use serde::{Serialize, Serializer};
use std::borrow::Cow;
use std::fmt;
use thiserror::Error;

/// Body placed in an entry whose payload could not be decoded
pub const FAILED_TO_DECODE_DATA: &str = "FAILED TO DECODE DATA";

/// Errors from decoding one log entry
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("command at index {index} did not include data")]
    EmptyCommand { index: u64 },
    #[error("failed to decode body at index {index}: {source}")]
    Body {
        index: u64,
        #[source]
        source: DocumentError,
    },
}

impl DecodeError {
    pub fn index(&self) -> u64 {
        match self {
            DecodeError::EmptyCommand { index } | DecodeError::Body { index, .. } => *index,
        }
    }
}

/// Structural kind of a log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogKind {
    Command,
    Noop,
    AddPeerDeprecated,
    RemovePeerDeprecated,
    Barrier,
    Configuration,
    Unknown(u8),
}

impl LogKind {
    pub const COMMAND: u8 = 0;
    pub const NOOP: u8 = 1;
    pub const ADD_PEER_DEPRECATED: u8 = 2;
    pub const REMOVE_PEER_DEPRECATED: u8 = 3;
    pub const BARRIER: u8 = 4;
    pub const CONFIGURATION: u8 = 5;

    pub fn from_code(code: u8) -> Self {
        match code {
            Self::COMMAND => LogKind::Command,
            Self::NOOP => LogKind::Noop,
            Self::ADD_PEER_DEPRECATED => LogKind::AddPeerDeprecated,
            Self::REMOVE_PEER_DEPRECATED => LogKind::RemovePeerDeprecated,
            Self::BARRIER => LogKind::Barrier,
            Self::CONFIGURATION => LogKind::Configuration,
            other => LogKind::Unknown(other),
        }
    }

    pub fn code(self) -> u8 {
        match self {
            LogKind::Command => Self::COMMAND,
            LogKind::Noop => Self::NOOP,
            LogKind::AddPeerDeprecated => Self::ADD_PEER_DEPRECATED,
            LogKind::RemovePeerDeprecated => Self::REMOVE_PEER_DEPRECATED,
            LogKind::Barrier => Self::BARRIER,
            LogKind::Configuration => Self::CONFIGURATION,
            LogKind::Unknown(code) => code,
        }
    }

    /// Display name; unknown codes render as their decimal value
    pub fn name(self) -> Cow<'static, str> {
        match self {
            LogKind::Command => Cow::Borrowed("LogCommand"),
            LogKind::Noop => Cow::Borrowed("LogNoop"),
            LogKind::AddPeerDeprecated => Cow::Borrowed("LogAddPeerDeprecated"),
            LogKind::RemovePeerDeprecated => Cow::Borrowed("LogRemovePeerDeprecated"),
            LogKind::Barrier => Cow::Borrowed("LogBarrier"),
            LogKind::Configuration => Cow::Borrowed("LogConfiguration"),
            LogKind::Unknown(code) => Cow::Owned(code.to_string()),
        }
    }
}

impl fmt::Display for LogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

impl Serialize for LogKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.name())
    }
}

/// One record as stored in the log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLog {
    pub index: u64,
    pub term: u64,
    pub log_type: u8,
    pub data: Vec<u8>,
}

impl RawLog {
    pub fn kind(&self) -> LogKind {
        LogKind::from_code(self.log_type)
    }

    pub fn is_command(&self) -> bool {
        self.kind() == LogKind::Command
    }

    /// Build a command record from a message type byte and a body
    pub fn command(index: u64, term: u64, tag: u8, body: &[u8]) -> Self {
        let mut data = Vec::with_capacity(body.len() + 1);
        data.push(tag);
        data.extend_from_slice(body);
        Self {
            index,
            term,
            log_type: LogKind::COMMAND,
            data,
        }
    }

    /// Split a command's tag byte from its body
    ///
    /// Returns `Ok(None)` for non-command entries.
    pub fn command_tag(&self) -> Result<Option<(CommandTag, &[u8])>, DecodeError> {
        if !self.is_command() {
            return Ok(None);
        }
        match self.data.split_first() {
            Some((tag, body)) => Ok(Some((CommandTag::from_byte(*tag), body))),
            None => Err(DecodeError::EmptyCommand { index: self.index }),
        }
    }
}

/// Message-type byte of a command, split into tag and flag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandTag {
    /// Tag with the flag bit cleared
    pub tag: u8,
    pub ignore_unknown: bool,
}

impl CommandTag {
    pub fn from_byte(byte: u8) -> Self {
        Self {
            tag: byte & !IGNORE_UNKNOWN_TYPE_FLAG,
            ignore_unknown: byte & IGNORE_UNKNOWN_TYPE_FLAG != 0,
        }
    }

    pub fn message_type(self) -> Option<MessageType> {
        MessageType::from_tag(self.tag)
    }

    pub fn name(self) -> Cow<'static, str> {
        tag_name(self.tag)
    }
}

/// Decoded, JSON-friendly form of a log entry
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct LogEntry {
    #[serde(rename = "LogType")]
    pub kind: LogKind,
    pub term: u64,
    pub index: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignore_unknown_type_flag: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Document>,
}

/// Decodes raw log records into [`LogEntry`] values
#[derive(Clone, Default)]
pub struct LogDecoder {
    bodies: BodyDecoders,
}

impl LogDecoder {
    pub fn new(bodies: BodyDecoders) -> Self {
        Self { bodies }
    }

    /// Decode one entry
    ///
    /// Only an empty command payload is an error. A body that fails to
    /// decode is replaced by [`FAILED_TO_DECODE_DATA`] and logged.
    pub fn decode(&self, log: &RawLog) -> Result<LogEntry, DecodeError> {
        let kind = log.kind();
        let (tag, body) = match log.command_tag()? {
            Some((tag, body)) => (Some(tag), body),
            None => (None, log.data.as_slice()),
        };

        let body = match self.decode_body(log.index, tag, body) {
            Ok(doc) => doc,
            Err(e) => {
                let command_type = tag.map(CommandTag::name).unwrap_or_default();
                tracing::warn!(
                    index = log.index,
                    kind = %kind,
                    command_type = %command_type,
                    error = %e,
                    "failed to decode log entry body"
                );
                Some(Document::from(FAILED_TO_DECODE_DATA))
            }
        };

        Ok(LogEntry {
            kind,
            term: log.term,
            index: log.index,
            command_type: tag.map(|t| t.name().into_owned()),
            ignore_unknown_type_flag: tag.map(|t| t.ignore_unknown),
            body,
        })
    }

    /// Decode a body with timestamp recovery applied; `None` when empty
    pub fn decode_body(
        &self,
        index: u64,
        tag: Option<CommandTag>,
        raw: &[u8],
    ) -> Result<Option<Document>, DecodeError> {
        if raw.is_empty() {
            return Ok(None);
        }
        let mut doc = self
            .bodies
            .decode(tag.and_then(CommandTag::message_type), raw)
            .map_err(|source| DecodeError::Body { index, source })?;
        recover_timestamps(&mut doc);
        Ok(Some(doc))
    }
}

#[cfg(test)]
#[path = "entry_tests.rs"]
mod tests;
