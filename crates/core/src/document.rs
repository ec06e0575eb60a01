// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Schema-less document model for msgpack payloads
//!
//! Log bodies are decoded without knowing the request struct they were
//! encoded from. A [`Document`] keeps enough structure to render them as
//! JSON and to walk them for post-processing (see [`crate::timestamp`]).

use chrono::{DateTime, FixedOffset, SecondsFormat};
use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Errors from decoding a document
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("msgpack decode error: {0}")]
    Msgpack(#[from] rmp_serde::decode::Error),
}

/// A dynamic, JSON-representable value
#[derive(Debug, Clone, PartialEq)]
pub enum Document {
    Null,
    Bool(bool),
    Int(i64),
    /// Only used for values above `i64::MAX`
    Uint(u64),
    Float(f64),
    String(String),
    /// Raw string that is not valid UTF-8
    Bytes(Vec<u8>),
    Seq(Vec<Document>),
    Map(BTreeMap<String, Document>),
    Timestamp(DateTime<FixedOffset>),
}

impl Document {
    /// Decode a single msgpack value
    pub fn from_msgpack(raw: &[u8]) -> Result<Self, DocumentError> {
        Ok(rmp_serde::from_slice(raw)?)
    }

    /// Build a map document from key/value pairs
    pub fn map<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Document)>,
    {
        Document::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Look up a key when this is a map
    pub fn get(&self, key: &str) -> Option<&Document> {
        match self {
            Document::Map(map) => map.get(key),
            _ => None,
        }
    }

    /// Mutable key lookup when this is a map
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Document> {
        match self {
            Document::Map(map) => map.get_mut(key),
            _ => None,
        }
    }

    /// Insert a key when this is a map; no-op otherwise
    pub fn insert(&mut self, key: impl Into<String>, value: Document) {
        if let Document::Map(map) = self {
            map.insert(key.into(), value);
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Document::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Document::Int(v) => u64::try_from(*v).ok(),
            Document::Uint(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Document::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_seq(&self) -> Option<&[Document]> {
        match self {
            Document::Seq(items) => Some(items),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Document::Null)
    }

    /// String field of a map, treating empty strings as absent
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.get(key)
            .and_then(Document::as_str)
            .filter(|s| !s.is_empty())
    }
}

impl From<&str> for Document {
    fn from(value: &str) -> Self {
        Document::String(value.to_string())
    }
}

impl From<String> for Document {
    fn from(value: String) -> Self {
        Document::String(value)
    }
}

impl From<bool> for Document {
    fn from(value: bool) -> Self {
        Document::Bool(value)
    }
}

impl From<i64> for Document {
    fn from(value: i64) -> Self {
        Document::Int(value)
    }
}

impl From<u64> for Document {
    fn from(value: u64) -> Self {
        match i64::try_from(value) {
            Ok(v) => Document::Int(v),
            Err(_) => Document::Uint(value),
        }
    }
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Document::Null => serializer.serialize_unit(),
            Document::Bool(b) => serializer.serialize_bool(*b),
            Document::Int(v) => serializer.serialize_i64(*v),
            Document::Uint(v) => serializer.serialize_u64(*v),
            Document::Float(v) => serializer.serialize_f64(*v),
            Document::String(s) => serializer.serialize_str(s),
            Document::Bytes(raw) => serializer.serialize_str(&String::from_utf8_lossy(raw)),
            Document::Seq(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Document::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (k, v) in entries {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
            Document::Timestamp(t) => {
                serializer.serialize_str(&t.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
        }
    }
}

impl<'de> Deserialize<'de> for Document {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(DocumentVisitor)
    }
}

struct DocumentVisitor;

impl<'de> Visitor<'de> for DocumentVisitor {
    type Value = Document;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("any msgpack value")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Document, E> {
        Ok(Document::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Document, E> {
        Ok(Document::Int(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Document, E> {
        Ok(Document::from(v))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Document, E> {
        Ok(Document::Float(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Document, E> {
        Ok(Document::String(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Document, E> {
        Ok(Document::String(v))
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Document, E> {
        self.visit_byte_buf(v.to_vec())
    }

    fn visit_byte_buf<E: de::Error>(self, v: Vec<u8>) -> Result<Document, E> {
        Ok(match String::from_utf8(v) {
            Ok(s) => Document::String(s),
            Err(e) => Document::Bytes(e.into_bytes()),
        })
    }

    fn visit_none<E: de::Error>(self) -> Result<Document, E> {
        Ok(Document::Null)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Document, E> {
        Ok(Document::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Document, D::Error> {
        Document::deserialize(deserializer)
    }

    // msgpack extension values arrive as (tag, bytes) newtypes
    fn visit_newtype_struct<D: Deserializer<'de>>(
        self,
        deserializer: D,
    ) -> Result<Document, D::Error> {
        Document::deserialize(deserializer)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Document, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0).min(1024));
        while let Some(item) = seq.next_element::<Document>()? {
            items.push(item);
        }
        Ok(Document::Seq(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Document, A::Error> {
        let mut map = BTreeMap::new();
        while let Some((key, value)) = access.next_entry::<MapKey, Document>()? {
            map.insert(key.0, value);
        }
        Ok(Document::Map(map))
    }
}

/// Map key restricted to scalars
///
/// Composite keys (maps or sequences) have no string form and are
/// rejected, so bodies keyed by structs need a typed decoder.
struct MapKey(String);

impl<'de> Deserialize<'de> for MapKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let key = match Document::deserialize(deserializer)? {
            Document::String(s) => s,
            Document::Bytes(raw) => String::from_utf8_lossy(&raw).into_owned(),
            Document::Int(v) => v.to_string(),
            Document::Uint(v) => v.to_string(),
            Document::Bool(b) => b.to_string(),
            Document::Float(v) => v.to_string(),
            Document::Null => String::new(),
            Document::Seq(_) | Document::Map(_) | Document::Timestamp(_) => {
                return Err(de::Error::custom("map key must be a scalar"));
            }
        };
        Ok(MapKey(key))
    }
}

#[cfg(test)]
#[path = "document_tests.rs"]
mod tests;
