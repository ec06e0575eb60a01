// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Body decoders keyed by message type
//!
//! Most command bodies decode generically into a [`Document`]. Bodies whose
//! generic form has no JSON rendering register a typed decoder here that
//! reshapes them.

use crate::document::{Document, DocumentError};
use crate::message_type::MessageType;
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;

/// Decoder for one message type's body
pub type BodyDecodeFn = fn(&[u8]) -> Result<Document, DocumentError>;

/// Table of typed body decoders with a generic fallback
#[derive(Clone)]
pub struct BodyDecoders {
    typed: HashMap<MessageType, BodyDecodeFn>,
}

impl Default for BodyDecoders {
    fn default() -> Self {
        let mut decoders = Self::generic_only();
        decoders.register(MessageType::JobBatchDeregister, decode_job_batch_deregister);
        decoders
    }
}

impl BodyDecoders {
    /// A table with no typed decoders
    pub fn generic_only() -> Self {
        Self {
            typed: HashMap::new(),
        }
    }

    /// Register (or replace) the decoder for a message type
    pub fn register(&mut self, message_type: MessageType, decoder: BodyDecodeFn) {
        self.typed.insert(message_type, decoder);
    }

    /// Decode a body, using the typed decoder for the message type if any
    pub fn decode(
        &self,
        message_type: Option<MessageType>,
        raw: &[u8],
    ) -> Result<Document, DocumentError> {
        match message_type.and_then(|mt| self.typed.get(&mt)) {
            Some(decoder) => decoder(raw),
            None => Document::from_msgpack(raw),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct JobBatchDeregisterRequest {
    #[serde(default)]
    jobs: Option<NamespacedJobs>,
    #[serde(default)]
    evals: Option<Vec<Document>>,
    #[serde(default)]
    region: String,
    #[serde(default)]
    namespace: String,
    #[serde(default)]
    auth_token: String,
    #[serde(default)]
    idempotency_token: String,
}

#[derive(Debug, Deserialize)]
struct NamespacedId {
    #[serde(rename = "ID", default)]
    id: String,
    #[serde(rename = "Namespace", default)]
    namespace: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct JobDeregisterOptions {
    #[serde(default)]
    purge: bool,
    #[serde(default)]
    global: bool,
    #[serde(default)]
    eval_priority: i64,
    #[serde(default)]
    no_shutdown_delay: bool,
}

impl JobDeregisterOptions {
    fn into_document(self) -> Document {
        Document::map([
            ("Purge", Document::Bool(self.purge)),
            ("Global", Document::Bool(self.global)),
            ("EvalPriority", Document::Int(self.eval_priority)),
            ("NoShutdownDelay", Document::Bool(self.no_shutdown_delay)),
        ])
    }
}

/// Job map keyed by `{ID, Namespace}` structs
#[derive(Debug, Default)]
struct NamespacedJobs(Vec<(NamespacedId, Option<JobDeregisterOptions>)>);

impl<'de> Deserialize<'de> for NamespacedJobs {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct JobsVisitor;

        impl<'de> Visitor<'de> for JobsVisitor {
            type Value = NamespacedJobs;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map keyed by namespaced job IDs")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut jobs = Vec::new();
                while let Some(entry) = access.next_entry()? {
                    jobs.push(entry);
                }
                Ok(NamespacedJobs(jobs))
            }
        }

        deserializer.deserialize_map(JobsVisitor)
    }
}

/// Decode a batch deregistration, keying jobs by `"<namespace>.<id>"`
pub fn decode_job_batch_deregister(raw: &[u8]) -> Result<Document, DocumentError> {
    let request: JobBatchDeregisterRequest = rmp_serde::from_slice(raw)?;

    let jobs = request
        .jobs
        .unwrap_or_default()
        .0
        .into_iter()
        .map(|(key, options)| {
            let options = options.map_or(Document::Null, JobDeregisterOptions::into_document);
            (format!("{}.{}", key.namespace, key.id), options)
        });

    Ok(Document::map([
        ("Jobs", Document::map(jobs)),
        (
            "Evals",
            request.evals.map_or(Document::Null, Document::Seq),
        ),
        ("Region", Document::String(request.region)),
        ("Namespace", Document::String(request.namespace)),
        ("AuthToken", Document::String(request.auth_token)),
        ("IdempotencyToken", Document::String(request.idempotency_token)),
    ]))
}

#[cfg(test)]
#[path = "body_tests.rs"]
mod tests;
