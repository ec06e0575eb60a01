// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Builder for snapshot state streams, used by fixtures
#![cfg_attr(coverage_nightly, coverage(off))]

use crate::cluster::SnapshotRecord;
use serde::Serialize;

/// Accumulates a header and typed records in the snapshot stream format
pub struct SnapshotStateBuilder {
    data: Vec<u8>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct Header {
    last_index: u64,
}

impl SnapshotStateBuilder {
    pub fn new(last_index: u64) -> Result<Self, rmp_serde::encode::Error> {
        let data = rmp_serde::to_vec_named(&Header { last_index })?;
        Ok(Self { data })
    }

    pub fn record(
        mut self,
        record: SnapshotRecord,
        value: &impl Serialize,
    ) -> Result<Self, rmp_serde::encode::Error> {
        self.data.push(record as u8);
        self.data.extend(rmp_serde::to_vec_named(value)?);
        Ok(self)
    }

    /// Raw record type byte and payload, for malformed fixtures
    pub fn raw(mut self, record_type: u8, payload: &[u8]) -> Self {
        self.data.push(record_type);
        self.data.extend_from_slice(payload);
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.data
    }
}
