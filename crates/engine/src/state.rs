// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory cluster state tables
//!
//! Every table is a sorted map so state output is deterministic. Writes go
//! through methods that stamp `CreateIndex`/`ModifyIndex` on records and
//! bump the table's entry in the index table.

use crate::fsm::StateCollections;
use rdbg_core::Document;
use std::collections::BTreeMap;

pub const NODES: &str = "nodes";
pub const JOBS: &str = "jobs";
pub const JOB_VERSION: &str = "job_version";
pub const JOB_SUMMARY: &str = "job_summary";
pub const PERIODIC_LAUNCH: &str = "periodic_launch";
pub const EVALS: &str = "evals";
pub const ALLOCS: &str = "allocs";
pub const DEPLOYMENT: &str = "deployment";
pub const VAULT_ACCESSORS: &str = "vault_accessors";
pub const ACL_POLICY: &str = "acl_policy";
pub const ACL_TOKEN: &str = "acl_token";

/// Versions kept per job; older ones are dropped
pub const JOB_TRACKED_VERSIONS: usize = 6;

pub const DEFAULT_NAMESPACE: &str = "default";

/// Namespace and ID of a namespaced record
pub type NamespacedKey = (String, String);

/// Whole cluster state
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ClusterState {
    pub nodes: BTreeMap<String, Document>,
    pub jobs: BTreeMap<NamespacedKey, Document>,
    pub job_versions: BTreeMap<(String, String, u64), Document>,
    pub job_summaries: BTreeMap<NamespacedKey, Document>,
    pub periodic_launches: BTreeMap<NamespacedKey, Document>,
    pub evals: BTreeMap<String, Document>,
    pub allocs: BTreeMap<String, Document>,
    pub deployments: BTreeMap<String, Document>,
    pub vault_accessors: BTreeMap<String, Document>,
    pub acl_policies: BTreeMap<String, Document>,
    pub acl_tokens: BTreeMap<String, Document>,
    /// Table name to the last index that modified it
    pub indexes: BTreeMap<String, u64>,
}

/// Namespace of a record, defaulting when absent
pub fn namespace_of(record: &Document) -> &str {
    record.str_field("Namespace").unwrap_or(DEFAULT_NAMESPACE)
}

/// Set the raft indexes on a record, keeping an existing create index
fn stamp(mut record: Document, index: u64, existing: Option<&Document>) -> Document {
    let create = existing
        .and_then(|e| e.get("CreateIndex"))
        .and_then(Document::as_u64)
        .unwrap_or(index);
    record.insert("CreateIndex", create.into());
    record.insert("ModifyIndex", index.into());
    record
}

/// Copy the named fields present in `source` onto `target`
pub fn merge_fields(target: &mut Document, source: &Document, fields: &[&str]) {
    for field in fields {
        if let Some(value) = source.get(field) {
            target.insert(*field, value.clone());
        }
    }
}

impl ClusterState {
    pub fn bump(&mut self, table: &str, index: u64) {
        let entry = self.indexes.entry(table.to_string()).or_insert(0);
        *entry = (*entry).max(index);
    }

    pub fn upsert_node(&mut self, index: u64, id: &str, node: Document) {
        let node = stamp(node, index, self.nodes.get(id));
        self.nodes.insert(id.to_string(), node);
        self.bump(NODES, index);
    }

    pub fn delete_node(&mut self, index: u64, id: &str) -> bool {
        let found = self.nodes.remove(id).is_some();
        if found {
            self.bump(NODES, index);
        }
        found
    }

    /// Modify a node in place; false when it does not exist
    pub fn update_node(&mut self, index: u64, id: &str, f: impl FnOnce(&mut Document)) -> bool {
        let Some(node) = self.nodes.get_mut(id) else {
            return false;
        };
        f(node);
        node.insert("ModifyIndex", index.into());
        self.bump(NODES, index);
        true
    }

    /// Insert or replace a job, recording a new version
    pub fn upsert_job(&mut self, index: u64, mut job: Document, id: &str, region: &str) {
        let namespace = namespace_of(&job).to_string();
        let key = (namespace.clone(), id.to_string());
        let existing = self.jobs.get(&key);

        let version = existing
            .and_then(|j| j.get("Version"))
            .and_then(Document::as_u64)
            .map_or(0, |v| v + 1);
        job.insert("Version", version.into());
        job.insert("Namespace", namespace.as_str().into());
        job.insert("JobModifyIndex", index.into());
        if job.str_field("Region").is_none() {
            job.insert("Region", region.into());
        }
        let job = stamp(job, index, existing);

        self.insert_job_version(index, &key, version, job.clone());

        if !self.job_summaries.contains_key(&key) {
            let summary = Document::map([
                ("JobID", Document::from(id)),
                ("Namespace", Document::from(namespace.as_str())),
                ("Summary", Document::map::<String, _>([])),
                ("CreateIndex", index.into()),
                ("ModifyIndex", index.into()),
            ]);
            self.job_summaries.insert(key.clone(), summary);
            self.bump(JOB_SUMMARY, index);
        }

        let periodic = job
            .get("Periodic")
            .and_then(|p| p.get("Enabled"))
            .and_then(Document::as_bool)
            .unwrap_or(false);
        if periodic && !self.periodic_launches.contains_key(&key) {
            let launch = Document::map([
                ("ID", Document::from(id)),
                ("Namespace", Document::from(namespace.as_str())),
                ("Launch", Document::Null),
                ("CreateIndex", index.into()),
                ("ModifyIndex", index.into()),
            ]);
            self.periodic_launches.insert(key.clone(), launch);
            self.bump(PERIODIC_LAUNCH, index);
        }

        self.jobs.insert(key, job);
        self.bump(JOBS, index);
    }

    fn insert_job_version(&mut self, index: u64, key: &NamespacedKey, version: u64, job: Document) {
        let (namespace, id) = key;
        self.job_versions
            .insert((namespace.clone(), id.clone(), version), job);

        let tracked = self.job_version_keys(namespace, id);
        if tracked.len() > JOB_TRACKED_VERSIONS {
            let excess = tracked.len() - JOB_TRACKED_VERSIONS;
            for old in tracked.into_iter().take(excess) {
                self.job_versions.remove(&old);
            }
        }
        self.bump(JOB_VERSION, index);
    }

    /// Version keys of one job, oldest first
    fn job_version_keys(&self, namespace: &str, id: &str) -> Vec<(String, String, u64)> {
        let lower = (namespace.to_string(), id.to_string(), 0);
        let upper = (namespace.to_string(), id.to_string(), u64::MAX);
        self.job_versions
            .range(lower..=upper)
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Remove a job and everything hanging off it
    pub fn purge_job(&mut self, index: u64, namespace: &str, id: &str) -> bool {
        let key = (namespace.to_string(), id.to_string());
        if self.jobs.remove(&key).is_none() {
            return false;
        }
        for version in self.job_version_keys(namespace, id) {
            self.job_versions.remove(&version);
        }
        self.job_summaries.remove(&key);
        self.periodic_launches.remove(&key);
        for table in [JOBS, JOB_VERSION, JOB_SUMMARY, PERIODIC_LAUNCH] {
            self.bump(table, index);
        }
        true
    }

    /// Mark a job stopped, recording a new version
    pub fn stop_job(&mut self, index: u64, namespace: &str, id: &str, region: &str) -> bool {
        let key = (namespace.to_string(), id.to_string());
        let Some(mut job) = self.jobs.get(&key).cloned() else {
            return false;
        };
        job.insert("Stop", true.into());
        self.upsert_job(index, job, id, region);
        true
    }

    pub fn upsert_eval(&mut self, index: u64, id: &str, eval: Document) {
        let eval = stamp(eval, index, self.evals.get(id));
        self.evals.insert(id.to_string(), eval);
        self.bump(EVALS, index);
    }

    pub fn delete_eval(&mut self, index: u64, id: &str) {
        if self.evals.remove(id).is_some() {
            self.bump(EVALS, index);
        }
    }

    pub fn upsert_alloc(&mut self, index: u64, id: &str, mut alloc: Document) {
        alloc.insert("AllocModifyIndex", index.into());
        let alloc = stamp(alloc, index, self.allocs.get(id));
        self.allocs.insert(id.to_string(), alloc);
        self.bump(ALLOCS, index);
    }

    pub fn delete_alloc(&mut self, index: u64, id: &str) {
        if self.allocs.remove(id).is_some() {
            self.bump(ALLOCS, index);
        }
    }

    /// Copy `fields` from a partial alloc onto the stored one
    pub fn merge_alloc(
        &mut self,
        index: u64,
        id: &str,
        partial: &Document,
        fields: &[&str],
    ) -> bool {
        let Some(alloc) = self.allocs.get_mut(id) else {
            return false;
        };
        merge_fields(alloc, partial, fields);
        alloc.insert("ModifyIndex", index.into());
        self.bump(ALLOCS, index);
        true
    }

    pub fn upsert_deployment(&mut self, index: u64, id: &str, deployment: Document) {
        let deployment = stamp(deployment, index, self.deployments.get(id));
        self.deployments.insert(id.to_string(), deployment);
        self.bump(DEPLOYMENT, index);
    }

    pub fn update_deployment_status(
        &mut self,
        index: u64,
        id: &str,
        status: &Document,
        description: &Document,
    ) -> bool {
        let Some(deployment) = self.deployments.get_mut(id) else {
            return false;
        };
        deployment.insert("Status", status.clone());
        deployment.insert("StatusDescription", description.clone());
        deployment.insert("ModifyIndex", index.into());
        self.bump(DEPLOYMENT, index);
        true
    }

    pub fn delete_deployment(&mut self, index: u64, id: &str) {
        if self.deployments.remove(id).is_some() {
            self.bump(DEPLOYMENT, index);
        }
    }

    pub fn upsert_vault_accessor(&mut self, index: u64, accessor: &str, record: Document) {
        let record = stamp(record, index, self.vault_accessors.get(accessor));
        self.vault_accessors.insert(accessor.to_string(), record);
        self.bump(VAULT_ACCESSORS, index);
    }

    pub fn delete_vault_accessor(&mut self, index: u64, accessor: &str) {
        if self.vault_accessors.remove(accessor).is_some() {
            self.bump(VAULT_ACCESSORS, index);
        }
    }

    pub fn upsert_acl_policy(&mut self, index: u64, name: &str, policy: Document) {
        let policy = stamp(policy, index, self.acl_policies.get(name));
        self.acl_policies.insert(name.to_string(), policy);
        self.bump(ACL_POLICY, index);
    }

    pub fn delete_acl_policy(&mut self, index: u64, name: &str) {
        if self.acl_policies.remove(name).is_some() {
            self.bump(ACL_POLICY, index);
        }
    }

    pub fn upsert_acl_token(&mut self, index: u64, accessor_id: &str, token: Document) {
        let token = stamp(token, index, self.acl_tokens.get(accessor_id));
        self.acl_tokens.insert(accessor_id.to_string(), token);
        self.bump(ACL_TOKEN, index);
    }

    pub fn delete_acl_token(&mut self, index: u64, accessor_id: &str) {
        if self.acl_tokens.remove(accessor_id).is_some() {
            self.bump(ACL_TOKEN, index);
        }
    }

    /// Collections keyed by their output names
    pub fn collections(&self) -> StateCollections {
        fn values<K>(table: &BTreeMap<K, Document>) -> Vec<Document> {
            table.values().cloned().collect()
        }

        let indexes = self
            .indexes
            .iter()
            .map(|(table, value)| {
                Document::map([
                    ("Key", Document::from(table.as_str())),
                    ("Value", Document::from(*value)),
                ])
            })
            .collect();

        StateCollections::from([
            ("ACLPolicies", values(&self.acl_policies)),
            ("ACLTokens", values(&self.acl_tokens)),
            ("Allocs", values(&self.allocs)),
            ("Deployments", values(&self.deployments)),
            ("Evals", values(&self.evals)),
            ("Indexes", indexes),
            ("JobSummaries", values(&self.job_summaries)),
            ("JobVersions", values(&self.job_versions)),
            ("Jobs", values(&self.jobs)),
            ("Nodes", values(&self.nodes)),
            ("PeriodicLaunches", values(&self.periodic_launches)),
            ("VaultAccessors", values(&self.vault_accessors)),
        ])
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
