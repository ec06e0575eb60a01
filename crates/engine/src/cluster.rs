// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cluster state machine
//!
//! Command bodies go through the same [`LogDecoder`] as the log dump, so
//! timestamps are recovered before they land in state.

use crate::error::{ApplyError, RestoreError};
use crate::fsm::{FsmConfig, StateCollections, StateMachine};
use crate::state::{namespace_of, ClusterState, DEFAULT_NAMESPACE};
use rdbg_core::{recover_timestamps, Document, LogDecoder, MessageType, RawLog};
use std::collections::BTreeMap;
use std::io::{self, Read};

/// Alloc fields a client is allowed to update
const CLIENT_ALLOC_FIELDS: &[&str] = &[
    "ClientStatus",
    "ClientDescription",
    "TaskStates",
    "DeploymentStatus",
    "RescheduleTracker",
    "NetworkStatus",
    "ModifyTime",
];

/// Alloc fields the scheduler changes when stopping or preempting
const DESIRED_ALLOC_FIELDS: &[&str] = &[
    "DesiredStatus",
    "DesiredDescription",
    "ClientStatus",
    "FollowupEvalID",
    "PreemptedByAllocation",
    "ModifyTime",
];

/// Record types in a snapshot stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SnapshotRecord {
    Node = 0,
    Job = 1,
    Index = 2,
    Eval = 3,
    Alloc = 4,
    PeriodicLaunch = 6,
    JobSummary = 7,
    VaultAccessor = 8,
    JobVersion = 9,
    Deployment = 10,
    AclPolicy = 11,
    AclToken = 12,
}

impl SnapshotRecord {
    pub fn from_byte(byte: u8) -> Option<Self> {
        Some(match byte {
            0 => SnapshotRecord::Node,
            1 => SnapshotRecord::Job,
            2 => SnapshotRecord::Index,
            3 => SnapshotRecord::Eval,
            4 => SnapshotRecord::Alloc,
            6 => SnapshotRecord::PeriodicLaunch,
            7 => SnapshotRecord::JobSummary,
            8 => SnapshotRecord::VaultAccessor,
            9 => SnapshotRecord::JobVersion,
            10 => SnapshotRecord::Deployment,
            11 => SnapshotRecord::AclPolicy,
            12 => SnapshotRecord::AclToken,
            _ => return None,
        })
    }

    fn name(self) -> &'static str {
        match self {
            SnapshotRecord::Node => "Node",
            SnapshotRecord::Job => "Job",
            SnapshotRecord::Index => "Index",
            SnapshotRecord::Eval => "Eval",
            SnapshotRecord::Alloc => "Alloc",
            SnapshotRecord::PeriodicLaunch => "PeriodicLaunch",
            SnapshotRecord::JobSummary => "JobSummary",
            SnapshotRecord::VaultAccessor => "VaultAccessor",
            SnapshotRecord::JobVersion => "JobVersion",
            SnapshotRecord::Deployment => "Deployment",
            SnapshotRecord::AclPolicy => "ACLPolicy",
            SnapshotRecord::AclToken => "ACLToken",
        }
    }
}

/// In-memory state machine for cluster commands
pub struct ClusterStateMachine {
    config: FsmConfig,
    decoder: LogDecoder,
    state: ClusterState,
    /// Index in the header of the last restored snapshot
    restored_index: Option<u64>,
    /// Recognized commands without a state model, by type
    unmodelled: BTreeMap<&'static str, u64>,
}

impl ClusterStateMachine {
    pub fn new(config: FsmConfig) -> Self {
        Self {
            config,
            decoder: LogDecoder::default(),
            state: ClusterState::default(),
            restored_index: None,
            unmodelled: BTreeMap::new(),
        }
    }

    pub fn cluster_state(&self) -> &ClusterState {
        &self.state
    }

    pub fn restored_index(&self) -> Option<u64> {
        self.restored_index
    }

    /// Count of applied commands that had no effect on modelled state
    pub fn unmodelled(&self) -> &BTreeMap<&'static str, u64> {
        &self.unmodelled
    }

    fn dispatch(
        &mut self,
        message_type: MessageType,
        req: &Request<'_>,
    ) -> Result<(), ApplyError> {
        let index = req.index;
        let region = self.config.region.as_str();
        let state = &mut self.state;

        match message_type {
            MessageType::NodeRegister => {
                let node = req.field("Node")?;
                let id = req.key(node, "ID")?;
                state.upsert_node(index, id, node.clone());
            }
            MessageType::NodeDeregister | MessageType::NodeBatchDeregister => {
                let mut ids = req.strings("NodeIDs");
                ids.extend(req.body.str_field("NodeID"));
                for id in ids {
                    if !state.delete_node(index, id) {
                        req.not_found("node", id);
                    }
                }
            }
            MessageType::NodeUpdateStatus => {
                let id = req.str("NodeID")?;
                let status = req.field("Status")?.clone();
                let updated_at = req.body.get("UpdatedAt").cloned();
                let found = state.update_node(index, id, |node| {
                    node.insert("Status", status);
                    if let Some(at) = updated_at {
                        node.insert("StatusUpdatedAt", at);
                    }
                });
                if !found {
                    req.not_found("node", id);
                }
            }
            MessageType::NodeUpdateDrain => {
                let id = req.str("NodeID")?;
                let strategy = req
                    .body
                    .get("DrainStrategy")
                    .cloned()
                    .unwrap_or(Document::Null);
                let mark_eligible = req.body.get("MarkEligible").and_then(Document::as_bool);
                let found = state.update_node(index, id, |node| {
                    let draining = !strategy.is_null();
                    node.insert("Drain", draining.into());
                    if draining {
                        node.insert("SchedulingEligibility", "ineligible".into());
                    } else if mark_eligible == Some(true) {
                        node.insert("SchedulingEligibility", "eligible".into());
                    }
                    node.insert("DrainStrategy", strategy);
                });
                if !found {
                    req.not_found("node", id);
                }
            }
            MessageType::NodeUpdateEligibility => {
                let id = req.str("NodeID")?;
                let eligibility = req.field("Eligibility")?.clone();
                let found = state.update_node(index, id, |node| {
                    node.insert("SchedulingEligibility", eligibility);
                });
                if !found {
                    req.not_found("node", id);
                }
            }
            MessageType::JobRegister => {
                let job = req.field("Job")?;
                let id = req.key(job, "ID")?;
                state.upsert_job(index, job.clone(), id, region);
                upsert_optional_eval(state, req)?;
            }
            MessageType::JobDeregister => {
                let id = req.str("JobID")?;
                let namespace = namespace_of(req.body);
                let purge = req
                    .body
                    .get("Purge")
                    .and_then(Document::as_bool)
                    .unwrap_or(false);
                deregister_job(state, req, namespace, id, purge, region);
                upsert_optional_eval(state, req)?;
            }
            MessageType::JobBatchDeregister => {
                if let Some(Document::Map(jobs)) = req.body.get("Jobs") {
                    for (key, options) in jobs {
                        // namespaces cannot contain dots
                        let Some((namespace, id)) = key.split_once('.') else {
                            return Err(req.missing("Jobs"));
                        };
                        let namespace = if namespace.is_empty() {
                            DEFAULT_NAMESPACE
                        } else {
                            namespace
                        };
                        let purge = options
                            .get("Purge")
                            .and_then(Document::as_bool)
                            .unwrap_or(false);
                        deregister_job(state, req, namespace, id, purge, region);
                    }
                }
                upsert_evals(state, req, "Evals")?;
            }
            MessageType::EvalUpdate => upsert_evals(state, req, "Evals")?,
            MessageType::EvalDelete => {
                for id in req.strings("Evals") {
                    state.delete_eval(index, id);
                }
                for id in req.strings("Allocs") {
                    state.delete_alloc(index, id);
                }
            }
            MessageType::AllocUpdate => {
                upsert_allocs(state, req, "Alloc")?;
                upsert_evals(state, req, "Evals")?;
            }
            MessageType::AllocClientUpdate => {
                for alloc in req.seq("Alloc") {
                    let id = req.key(alloc, "ID")?;
                    if !state.merge_alloc(index, id, alloc, CLIENT_ALLOC_FIELDS) {
                        req.not_found("alloc", id);
                    }
                }
                upsert_evals(state, req, "Evals")?;
            }
            MessageType::AllocUpdateDesiredTransition => {
                if let Some(Document::Map(transitions)) = req.body.get("Allocs") {
                    for (id, transition) in transitions {
                        let partial = Document::map([("DesiredTransition", transition.clone())]);
                        if !state.merge_alloc(index, id, &partial, &["DesiredTransition"]) {
                            req.not_found("alloc", id);
                        }
                    }
                }
                upsert_evals(state, req, "Evals")?;
            }
            MessageType::ApplyPlanResults => {
                upsert_allocs(state, req, "Alloc")?;
                upsert_allocs(state, req, "AllocsUpdated")?;
                for field in ["AllocsStopped", "AllocsPreempted", "NodePreemptions"] {
                    for alloc in req.seq(field) {
                        let id = req.key(alloc, "ID")?;
                        if !state.merge_alloc(index, id, alloc, DESIRED_ALLOC_FIELDS) {
                            req.not_found("alloc", id);
                        }
                    }
                }
                if let Some(deployment) = req.opt("Deployment") {
                    let id = req.key(deployment, "ID")?;
                    state.upsert_deployment(index, id, deployment.clone());
                }
                for update in req.seq("DeploymentUpdates") {
                    update_deployment_status(state, req, update)?;
                }
                upsert_evals(state, req, "PreemptionEvals")?;
            }
            MessageType::DeploymentStatusUpdate => {
                let update = req.field("DeploymentUpdate")?;
                update_deployment_status(state, req, update)?;
                if let Some(job) = req.opt("Job") {
                    let id = req.key(job, "ID")?;
                    state.upsert_job(index, job.clone(), id, region);
                }
                upsert_optional_eval(state, req)?;
            }
            MessageType::DeploymentDelete => {
                for id in req.strings("Deployments") {
                    state.delete_deployment(index, id);
                }
            }
            MessageType::VaultAccessorRegister => {
                for accessor in req.seq("Accessors") {
                    let id = req.key(accessor, "Accessor")?;
                    state.upsert_vault_accessor(index, id, accessor.clone());
                }
            }
            MessageType::VaultAccessorDeregister => {
                for accessor in req.seq("Accessors") {
                    let id = req.key(accessor, "Accessor")?;
                    state.delete_vault_accessor(index, id);
                }
            }
            MessageType::AclPolicyUpsert => {
                for policy in req.seq("Policies") {
                    let name = req.key(policy, "Name")?;
                    state.upsert_acl_policy(index, name, policy.clone());
                }
            }
            MessageType::AclPolicyDelete => {
                for name in req.strings("Names") {
                    state.delete_acl_policy(index, name);
                }
            }
            MessageType::AclTokenUpsert => {
                for token in req.seq("Tokens") {
                    let id = req.key(token, "AccessorID")?;
                    state.upsert_acl_token(index, id, token.clone());
                }
            }
            MessageType::AclTokenDelete => {
                for id in req.strings("AccessorIDs") {
                    state.delete_acl_token(index, id);
                }
            }
            MessageType::AclTokenBootstrap => {
                let token = req.field("Token")?;
                let id = req.key(token, "AccessorID")?;
                state.upsert_acl_token(index, id, token.clone());
            }
            other => {
                tracing::debug!(index, command = other.name(), "no state model for command");
                *self.unmodelled.entry(other.name()).or_insert(0) += 1;
            }
        }
        Ok(())
    }

    fn restore_record(
        &mut self,
        record: SnapshotRecord,
        mut doc: Document,
    ) -> Result<(), RestoreError> {
        recover_timestamps(&mut doc);
        let state = &mut self.state;
        match record {
            SnapshotRecord::Node => {
                let id = record_key(&doc, record, "ID")?;
                state.nodes.insert(id, doc);
            }
            SnapshotRecord::Job => {
                let key = namespaced_key(&doc, record, "ID")?;
                state.jobs.insert(key, doc);
            }
            SnapshotRecord::Index => {
                let table = record_key(&doc, record, "Key")?;
                let value = doc
                    .get("Value")
                    .and_then(Document::as_u64)
                    .ok_or(RestoreError::MissingKey {
                        record: record.name(),
                        field: "Value",
                    })?;
                state.indexes.insert(table, value);
            }
            SnapshotRecord::Eval => {
                let id = record_key(&doc, record, "ID")?;
                state.evals.insert(id, doc);
            }
            SnapshotRecord::Alloc => {
                let id = record_key(&doc, record, "ID")?;
                state.allocs.insert(id, doc);
            }
            SnapshotRecord::PeriodicLaunch => {
                let key = namespaced_key(&doc, record, "ID")?;
                state.periodic_launches.insert(key, doc);
            }
            SnapshotRecord::JobSummary => {
                let key = namespaced_key(&doc, record, "JobID")?;
                state.job_summaries.insert(key, doc);
            }
            SnapshotRecord::VaultAccessor => {
                let accessor = record_key(&doc, record, "Accessor")?;
                state.vault_accessors.insert(accessor, doc);
            }
            SnapshotRecord::JobVersion => {
                let (namespace, id) = namespaced_key(&doc, record, "ID")?;
                let version = doc.get("Version").and_then(Document::as_u64).unwrap_or(0);
                state.job_versions.insert((namespace, id, version), doc);
            }
            SnapshotRecord::Deployment => {
                let id = record_key(&doc, record, "ID")?;
                state.deployments.insert(id, doc);
            }
            SnapshotRecord::AclPolicy => {
                let name = record_key(&doc, record, "Name")?;
                state.acl_policies.insert(name, doc);
            }
            SnapshotRecord::AclToken => {
                let accessor_id = record_key(&doc, record, "AccessorID")?;
                state.acl_tokens.insert(accessor_id, doc);
            }
        }
        Ok(())
    }
}

impl StateMachine for ClusterStateMachine {
    fn restore(&mut self, source: &mut dyn Read) -> Result<(), RestoreError> {
        // A failed restore keeps the previous state
        let previous = std::mem::take(&mut self.state);
        let previous_index = self.restored_index.take();
        match self.restore_stream(source) {
            Ok(()) => Ok(()),
            Err(e) => {
                self.state = previous;
                self.restored_index = previous_index;
                Err(e)
            }
        }
    }

    fn apply(&mut self, log: &RawLog) -> Result<(), ApplyError> {
        let Some((tag, raw_body)) = log.command_tag()? else {
            return Ok(());
        };

        let Some(message_type) = tag.message_type() else {
            if tag.ignore_unknown {
                tracing::debug!(index = log.index, tag = tag.tag, "ignoring unknown command");
                return Ok(());
            }
            return Err(ApplyError::UnknownCommand {
                index: log.index,
                tag: tag.tag,
            });
        };

        let body = self
            .decoder
            .decode_body(log.index, Some(tag), raw_body)?
            .unwrap_or_else(|| Document::Map(BTreeMap::new()));
        let req = Request {
            index: log.index,
            command: message_type.name(),
            body: &body,
        };
        self.dispatch(message_type, &req)
    }

    fn state(&self) -> StateCollections {
        self.state.collections()
    }
}

impl ClusterStateMachine {
    fn restore_stream(&mut self, source: &mut dyn Read) -> Result<(), RestoreError> {
        let header: Document = rmp_serde::from_read(&mut *source)?;
        self.restored_index = header.get("LastIndex").and_then(Document::as_u64);

        let mut records = 0u64;
        while let Some(byte) = read_record_type(source)? {
            let record =
                SnapshotRecord::from_byte(byte).ok_or(RestoreError::UnknownRecordType(byte))?;
            let doc: Document = rmp_serde::from_read(&mut *source)?;
            self.restore_record(record, doc)?;
            records += 1;
        }

        tracing::debug!(
            records,
            last_index = self.restored_index,
            "restored state from snapshot"
        );
        Ok(())
    }
}

/// Next record type byte, or `None` at a clean end of stream
fn read_record_type(source: &mut dyn Read) -> Result<Option<u8>, RestoreError> {
    let mut byte = [0u8; 1];
    loop {
        match source.read(&mut byte) {
            Ok(0) => return Ok(None),
            Ok(_) => return Ok(Some(byte[0])),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
}

fn record_key(
    doc: &Document,
    record: SnapshotRecord,
    field: &'static str,
) -> Result<String, RestoreError> {
    doc.str_field(field)
        .map(str::to_string)
        .ok_or(RestoreError::MissingKey {
            record: record.name(),
            field,
        })
}

fn namespaced_key(
    doc: &Document,
    record: SnapshotRecord,
    field: &'static str,
) -> Result<(String, String), RestoreError> {
    Ok((namespace_of(doc).to_string(), record_key(doc, record, field)?))
}

fn deregister_job(
    state: &mut ClusterState,
    req: &Request<'_>,
    namespace: &str,
    id: &str,
    purge: bool,
    region: &str,
) {
    let found = if purge {
        state.purge_job(req.index, namespace, id)
    } else {
        state.stop_job(req.index, namespace, id, region)
    };
    if !found {
        req.not_found("job", id);
    }
}

fn upsert_evals(
    state: &mut ClusterState,
    req: &Request<'_>,
    field: &'static str,
) -> Result<(), ApplyError> {
    for eval in req.seq(field) {
        let id = req.key(eval, "ID")?;
        state.upsert_eval(req.index, id, eval.clone());
    }
    Ok(())
}

fn upsert_optional_eval(state: &mut ClusterState, req: &Request<'_>) -> Result<(), ApplyError> {
    if let Some(eval) = req.opt("Eval") {
        let id = req.key(eval, "ID")?;
        state.upsert_eval(req.index, id, eval.clone());
    }
    Ok(())
}

fn upsert_allocs(
    state: &mut ClusterState,
    req: &Request<'_>,
    field: &'static str,
) -> Result<(), ApplyError> {
    for alloc in req.seq(field) {
        let id = req.key(alloc, "ID")?;
        state.upsert_alloc(req.index, id, alloc.clone());
    }
    Ok(())
}

fn update_deployment_status(
    state: &mut ClusterState,
    req: &Request<'_>,
    update: &Document,
) -> Result<(), ApplyError> {
    let id = req.key(update, "DeploymentID")?;
    let status = update.get("Status").cloned().unwrap_or(Document::Null);
    let description = update.get("StatusDescription").cloned().unwrap_or(Document::Null);
    if !state.update_deployment_status(req.index, id, &status, &description) {
        req.not_found("deployment", id);
    }
    Ok(())
}

/// A decoded command body with field accessors
struct Request<'a> {
    index: u64,
    command: &'static str,
    body: &'a Document,
}

impl<'a> Request<'a> {
    fn missing(&self, field: &'static str) -> ApplyError {
        ApplyError::MissingField {
            index: self.index,
            command: self.command,
            field,
        }
    }

    /// Present, non-null field
    fn opt(&self, field: &str) -> Option<&'a Document> {
        self.body.get(field).filter(|d| !d.is_null())
    }

    fn field(&self, field: &'static str) -> Result<&'a Document, ApplyError> {
        self.opt(field).ok_or_else(|| self.missing(field))
    }

    fn str(&self, field: &'static str) -> Result<&'a str, ApplyError> {
        self.body.str_field(field).ok_or_else(|| self.missing(field))
    }

    /// Identifying string of a record inside the body
    fn key<'d>(&self, record: &'d Document, field: &'static str) -> Result<&'d str, ApplyError> {
        record.str_field(field).ok_or_else(|| self.missing(field))
    }

    /// Sequence field; missing or null is empty
    fn seq(&self, field: &str) -> &'a [Document] {
        self.body.get(field).and_then(Document::as_seq).unwrap_or(&[])
    }

    fn strings(&self, field: &str) -> Vec<&'a str> {
        self.seq(field).iter().filter_map(Document::as_str).collect()
    }

    fn not_found(&self, kind: &str, id: &str) {
        tracing::warn!(
            index = self.index,
            command = self.command,
            kind,
            id,
            "command refers to a record that does not exist"
        );
    }
}

#[cfg(test)]
#[path = "cluster_tests.rs"]
mod tests;
