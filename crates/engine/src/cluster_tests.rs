// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::snapshot_state::SnapshotStateBuilder;
use crate::state::DEFAULT_NAMESPACE;
use rdbg_core::{DecodeError, IGNORE_UNKNOWN_TYPE_FLAG};
use serde::Serialize;
use serde_json::{json, Value};
use yare::parameterized;

fn fsm() -> ClusterStateMachine {
    ClusterStateMachine::new(FsmConfig::default())
}

fn cmd(index: u64, message_type: MessageType, body: &Value) -> RawLog {
    let raw = rmp_serde::to_vec_named(body).unwrap();
    RawLog::command(index, 1, message_type.tag(), &raw)
}

fn apply(fsm: &mut ClusterStateMachine, index: u64, message_type: MessageType, body: Value) {
    fsm.apply(&cmd(index, message_type, &body)).unwrap();
}

fn job_key(id: &str) -> (String, String) {
    (DEFAULT_NAMESPACE.to_string(), id.to_string())
}

#[test]
fn node_lifecycle() {
    let mut fsm = fsm();
    apply(&mut fsm, 1, MessageType::NodeRegister, json!({"Node": {"ID": "n1", "Status": "initializing"}}));
    apply(&mut fsm, 2, MessageType::NodeUpdateStatus, json!({"NodeID": "n1", "Status": "ready"}));
    apply(&mut fsm, 3, MessageType::NodeUpdateEligibility, json!({"NodeID": "n1", "Eligibility": "ineligible"}));

    let node = &fsm.cluster_state().nodes["n1"];
    assert_eq!(node.str_field("Status"), Some("ready"));
    assert_eq!(node.str_field("SchedulingEligibility"), Some("ineligible"));
    assert_eq!(node.get("CreateIndex"), Some(&Document::Int(1)));
    assert_eq!(node.get("ModifyIndex"), Some(&Document::Int(3)));

    apply(&mut fsm, 4, MessageType::NodeDeregister, json!({"NodeID": "n1"}));
    assert!(fsm.cluster_state().nodes.is_empty());
    assert_eq!(fsm.cluster_state().indexes["nodes"], 4);
}

#[test]
fn node_drain_toggles_eligibility() {
    let mut fsm = fsm();
    apply(&mut fsm, 1, MessageType::NodeRegister, json!({"Node": {"ID": "n1"}}));
    apply(
        &mut fsm,
        2,
        MessageType::NodeUpdateDrain,
        json!({"NodeID": "n1", "DrainStrategy": {"Deadline": 60}}),
    );
    let node = &fsm.cluster_state().nodes["n1"];
    assert_eq!(node.get("Drain"), Some(&Document::Bool(true)));
    assert_eq!(node.str_field("SchedulingEligibility"), Some("ineligible"));

    apply(
        &mut fsm,
        3,
        MessageType::NodeUpdateDrain,
        json!({"NodeID": "n1", "DrainStrategy": null, "MarkEligible": true}),
    );
    let node = &fsm.cluster_state().nodes["n1"];
    assert_eq!(node.get("Drain"), Some(&Document::Bool(false)));
    assert_eq!(node.str_field("SchedulingEligibility"), Some("eligible"));
}

#[test]
fn batch_node_deregister() {
    let mut fsm = fsm();
    for (index, id) in [(1, "a"), (2, "b"), (3, "c")] {
        apply(&mut fsm, index, MessageType::NodeRegister, json!({"Node": {"ID": id}}));
    }
    apply(&mut fsm, 4, MessageType::NodeBatchDeregister, json!({"NodeIDs": ["a", "c", "missing"]}));

    let ids: Vec<_> = fsm.cluster_state().nodes.keys().cloned().collect();
    assert_eq!(ids, vec!["b"]);
}

#[test]
fn update_of_missing_node_is_not_an_error() {
    let mut fsm = fsm();
    apply(&mut fsm, 1, MessageType::NodeUpdateStatus, json!({"NodeID": "ghost", "Status": "down"}));
    assert!(fsm.cluster_state().nodes.is_empty());
}

#[test]
fn job_register_creates_version_and_summary() {
    let mut fsm = fsm();
    let body = json!({
        "Job": {"ID": "web", "Namespace": "default", "Type": "service"},
        "Eval": {"ID": "e1", "JobID": "web", "Status": "pending"},
    });
    apply(&mut fsm, 5, MessageType::JobRegister, body.clone());
    apply(&mut fsm, 6, MessageType::JobRegister, body);

    let state = fsm.cluster_state();
    assert_eq!(state.jobs[&job_key("web")].get("Version"), Some(&Document::Int(1)));
    assert_eq!(state.job_versions.len(), 2);
    assert_eq!(state.job_summaries[&job_key("web")].str_field("JobID"), Some("web"));
    assert_eq!(state.evals["e1"].get("ModifyIndex"), Some(&Document::Int(6)));
    assert_eq!(state.jobs[&job_key("web")].str_field("Region"), Some("default"));
}

#[test]
fn job_deregister_stops_or_purges() {
    let mut fsm = fsm();
    apply(&mut fsm, 1, MessageType::JobRegister, json!({"Job": {"ID": "web"}}));
    apply(&mut fsm, 2, MessageType::JobRegister, json!({"Job": {"ID": "api"}}));

    apply(&mut fsm, 3, MessageType::JobDeregister, json!({"JobID": "web", "Purge": false}));
    apply(&mut fsm, 4, MessageType::JobDeregister, json!({"JobID": "api", "Purge": true}));

    let state = fsm.cluster_state();
    assert_eq!(state.jobs[&job_key("web")].get("Stop"), Some(&Document::Bool(true)));
    assert!(!state.jobs.contains_key(&job_key("api")));
    assert!(!state.job_summaries.contains_key(&job_key("api")));
}

#[derive(Serialize, PartialEq, Eq, PartialOrd, Ord)]
struct NamespacedId {
    #[serde(rename = "ID")]
    id: &'static str,
    #[serde(rename = "Namespace")]
    namespace: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct BatchDeregister {
    jobs: std::collections::BTreeMap<NamespacedId, Option<Value>>,
    evals: Vec<Value>,
}

#[test]
fn batch_job_deregister_uses_namespaced_keys() {
    let mut fsm = fsm();
    apply(&mut fsm, 1, MessageType::JobRegister, json!({"Job": {"ID": "web"}}));
    apply(&mut fsm, 2, MessageType::JobRegister, json!({"Job": {"ID": "batch", "Namespace": "ops"}}));

    let request = BatchDeregister {
        jobs: [
            (NamespacedId { id: "web", namespace: "default" }, Some(json!({"Purge": true}))),
            (NamespacedId { id: "batch", namespace: "ops" }, None),
        ]
        .into_iter()
        .collect(),
        evals: vec![json!({"ID": "e9"})],
    };
    let raw = rmp_serde::to_vec_named(&request).unwrap();
    fsm.apply(&RawLog::command(3, 1, MessageType::JobBatchDeregister.tag(), &raw))
        .unwrap();

    let state = fsm.cluster_state();
    assert!(!state.jobs.contains_key(&job_key("web")));
    let ops = &state.jobs[&("ops".to_string(), "batch".to_string())];
    assert_eq!(ops.get("Stop"), Some(&Document::Bool(true)));
    assert!(state.evals.contains_key("e9"));
}

#[test]
fn evals_and_allocs() {
    let mut fsm = fsm();
    apply(&mut fsm, 1, MessageType::EvalUpdate, json!({"Evals": [{"ID": "e1"}, {"ID": "e2"}]}));
    apply(
        &mut fsm,
        2,
        MessageType::AllocUpdate,
        json!({"Alloc": [{"ID": "a1", "ClientStatus": "pending", "DesiredStatus": "run"}]}),
    );
    apply(
        &mut fsm,
        3,
        MessageType::AllocClientUpdate,
        json!({"Alloc": [{"ID": "a1", "ClientStatus": "running", "DesiredStatus": "stop"}]}),
    );

    let alloc = &fsm.cluster_state().allocs["a1"];
    assert_eq!(alloc.str_field("ClientStatus"), Some("running"));
    // clients cannot change desired state
    assert_eq!(alloc.str_field("DesiredStatus"), Some("run"));

    apply(&mut fsm, 4, MessageType::EvalDelete, json!({"Evals": ["e1"], "Allocs": ["a1"]}));
    let state = fsm.cluster_state();
    assert_eq!(state.evals.keys().collect::<Vec<_>>(), vec!["e2"]);
    assert!(state.allocs.is_empty());
}

#[test]
fn plan_results_place_stop_and_deploy() {
    let mut fsm = fsm();
    apply(&mut fsm, 1, MessageType::AllocUpdate, json!({"Alloc": [{"ID": "old", "DesiredStatus": "run"}]}));
    apply(
        &mut fsm,
        2,
        MessageType::ApplyPlanResults,
        json!({
            "Alloc": [{"ID": "new", "DesiredStatus": "run"}],
            "AllocsStopped": [{"ID": "old", "DesiredStatus": "stop", "DesiredDescription": "replaced"}],
            "Deployment": {"ID": "d1", "Status": "running"},
            "DeploymentUpdates": [],
            "EvalID": "e1",
        }),
    );

    let state = fsm.cluster_state();
    assert_eq!(state.allocs["new"].get("CreateIndex"), Some(&Document::Int(2)));
    assert_eq!(state.allocs["old"].str_field("DesiredStatus"), Some("stop"));
    assert_eq!(state.deployments["d1"].str_field("Status"), Some("running"));

    apply(
        &mut fsm,
        3,
        MessageType::DeploymentStatusUpdate,
        json!({"DeploymentUpdate": {"DeploymentID": "d1", "Status": "successful", "StatusDescription": "done"}}),
    );
    assert_eq!(fsm.cluster_state().deployments["d1"].str_field("Status"), Some("successful"));

    apply(&mut fsm, 4, MessageType::DeploymentDelete, json!({"Deployments": ["d1"]}));
    assert!(fsm.cluster_state().deployments.is_empty());
}

#[test]
fn acl_and_vault_tables() {
    let mut fsm = fsm();
    apply(&mut fsm, 1, MessageType::AclPolicyUpsert, json!({"Policies": [{"Name": "readonly"}, {"Name": "ops"}]}));
    apply(&mut fsm, 2, MessageType::AclPolicyDelete, json!({"Names": ["ops"]}));
    apply(&mut fsm, 3, MessageType::AclTokenBootstrap, json!({"Token": {"AccessorID": "root", "Type": "management"}}));
    apply(&mut fsm, 4, MessageType::AclTokenUpsert, json!({"Tokens": [{"AccessorID": "t1"}]}));
    apply(&mut fsm, 5, MessageType::AclTokenDelete, json!({"AccessorIDs": ["t1"]}));
    apply(&mut fsm, 6, MessageType::VaultAccessorRegister, json!({"Accessors": [{"Accessor": "va1"}, {"Accessor": "va2"}]}));
    apply(&mut fsm, 7, MessageType::VaultAccessorDeregister, json!({"Accessors": [{"Accessor": "va1"}]}));

    let state = fsm.cluster_state();
    assert_eq!(state.acl_policies.keys().collect::<Vec<_>>(), vec!["readonly"]);
    assert_eq!(state.acl_tokens.keys().collect::<Vec<_>>(), vec!["root"]);
    assert_eq!(state.vault_accessors.keys().collect::<Vec<_>>(), vec!["va2"]);
    assert_eq!(state.indexes["acl_token"], 5);
    assert_eq!(state.indexes["vault_accessors"], 7);
}

#[test]
fn unmodelled_commands_are_counted() {
    let mut fsm = fsm();
    apply(&mut fsm, 1, MessageType::SchedulerConfig, json!({"Config": {}}));
    apply(&mut fsm, 2, MessageType::SchedulerConfig, json!({"Config": {}}));
    assert_eq!(fsm.unmodelled()["SchedulerConfigRequestType"], 2);
    assert!(fsm.cluster_state().indexes.is_empty());
}

#[test]
fn flagged_unknown_command_is_skipped() {
    let mut fsm = fsm();
    let log = RawLog::command(1, 1, IGNORE_UNKNOWN_TYPE_FLAG | 100, &[0xc0]);
    assert!(fsm.apply(&log).is_ok());
}

#[test]
fn unflagged_unknown_command_fails() {
    let mut fsm = fsm();
    let log = RawLog::command(1, 1, 100, &[0xc0]);
    assert!(matches!(
        fsm.apply(&log),
        Err(ApplyError::UnknownCommand { index: 1, tag: 100 })
    ));
}

#[test]
fn malformed_body_fails() {
    let mut fsm = fsm();
    let log = RawLog::command(7, 1, MessageType::NodeRegister.tag(), &[0x82, 0xa1]);
    assert!(matches!(
        fsm.apply(&log),
        Err(ApplyError::Decode(DecodeError::Body { index: 7, .. }))
    ));
}

#[test]
fn empty_command_fails() {
    let mut fsm = fsm();
    let log = RawLog {
        index: 2,
        term: 1,
        log_type: rdbg_core::LogKind::COMMAND,
        data: vec![],
    };
    assert!(matches!(
        fsm.apply(&log),
        Err(ApplyError::Decode(DecodeError::EmptyCommand { index: 2 }))
    ));
}

#[parameterized(
    node_register = { MessageType::NodeRegister, "Node" },
    node_status = { MessageType::NodeUpdateStatus, "NodeID" },
    job_register = { MessageType::JobRegister, "Job" },
    token_bootstrap = { MessageType::AclTokenBootstrap, "Token" },
)]
fn missing_required_field_fails(message_type: MessageType, field: &str) {
    let mut fsm = fsm();
    let err = fsm.apply(&cmd(1, message_type, &json!({}))).unwrap_err();
    match err {
        ApplyError::MissingField { field: missing, .. } => assert_eq!(missing, field),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn non_command_entries_are_ignored() {
    let mut fsm = fsm();
    let log = RawLog {
        index: 1,
        term: 1,
        log_type: rdbg_core::LogKind::NOOP,
        data: vec![1, 2, 3],
    };
    assert!(fsm.apply(&log).is_ok());
    assert_eq!(fsm.cluster_state(), &ClusterState::default());
}

fn snapshot_stream() -> Vec<u8> {
    SnapshotStateBuilder::new(40)
        .unwrap()
        .record(SnapshotRecord::Node, &json!({"ID": "n1", "Status": "ready"}))
        .unwrap()
        .record(SnapshotRecord::Job, &json!({"ID": "web", "Namespace": "default", "Version": 2}))
        .unwrap()
        .record(SnapshotRecord::JobVersion, &json!({"ID": "web", "Namespace": "default", "Version": 2}))
        .unwrap()
        .record(SnapshotRecord::Index, &json!({"Key": "nodes", "Value": 12}))
        .unwrap()
        .record(SnapshotRecord::AclToken, &json!({"AccessorID": "root"}))
        .unwrap()
        .build()
}

#[test]
fn restore_loads_every_record() {
    let mut fsm = fsm();
    fsm.restore(&mut snapshot_stream().as_slice()).unwrap();

    assert_eq!(fsm.restored_index(), Some(40));
    let state = fsm.cluster_state();
    assert_eq!(state.nodes["n1"].str_field("Status"), Some("ready"));
    assert!(state.jobs.contains_key(&job_key("web")));
    assert!(state
        .job_versions
        .contains_key(&(DEFAULT_NAMESPACE.to_string(), "web".to_string(), 2)));
    assert_eq!(state.indexes["nodes"], 12);
    assert!(state.acl_tokens.contains_key("root"));
}

#[test]
fn replay_continues_from_restored_state() {
    let mut fsm = fsm();
    fsm.restore(&mut snapshot_stream().as_slice()).unwrap();
    apply(&mut fsm, 41, MessageType::JobRegister, json!({"Job": {"ID": "web"}}));

    let job = &fsm.cluster_state().jobs[&job_key("web")];
    assert_eq!(job.get("Version"), Some(&Document::Int(3)));
}

#[test]
fn unknown_record_type_fails_and_keeps_state() {
    let mut fsm = fsm();
    apply(&mut fsm, 1, MessageType::NodeRegister, json!({"Node": {"ID": "before"}}));

    let stream = SnapshotStateBuilder::new(10)
        .unwrap()
        .record(SnapshotRecord::Node, &json!({"ID": "n1"}))
        .unwrap()
        .raw(5, &[0xc0])
        .build();
    let err = fsm.restore(&mut stream.as_slice()).unwrap_err();

    assert!(matches!(err, RestoreError::UnknownRecordType(5)));
    assert!(fsm.cluster_state().nodes.contains_key("before"));
    assert!(!fsm.cluster_state().nodes.contains_key("n1"));
}

#[test]
fn truncated_snapshot_fails() {
    let mut stream = snapshot_stream();
    stream.truncate(stream.len() - 3);
    let mut fsm = fsm();
    assert!(matches!(
        fsm.restore(&mut stream.as_slice()),
        Err(RestoreError::Decode(_))
    ));
}

#[test]
fn record_without_key_fails() {
    let stream = SnapshotStateBuilder::new(1)
        .unwrap()
        .record(SnapshotRecord::Eval, &json!({"Status": "pending"}))
        .unwrap()
        .build();
    let mut fsm = fsm();
    assert!(matches!(
        fsm.restore(&mut stream.as_slice()),
        Err(RestoreError::MissingKey { record: "Eval", field: "ID" })
    ));
}

#[test]
fn state_output_contains_every_collection() {
    let mut fsm = fsm();
    apply(&mut fsm, 1, MessageType::NodeRegister, json!({"Node": {"ID": "n1"}}));
    let state = fsm.state();
    assert_eq!(state.len(), 12);
    assert_eq!(state["Nodes"].len(), 1);
    assert!(state["Jobs"].is_empty());
}
