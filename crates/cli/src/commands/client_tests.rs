// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use rdbg_storage::ClientStateWriter;
use serde_json::json;
use std::path::Path;
use tempfile::TempDir;

fn msgpack(value: &serde_json::Value) -> Vec<u8> {
    rmp_serde::to_vec_named(value).unwrap()
}

#[test]
fn missing_client_dir_is_a_user_error() {
    let dir = TempDir::new().unwrap();
    let err = load_state(&Config::for_root(dir.path())).unwrap_err();

    assert!(err.message.starts_with("failed to open client state:"));
    assert!(!err.suggestions.is_empty());
}

#[test]
fn loads_allocations_from_the_client_dir() {
    let dir = TempDir::new().unwrap();
    let config = Config::for_root(dir.path());
    let alloc = json!({
        "ID": "a1",
        "TaskGroup": "web",
        "Job": { "TaskGroups": [{ "Name": "web", "Tasks": [{ "Name": "server" }] }] },
    });
    ClientStateWriter::new(&config.client_dir)
        .allocation("a1", &msgpack(&alloc))
        .unwrap();

    let state = load_state(&config).unwrap();

    assert_eq!(state.len(), 1);
    assert!(state["a1"].tasks.contains_key("server"));
}

#[test]
fn corrupt_deployment_status_names_the_allocation() {
    let dir = TempDir::new().unwrap();
    let config = Config::for_root(Path::new(dir.path()));
    let writer = ClientStateWriter::new(&config.client_dir);
    writer.allocation("a1", &msgpack(&json!({ "ID": "a1" }))).unwrap();
    writer.deployment_status("a1", &[0xc1]).unwrap();

    let err = load_state(&config).unwrap_err();

    assert!(err.message.contains("deployment status for a1"));
}
