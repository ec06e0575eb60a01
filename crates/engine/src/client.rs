// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Decoding a client's persisted allocation state

use rdbg_core::{recover_timestamps, Document, DocumentError};
use rdbg_storage::{ClientStateStore, ClientStoreError};
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

/// Fatal errors while reading client state
#[derive(Debug, Error)]
pub enum ClientStateError {
    #[error(transparent)]
    Store(#[from] ClientStoreError),
    #[error("failed to get deployment status for {alloc}: {source}")]
    DeploymentStatus {
        alloc: String,
        source: DocumentError,
    },
    #[error("failed to get task runner state {task} for {alloc}: {source}")]
    TaskRunnerState {
        alloc: String,
        task: String,
        source: DocumentError,
    },
    #[error("failed to parse driver state {task} for {alloc}: {source}")]
    DriverState {
        alloc: String,
        task: String,
        source: DocumentError,
    },
}

/// One allocation as the client last persisted it
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ClientAllocState {
    pub alloc: Document,
    pub deploy_status: Document,
    pub tasks: BTreeMap<String, ClientTaskState>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ClientTaskState {
    pub local_state: Document,
    pub remote_state: Document,
    pub driver_state: Document,
}

/// Read every allocation in `store`, keyed by allocation id
///
/// An allocation whose record cannot be read or decoded is skipped with a
/// warning. Failures below that level abort the read.
pub fn read_client_state<S: ClientStateStore + ?Sized>(
    store: &S,
) -> Result<BTreeMap<String, ClientAllocState>, ClientStateError> {
    let mut allocs = BTreeMap::new();
    for id in store.allocation_ids()? {
        let alloc = match store
            .allocation(&id)
            .map_err(|e| e.to_string())
            .and_then(|raw| decode(&raw).map_err(|e| e.to_string()))
        {
            Ok(alloc) => alloc,
            Err(error) => {
                tracing::warn!(alloc = %id, %error, "skipping unreadable allocation");
                continue;
            }
        };

        let deploy_status = match store.deployment_status(&id)? {
            Some(raw) => decode(&raw).map_err(|source| ClientStateError::DeploymentStatus {
                alloc: id.clone(),
                source,
            })?,
            None => Document::Null,
        };

        let mut tasks = BTreeMap::new();
        for task in task_names(&id, &alloc) {
            let state = read_task(store, &id, &task)?;
            tasks.insert(task, state);
        }

        allocs.insert(
            id,
            ClientAllocState {
                alloc,
                deploy_status,
                tasks,
            },
        );
    }
    Ok(allocs)
}

fn read_task<S: ClientStateStore + ?Sized>(
    store: &S,
    alloc: &str,
    task: &str,
) -> Result<ClientTaskState, ClientStateError> {
    let record = store.task_runner_state(alloc, task)?;
    let runner_error = |source| ClientStateError::TaskRunnerState {
        alloc: alloc.to_string(),
        task: task.to_string(),
        source,
    };

    let mut local_state = match record.local_state {
        Some(raw) => Document::from_msgpack(&raw).map_err(runner_error)?,
        None => Document::Null,
    };
    // Driver state is nested msgpack; pull it out before time recovery
    // rewrites the raw bytes
    let driver_state = driver_state(&local_state).map_err(|source| {
        ClientStateError::DriverState {
            alloc: alloc.to_string(),
            task: task.to_string(),
            source,
        }
    })?;
    recover_timestamps(&mut local_state);

    let remote_state = match record.task_state {
        Some(raw) => decode(&raw).map_err(runner_error)?,
        None => Document::Null,
    };

    Ok(ClientTaskState {
        local_state,
        remote_state,
        driver_state,
    })
}

fn decode(raw: &[u8]) -> Result<Document, DocumentError> {
    let mut doc = Document::from_msgpack(raw)?;
    recover_timestamps(&mut doc);
    Ok(doc)
}

/// Decode `TaskHandle.DriverState`, or null when there is none
fn driver_state(local_state: &Document) -> Result<Document, DocumentError> {
    let raw = match local_state
        .get("TaskHandle")
        .and_then(|handle| handle.get("DriverState"))
    {
        Some(Document::Bytes(raw)) => raw.as_slice(),
        Some(Document::String(raw)) => raw.as_bytes(),
        _ => return Ok(Document::Null),
    };
    if raw.is_empty() {
        return Ok(Document::Null);
    }
    decode(raw)
}

/// Task names of the allocation's task group, as listed in its job
fn task_names(id: &str, alloc: &Document) -> Vec<String> {
    let group_name = alloc.str_field("TaskGroup");
    let group = alloc
        .get("Job")
        .and_then(|job| job.get("TaskGroups"))
        .and_then(Document::as_seq)
        .and_then(|groups| {
            let name = group_name?;
            groups
                .iter()
                .find(|group| group.str_field("Name") == Some(name))
        });

    let Some(group) = group else {
        tracing::warn!(alloc = %id, "task group not found in allocation's job");
        return Vec::new();
    };

    group
        .get("Tasks")
        .and_then(Document::as_seq)
        .unwrap_or_default()
        .iter()
        .filter_map(|task| task.str_field("Name"))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
