// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for CLI integration tests.

#![allow(dead_code)]

pub use rdbg_core::{LogKind, MessageType, RawLog};
pub use rdbg_engine::{SnapshotRecord, SnapshotStateBuilder};
pub use serde_json::{json, Value};

use assert_cmd::assert::Assert;
use assert_cmd::Command;
use predicates::prelude::*;
use rdbg_storage::{ClientStateWriter, LogWriter, SnapshotWriter};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Temporary agent data directory
pub struct DataDir {
    dir: TempDir,
}

impl DataDir {
    pub fn empty() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    /// Data directory whose log holds `logs`
    pub fn with_logs(logs: &[RawLog]) -> Self {
        let data = Self::empty();
        data.log(logs);
        data
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn log_path(&self) -> PathBuf {
        self.path().join("server/raft/raft.log")
    }

    pub fn snapshots_path(&self) -> PathBuf {
        self.path().join("server/raft/snapshots")
    }

    /// Write the raft log, replacing any existing one
    pub fn log(&self, logs: &[RawLog]) {
        let mut writer = LogWriter::create(&self.log_path()).unwrap();
        for log in logs {
            writer.append(log).unwrap();
        }
        writer.sync().unwrap();
    }

    pub fn snapshot(&self, term: u64, index: u64, state: &[u8]) {
        SnapshotWriter::new(&self.snapshots_path())
            .write(term, index, state)
            .unwrap();
    }

    pub fn client_path(&self) -> PathBuf {
        self.path().join("client")
    }

    /// Writer for allocation records under `client`
    pub fn client(&self) -> ClientStateWriter {
        ClientStateWriter::new(&self.client_path())
    }

    /// Command for `rdbg client state <this dir>`
    pub fn client_state(&self) -> Cli {
        rdbg().args(["client", "state"]).args([self.path()])
    }

    /// Command for `rdbg raft <subcommand> <this dir> <extra...>`
    pub fn raft(&self, subcommand: &str) -> Cli {
        let mut cli = rdbg();
        cli.cmd
            .arg("raft")
            .arg(subcommand)
            .arg(self.path());
        cli
    }
}

/// Named-field msgpack encoding of `value`
pub fn msgpack(value: &Value) -> Vec<u8> {
    rmp_serde::to_vec_named(value).unwrap()
}

/// Msgpack-encoded command entry
pub fn command(index: u64, message_type: MessageType, body: &Value) -> RawLog {
    let raw = rmp_serde::to_vec_named(body).unwrap();
    RawLog::command(index, 1, message_type.tag(), &raw)
}

pub fn noop(index: u64) -> RawLog {
    RawLog {
        index,
        term: 1,
        log_type: LogKind::NOOP,
        data: vec![],
    }
}

pub fn rdbg() -> Cli {
    let mut cmd = Command::cargo_bin("rdbg").unwrap();
    cmd.env_remove("RUST_LOG");
    Cli { cmd }
}

pub struct Cli {
    cmd: Command,
}

impl Cli {
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<std::ffi::OsStr>,
    {
        self.cmd.args(args);
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.cmd.env(key, value);
        self
    }

    /// Run and expect success
    pub fn passes(mut self) -> Run {
        Run(self.cmd.assert().success())
    }

    /// Run and expect a non-zero exit
    pub fn fails(mut self) -> Run {
        Run(self.cmd.assert().failure())
    }
}

pub struct Run(Assert);

impl Run {
    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.0.get_output().stdout).into_owned()
    }

    pub fn stdout_json(&self) -> Value {
        serde_json::from_slice(&self.0.get_output().stdout).unwrap()
    }

    pub fn stdout_has(self, expected: &str) -> Self {
        Run(self.0.stdout(predicate::str::contains(expected)))
    }

    pub fn stderr_has(self, expected: &str) -> Self {
        Run(self.0.stderr(predicate::str::contains(expected)))
    }

    pub fn stdout_empty(self) -> Self {
        Run(self.0.stdout(predicate::str::is_empty()))
    }

    pub fn stderr_lacks(self, unexpected: &str) -> Self {
        Run(self.0.stderr(predicate::str::contains(unexpected).not()))
    }
}
