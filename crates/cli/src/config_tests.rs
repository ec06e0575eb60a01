// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn paths_hang_off_server_raft() {
    let config = Config::for_root(Path::new("/var/lib/agent"));

    assert_eq!(config.raft_dir, PathBuf::from("/var/lib/agent/server/raft"));
    assert_eq!(
        config.log_path,
        PathBuf::from("/var/lib/agent/server/raft/raft.log")
    );
    assert_eq!(
        config.snapshots_dir,
        PathBuf::from("/var/lib/agent/server/raft/snapshots")
    );
}

#[test]
fn relative_roots_stay_relative() {
    let config = Config::for_root(Path::new("data"));
    assert_eq!(config.log_path, PathBuf::from("data/server/raft/raft.log"));
}

#[test]
fn client_state_sits_beside_server() {
    let config = Config::for_root(Path::new("/var/lib/agent"));
    assert_eq!(config.client_dir, PathBuf::from("/var/lib/agent/client"));
}
