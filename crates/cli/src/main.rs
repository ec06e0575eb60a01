// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! rdbg - offline raft log and client state inspection

mod commands;
mod config;
mod error;
mod output;

use clap::{Parser, Subcommand};
use commands::client::{self, ClientCommand};
use commands::raft::{self, RaftCommand};
use error::RdbgError;
use std::process::ExitCode;

#[derive(Parser)]
#[command(
    name = "rdbg",
    version,
    about = "Inspect raft logs and client state from a stopped agent's data directory"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Raft log and state inspection
    Raft {
        #[command(subcommand)]
        command: RaftCommand,
    },
    /// Client allocation state inspection
    Client {
        #[command(subcommand)]
        command: ClientCommand,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging();

    let result = match cli.command {
        Commands::Raft { command } => raft::handle(command),
        Commands::Client { command } => client::handle(command),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<RdbgError>() {
                Some(err) => eprint!("{}", err),
                None => eprintln!("error: {:#}", e),
            }
            ExitCode::FAILURE
        }
    }
}

/// Log to stderr so stdout carries only command output
fn setup_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}
