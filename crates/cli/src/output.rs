// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Output formatting for CLI commands

use clap::ValueEnum;
use serde::Serialize;
use std::io::{self, Write};

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Write a value as two-space indented JSON followed by a newline
pub fn write_json<T: Serialize + ?Sized>(out: &mut impl Write, value: &T) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)
        .map_err(|e| anyhow::anyhow!("failed to encode output: {}", e))?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

/// Print a value as pretty JSON on stdout
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());
    write_json(&mut out, value)
}

/// Print output in the specified format
pub fn print<T>(value: &T, format: OutputFormat) -> anyhow::Result<()>
where
    T: Serialize + std::fmt::Display,
{
    match format {
        OutputFormat::Text => {
            print!("{}", value);
            Ok(())
        }
        OutputFormat::Json => print_json(value),
    }
}

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;
