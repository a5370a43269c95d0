// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Output format for commands supporting structured output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Parse a string that must not be empty or whitespace-only.
fn non_empty_string(s: &str) -> Result<String, String> {
    if s.trim().is_empty() {
        Err("cannot be empty".to_string())
    } else {
        Ok(s.to_string())
    }
}

#[derive(Parser, Debug)]
#[command(name = "outq")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Durable offline operation queue")]
#[command(
    long_about = "Durable offline operation queue.\n\n\
    Operations are appended to a local log and delivered in order through \
    configured command handlers whenever the network is reachable."
)]
pub struct Cli {
    /// Operation log to use instead of the configured one
    #[arg(long, global = true, value_name = "path")]
    pub log: Option<PathBuf>,

    /// Configuration file
    #[arg(long, global = true, value_name = "path")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Append an operation to the log
    #[command(after_help = "\
Examples:
  outq enqueue upload '{\"photo\":\"a.jpg\"}'   Queue an upload
  outq enqueue ping                           Queue an operation with a null payload")]
    Enqueue {
        /// Operation kind, used to pick a handler
        #[arg(value_parser = non_empty_string)]
        kind: String,

        /// JSON payload handed to the handler
        payload: Option<String>,
    },

    /// List operations in delivery order
    List {
        #[arg(long = "output", short = 'o', value_enum, default_value = "text")]
        output: OutputFormat,
    },

    /// Show queue counts and the last failure
    Status {
        #[arg(long = "output", short = 'o', value_enum, default_value = "text")]
        output: OutputFormat,
    },

    /// Put a failed operation back in line
    Retry {
        /// Operation id
        id: String,
    },

    /// Remove a failed operation
    Purge {
        /// Operation id
        id: String,
    },

    /// Rewrite the log without superseded records
    Compact,

    /// Deliver pending operations through the configured handlers
    #[command(after_help = "\
Examples:
  outq drain                              Deliver now, assuming the network is up
  outq drain --probe example.com:443      Deliver whenever example.com:443 is reachable
  outq drain --timeout 30                 Give up after 30 seconds")]
    Drain {
        /// Probe this host:port for reachability instead of assuming online
        #[arg(long, value_name = "host:port")]
        probe: Option<String>,

        /// Stop waiting after this many seconds
        #[arg(long, value_name = "secs")]
        timeout: Option<u64>,
    },
}
