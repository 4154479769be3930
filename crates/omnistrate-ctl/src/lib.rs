//! # omnistrate-ctl
//!
//! Command-line interface for the Omnistrate fleet API.
//!
//! Provides commands for:
//! - Signing in and out
//! - Instance lifecycle (create, modify, delete, start, stop, restart)
//! - Snapshots and restore
//! - Following deployment workflows with live per-resource spinners
//! - Registering MCP servers with the desktop assistant
//!
//! # Architecture
//!
//! Commands talk to the fleet API through [`client::FleetClient`]. Mutating
//! commands run with `--wait` hand the instance to the `omni-workflow` poller,
//! which reads workflow events through the same client and draws progress
//! with [`progress::TerminalDisplay`].
//!
//! ```text
//! ┌────────────────┐   HTTPS/JSON   ┌──────────────────┐
//! │ omnistrate-ctl │◄──────────────►│  fleet API       │
//! └───────┬────────┘                └──────────────────┘
//!         │ WorkflowSource
//!         ▼
//! ┌────────────────┐   spinners     ┌──────────────────┐
//! │ WorkflowPoller │───────────────►│ TerminalDisplay  │
//! └────────────────┘                └──────────────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod client;
pub mod commands;
pub mod config;
pub mod error;
pub mod mcp;
pub mod model;
pub mod output;
pub mod progress;

#[cfg(test)]
mod testing;

pub use cli::{Cli, Commands, Format, InstanceCommands, McpCommands, SnapshotCommands};
pub use client::FleetClient;
pub use config::{Scope, Settings};
pub use error::{CliError, CliResult};
pub use output::OutputFormat;
pub use progress::TerminalDisplay;
