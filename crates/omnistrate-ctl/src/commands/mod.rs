//! CLI command implementations.
//!
//! Each submodule implements a specific CLI command:
//! - [`auth`] - Login and logout
//! - [`instance`] - Instance lifecycle
//! - [`snapshot`] - Snapshot management and restore
//! - [`mcp`] - Desktop assistant MCP server registration
//! - [`workflow`] - Following deployment workflows for the commands above

pub mod auth;
pub mod instance;
pub mod mcp;
pub mod snapshot;
pub mod workflow;

pub use auth::AuthCommand;
pub use instance::{InstanceApi, InstanceCommand};
pub use mcp::McpCommand;
pub use snapshot::{SnapshotApi, SnapshotCommand};
pub use workflow::WorkflowFollower;
