//! MCP server registration command implementation.

use std::io::Write;
use std::path::PathBuf;

use tracing::info;

use crate::cli::McpCommands;
use crate::error::CliResult;
use crate::mcp::{McpConfig, McpServer, parse_env};
use crate::output::{McpServerEntry, McpServerList, Message, OutputFormat};

/// MCP command executor.
pub struct McpCommand {
    config_path: PathBuf,
}

impl McpCommand {
    /// Create a command operating on the given assistant config file.
    #[must_use]
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
        }
    }

    /// Execute an MCP subcommand.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or written, or the entry
    /// is missing or already present.
    pub fn execute<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        command: &McpCommands,
    ) -> CliResult<()> {
        let mut config = McpConfig::load(&self.config_path)?;

        match command {
            McpCommands::List => {
                let servers = config
                    .servers()?
                    .into_iter()
                    .map(|(name, server)| McpServerEntry { name, server })
                    .collect();
                format.write(writer, &McpServerList { servers })?;
            }
            McpCommands::Show { name } => {
                let server = config.get(name)?;
                let entry = McpServerEntry {
                    name: name.clone(),
                    server,
                };
                format.write(writer, &entry)?;
            }
            McpCommands::Add(args) => {
                let server = McpServer {
                    args: args.args.clone(),
                    env: parse_env(&args.env)?,
                    ..McpServer::new(&args.command)
                };
                config.add(&args.name, &server, args.force)?;
                config.save()?;
                info!(name = %args.name, path = %config.path().display(), "MCP server added");
                let msg = Message::success(format!(
                    "Added MCP server '{}' to {}",
                    args.name,
                    config.path().display()
                ));
                format.write(writer, &msg)?;
            }
            McpCommands::Remove { name } => {
                config.remove(name)?;
                config.save()?;
                info!(name = %name, path = %config.path().display(), "MCP server removed");
                format.write(
                    writer,
                    &Message::success(format!("Removed MCP server '{name}'")),
                )?;
            }
        }
        Ok(())
    }
}
