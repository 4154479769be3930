//! Desktop assistant MCP configuration.
//!
//! The assistant reads `claude_desktop_config.json`, whose `mcpServers`
//! object maps a server name to the command it launches. Everything else in
//! the file belongs to the assistant and is written back untouched.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{CliError, CliResult};

/// Key holding the server table.
const SERVERS_KEY: &str = "mcpServers";

/// One MCP server launch definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct McpServer {
    /// Executable to launch.
    pub command: String,
    /// Arguments.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    /// Environment variables.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
    /// Fields this tool does not manage.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl McpServer {
    /// Creates a definition for a command.
    #[must_use]
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Self::default()
        }
    }

    /// Command and arguments as one line.
    #[must_use]
    pub fn command_line(&self) -> String {
        std::iter::once(self.command.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Parses repeated `KEY=VALUE` environment arguments.
///
/// # Errors
///
/// Returns an error for entries without `=` or with an empty key.
pub fn parse_env(pairs: &[String]) -> CliResult<BTreeMap<String, String>> {
    pairs
        .iter()
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                Ok((key.trim().to_string(), value.to_string()))
            }
            _ => Err(CliError::invalid(format!("expected KEY=VALUE, got '{pair}'"))),
        })
        .collect()
}

/// The assistant configuration file.
#[derive(Debug, Clone)]
pub struct McpConfig {
    path: PathBuf,
    document: Map<String, Value>,
}

impl McpConfig {
    /// Default location of the assistant configuration.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("Claude").join("claude_desktop_config.json"))
    }

    /// Loads the file. A missing file is an empty configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a JSON object.
    pub fn load(path: impl Into<PathBuf>) -> CliResult<Self> {
        let path = path.into();
        if !path.exists() {
            debug!(path = %path.display(), "No assistant config yet");
            return Ok(Self {
                path,
                document: Map::new(),
            });
        }

        let content = std::fs::read_to_string(&path)?;
        let document = if content.trim().is_empty() {
            Map::new()
        } else {
            match serde_json::from_str(&content)? {
                Value::Object(map) => map,
                _ => {
                    return Err(CliError::config(format!(
                        "'{}' is not a JSON object",
                        path.display()
                    )));
                }
            }
        };

        Ok(Self { path, document })
    }

    /// File this configuration is bound to.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn servers_table(&self) -> CliResult<Option<&Map<String, Value>>> {
        match self.document.get(SERVERS_KEY) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Object(map)) => Ok(Some(map)),
            Some(_) => Err(CliError::config(format!("'{SERVERS_KEY}' is not an object"))),
        }
    }

    fn servers_table_mut(&mut self) -> CliResult<&mut Map<String, Value>> {
        let entry = self
            .document
            .entry(SERVERS_KEY)
            .or_insert_with(|| Value::Object(Map::new()));
        if entry.is_null() {
            *entry = Value::Object(Map::new());
        }
        entry
            .as_object_mut()
            .ok_or_else(|| CliError::config(format!("'{SERVERS_KEY}' is not an object")))
    }

    /// All configured servers, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns an error if an entry is malformed.
    pub fn servers(&self) -> CliResult<Vec<(String, McpServer)>> {
        let Some(table) = self.servers_table()? else {
            return Ok(Vec::new());
        };
        table
            .iter()
            .map(|(name, value)| {
                let server = serde_json::from_value(value.clone()).map_err(|e| {
                    CliError::config(format!("invalid MCP server '{name}': {e}"))
                })?;
                Ok((name.clone(), server))
            })
            .collect()
    }

    /// Looks up one server.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::NotFound`] if no server has that name.
    pub fn get(&self, name: &str) -> CliResult<McpServer> {
        let value = self
            .servers_table()?
            .and_then(|table| table.get(name))
            .ok_or_else(|| not_found(name))?;
        serde_json::from_value(value.clone())
            .map_err(|e| CliError::config(format!("invalid MCP server '{name}': {e}")))
    }

    /// Adds a server. Existing entries are only replaced with `force`.
    ///
    /// # Errors
    ///
    /// Returns an error if the name exists and `force` is false.
    pub fn add(&mut self, name: &str, server: &McpServer, force: bool) -> CliResult<()> {
        if name.trim().is_empty() {
            return Err(CliError::invalid("MCP server name cannot be empty"));
        }
        let value = serde_json::to_value(server)?;
        let table = self.servers_table_mut()?;
        if table.contains_key(name) && !force {
            return Err(CliError::invalid(format!(
                "MCP server '{name}' already exists, use --force to replace it"
            )));
        }
        table.insert(name.to_string(), value);
        Ok(())
    }

    /// Removes a server and returns its definition.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::NotFound`] if no server has that name.
    pub fn remove(&mut self, name: &str) -> CliResult<McpServer> {
        let removed = self
            .servers_table_mut()?
            .remove(name)
            .ok_or_else(|| not_found(name))?;
        Ok(serde_json::from_value(removed)?)
    }

    /// Writes the file back, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn save(&self) -> CliResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut content = serde_json::to_string_pretty(&self.document)?;
        content.push('\n');
        std::fs::write(&self.path, content)?;
        debug!(path = %self.path.display(), "Assistant config saved");
        Ok(())
    }
}

fn not_found(name: &str) -> CliError {
    CliError::NotFound {
        kind: "MCP server",
        id: name.to_string(),
    }
}
