//! Fleet API records.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{CliError, CliResult};

/// A deployed service instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Instance {
    /// Instance ID.
    #[serde(alias = "instanceId")]
    pub id: String,
    /// Lifecycle status (RUNNING, DEPLOYING, FAILED, ...).
    pub status: String,
    /// Resource the instance was deployed from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
    /// Cloud provider.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloud_provider: Option<String>,
    /// Cloud region.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Service plan version.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier_version: Option<String>,
    /// Creation time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    /// Parameters the instance was created with.
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub result_params: Map<String, Value>,
}

/// A point-in-time snapshot of an instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Snapshot {
    /// Snapshot ID.
    #[serde(alias = "id")]
    pub snapshot_id: String,
    /// Snapshot status.
    pub status: String,
    /// Completion percentage.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<u32>,
    /// Snapshot type (manual, automatic, ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot_type: Option<String>,
    /// Region the snapshot is stored in.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Instance the snapshot was taken from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_instance_id: Option<String>,
    /// Creation time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_time: Option<String>,
    /// Completion time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_time: Option<String>,
}

/// Body of an instance creation request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInstanceRequest {
    /// Resource to deploy.
    pub resource_id: String,
    /// Cloud provider.
    pub cloud_provider: String,
    /// Cloud region.
    pub region: String,
    /// Instance parameters.
    pub request_params: Map<String, Value>,
}

/// Parses repeated `KEY=VALUE` arguments into a JSON object.
///
/// Values that parse as JSON (numbers, booleans, arrays, objects, quoted
/// strings) keep their type; anything else is taken as a plain string.
///
/// # Errors
///
/// Returns an error for entries without `=` or with an empty key.
pub fn parse_params(pairs: &[String]) -> CliResult<Map<String, Value>> {
    let mut params = Map::new();
    for pair in pairs {
        let (key, raw) = pair
            .split_once('=')
            .ok_or_else(|| CliError::invalid(format!("expected KEY=VALUE, got '{pair}'")))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(CliError::invalid(format!("empty key in '{pair}'")));
        }
        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        params.insert(key.to_string(), value);
    }
    Ok(params)
}
