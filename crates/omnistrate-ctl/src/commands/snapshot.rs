//! Snapshot management command implementation.

use std::future::Future;
use std::io::Write;
use std::time::Duration;

use omni_workflow::{ActionType, WorkflowSource};
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use crate::cli::SnapshotCommands;
use crate::client::FleetClient;
use crate::commands::workflow::WorkflowFollower;
use crate::config::{Scope, interval_from_secs};
use crate::error::CliResult;
use crate::model::{Snapshot, parse_params};
use crate::output::{Message, OutputFormat, SnapshotList};

/// Snapshot operations of the fleet API.
pub trait SnapshotApi: Send + Sync {
    /// List snapshots of an instance.
    fn list_snapshots(
        &self,
        scope: &Scope,
        instance_id: &str,
    ) -> impl Future<Output = CliResult<Vec<Snapshot>>> + Send;

    /// Get one snapshot.
    fn describe_snapshot(
        &self,
        scope: &Scope,
        instance_id: &str,
        snapshot_id: &str,
    ) -> impl Future<Output = CliResult<Snapshot>> + Send;

    /// Take a snapshot, returning its ID.
    fn create_snapshot(
        &self,
        scope: &Scope,
        instance_id: &str,
    ) -> impl Future<Output = CliResult<String>> + Send;

    /// Delete a snapshot.
    fn delete_snapshot(
        &self,
        scope: &Scope,
        instance_id: &str,
        snapshot_id: &str,
    ) -> impl Future<Output = CliResult<()>> + Send;

    /// Restore a snapshot, returning the new instance ID.
    fn restore_snapshot(
        &self,
        scope: &Scope,
        instance_id: &str,
        snapshot_id: &str,
        params: &Map<String, Value>,
    ) -> impl Future<Output = CliResult<String>> + Send;
}

impl SnapshotApi for FleetClient {
    async fn list_snapshots(&self, scope: &Scope, instance_id: &str) -> CliResult<Vec<Snapshot>> {
        Self::list_snapshots(self, scope, instance_id).await
    }

    async fn describe_snapshot(
        &self,
        scope: &Scope,
        instance_id: &str,
        snapshot_id: &str,
    ) -> CliResult<Snapshot> {
        Self::describe_snapshot(self, scope, instance_id, snapshot_id).await
    }

    async fn create_snapshot(&self, scope: &Scope, instance_id: &str) -> CliResult<String> {
        Self::create_snapshot(self, scope, instance_id).await
    }

    async fn delete_snapshot(
        &self,
        scope: &Scope,
        instance_id: &str,
        snapshot_id: &str,
    ) -> CliResult<()> {
        Self::delete_snapshot(self, scope, instance_id, snapshot_id).await
    }

    async fn restore_snapshot(
        &self,
        scope: &Scope,
        instance_id: &str,
        snapshot_id: &str,
        params: &Map<String, Value>,
    ) -> CliResult<String> {
        Self::restore_snapshot(self, scope, instance_id, snapshot_id, params).await
    }
}

/// Snapshot command executor.
pub struct SnapshotCommand<C> {
    client: C,
    scope: Scope,
    poll_interval: Duration,
    cancel: CancellationToken,
}

impl<C> SnapshotCommand<C>
where
    C: SnapshotApi + WorkflowSource,
{
    /// Create a new snapshot command.
    #[must_use]
    pub fn new(client: C, scope: Scope, poll_interval: Duration, cancel: CancellationToken) -> Self {
        Self {
            client,
            scope,
            poll_interval,
            cancel,
        }
    }

    /// Execute a snapshot subcommand.
    ///
    /// # Errors
    ///
    /// Returns an error if the API call fails, or if a followed restore
    /// workflow fails or is interrupted.
    pub async fn execute<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        command: &SnapshotCommands,
    ) -> CliResult<()> {
        match command {
            SnapshotCommands::List { instance } => {
                let snapshots = self.client.list_snapshots(&self.scope, instance).await?;
                let list = SnapshotList {
                    instance_id: instance.clone(),
                    snapshots,
                };
                format.write(writer, &list)?;
            }
            SnapshotCommands::Describe { id, instance } => {
                let snapshot = self
                    .client
                    .describe_snapshot(&self.scope, instance, id)
                    .await?;
                format.write(writer, &snapshot)?;
            }
            SnapshotCommands::Create { instance } => {
                let id = self.client.create_snapshot(&self.scope, instance).await?;
                let msg = Message::success(format!("Snapshot {id} of {instance} requested"))
                    .with_id(&id);
                format.write(writer, &msg)?;
            }
            SnapshotCommands::Delete { id, instance } => {
                self.client.delete_snapshot(&self.scope, instance, id).await?;
                format.write(writer, &Message::success(format!("Snapshot {id} deleted")))?;
            }
            SnapshotCommands::Restore {
                id,
                instance,
                params,
                wait,
            } => {
                let params = parse_params(params)?;
                let restored = self
                    .client
                    .restore_snapshot(&self.scope, instance, id, &params)
                    .await?;
                let msg = Message::success(format!(
                    "Snapshot {id} restoring into instance {restored}"
                ))
                .with_id(&restored);

                if !wait.wait {
                    return format.write(writer, &msg);
                }
                if !format.is_json() {
                    format.write(writer, &msg)?;
                }
                let interval = interval_from_secs(wait.poll_interval, self.poll_interval);
                WorkflowFollower::new(interval, self.cancel.clone())
                    .follow(
                        &self.client,
                        &self.scope,
                        &restored,
                        ActionType::Restore,
                        writer,
                        format,
                    )
                    .await?;
            }
        }
        Ok(())
    }
}

/// Fake snapshot API for testing.
#[cfg(test)]
pub struct FakeSnapshotApi {
    snapshots: Vec<Snapshot>,
    calls: std::sync::Arc<std::sync::Mutex<Vec<String>>>,
    workflow: crate::commands::workflow::ScriptedSource,
}

#[cfg(test)]
impl FakeSnapshotApi {
    /// Create a fake with no snapshots whose workflows finish successfully.
    pub fn new() -> Self {
        Self {
            snapshots: vec![],
            calls: std::sync::Arc::new(std::sync::Mutex::new(vec![])),
            workflow: crate::commands::workflow::ScriptedSource::finished("success"),
        }
    }

    /// Add a snapshot.
    #[must_use]
    pub fn with_snapshot(mut self, id: &str, status: &str) -> Self {
        self.snapshots.push(Snapshot {
            snapshot_id: id.to_string(),
            status: status.to_string(),
            ..Snapshot::default()
        });
        self
    }

    /// Calls received, as `operation:id` strings.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("lock").clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().expect("lock").push(call);
    }
}

#[cfg(test)]
impl SnapshotApi for FakeSnapshotApi {
    async fn list_snapshots(&self, _scope: &Scope, _instance_id: &str) -> CliResult<Vec<Snapshot>> {
        Ok(self.snapshots.clone())
    }

    async fn describe_snapshot(
        &self,
        _scope: &Scope,
        _instance_id: &str,
        snapshot_id: &str,
    ) -> CliResult<Snapshot> {
        self.snapshots
            .iter()
            .find(|s| s.snapshot_id == snapshot_id)
            .cloned()
            .ok_or_else(|| crate::error::CliError::NotFound {
                kind: "snapshot",
                id: snapshot_id.to_string(),
            })
    }

    async fn create_snapshot(&self, _scope: &Scope, instance_id: &str) -> CliResult<String> {
        self.record(format!("create:{instance_id}"));
        Ok("snap-new".to_string())
    }

    async fn delete_snapshot(
        &self,
        _scope: &Scope,
        instance_id: &str,
        snapshot_id: &str,
    ) -> CliResult<()> {
        self.record(format!("delete:{instance_id}:{snapshot_id}"));
        Ok(())
    }

    async fn restore_snapshot(
        &self,
        _scope: &Scope,
        instance_id: &str,
        snapshot_id: &str,
        params: &Map<String, Value>,
    ) -> CliResult<String> {
        self.record(format!(
            "restore:{instance_id}:{snapshot_id}:{}",
            params.len()
        ));
        Ok("instance-restored".to_string())
    }
}

#[cfg(test)]
impl WorkflowSource for FakeSnapshotApi {
    async fn fetch(
        &self,
        query: &omni_workflow::WorkflowQuery,
    ) -> omni_workflow::WorkflowResult<omni_workflow::WorkflowFetch> {
        self.record(format!("workflow:{}:{}", query.action, query.instance_id));
        self.workflow.fetch(query).await
    }
}
