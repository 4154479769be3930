//! Instance management command implementation.
//!
//! Provides subcommands for:
//! - Listing and describing instances
//! - Creating, modifying and deleting instances
//! - Starting, stopping and restarting instances
//! - Following an instance's deployment workflow

use std::future::Future;
use std::io::Write;
use std::time::Duration;

use omni_workflow::{ActionType, WorkflowSource};
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use crate::cli::{InstanceCommands, WaitArgs};
use crate::client::{FleetClient, PowerAction};
use crate::commands::workflow::WorkflowFollower;
use crate::config::{Scope, interval_from_secs};
use crate::error::{CliError, CliResult};
use crate::model::{CreateInstanceRequest, Instance, parse_params};
use crate::output::{InstanceList, Message, OutputFormat};

/// Instance operations of the fleet API.
pub trait InstanceApi: Send + Sync {
    /// List instances.
    fn list_instances(&self, scope: &Scope) -> impl Future<Output = CliResult<Vec<Instance>>> + Send;

    /// Get one instance.
    fn describe_instance(
        &self,
        scope: &Scope,
        id: &str,
    ) -> impl Future<Output = CliResult<Instance>> + Send;

    /// Create an instance, returning its ID.
    fn create_instance(
        &self,
        scope: &Scope,
        request: &CreateInstanceRequest,
    ) -> impl Future<Output = CliResult<String>> + Send;

    /// Change instance parameters.
    fn modify_instance(
        &self,
        scope: &Scope,
        id: &str,
        params: &Map<String, Value>,
    ) -> impl Future<Output = CliResult<()>> + Send;

    /// Delete an instance.
    fn delete_instance(&self, scope: &Scope, id: &str) -> impl Future<Output = CliResult<()>> + Send;

    /// Start, stop or restart an instance.
    fn power_action(
        &self,
        scope: &Scope,
        id: &str,
        action: PowerAction,
    ) -> impl Future<Output = CliResult<()>> + Send;
}

impl InstanceApi for FleetClient {
    async fn list_instances(&self, scope: &Scope) -> CliResult<Vec<Instance>> {
        Self::list_instances(self, scope).await
    }

    async fn describe_instance(&self, scope: &Scope, id: &str) -> CliResult<Instance> {
        Self::describe_instance(self, scope, id).await
    }

    async fn create_instance(
        &self,
        scope: &Scope,
        request: &CreateInstanceRequest,
    ) -> CliResult<String> {
        Self::create_instance(self, scope, request).await
    }

    async fn modify_instance(
        &self,
        scope: &Scope,
        id: &str,
        params: &Map<String, Value>,
    ) -> CliResult<()> {
        Self::modify_instance(self, scope, id, params).await
    }

    async fn delete_instance(&self, scope: &Scope, id: &str) -> CliResult<()> {
        Self::delete_instance(self, scope, id).await
    }

    async fn power_action(&self, scope: &Scope, id: &str, action: PowerAction) -> CliResult<()> {
        Self::power_action(self, scope, id, action).await
    }
}

/// Instance command executor.
pub struct InstanceCommand<C> {
    client: C,
    scope: Scope,
    poll_interval: Duration,
    cancel: CancellationToken,
}

impl<C> InstanceCommand<C>
where
    C: InstanceApi + WorkflowSource,
{
    /// Create a new instance command.
    #[must_use]
    pub fn new(client: C, scope: Scope, poll_interval: Duration, cancel: CancellationToken) -> Self {
        Self {
            client,
            scope,
            poll_interval,
            cancel,
        }
    }

    /// Execute an instance subcommand.
    ///
    /// # Errors
    ///
    /// Returns an error if the API call fails, or if a followed workflow
    /// fails or is interrupted.
    pub async fn execute<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        command: &InstanceCommands,
    ) -> CliResult<()> {
        match command {
            InstanceCommands::List => {
                let instances = self.client.list_instances(&self.scope).await?;
                format.write(writer, &InstanceList { instances })?;
            }
            InstanceCommands::Describe { id } => {
                let instance = self.client.describe_instance(&self.scope, id).await?;
                format.write(writer, &instance)?;
            }
            InstanceCommands::Create(args) => {
                let request = CreateInstanceRequest {
                    resource_id: args.resource.clone(),
                    cloud_provider: args.cloud_provider.clone(),
                    region: args.region.clone(),
                    request_params: parse_params(&args.params)?,
                };
                let id = self.client.create_instance(&self.scope, &request).await?;
                let message = Message::success(format!("Instance {id} created")).with_id(&id);
                self.finish(writer, format, message, &id, ActionType::Create, &args.wait)
                    .await?;
            }
            InstanceCommands::Modify { id, params, wait } => {
                if params.is_empty() {
                    return Err(CliError::invalid("at least one --param is required"));
                }
                let params = parse_params(params)?;
                self.client.modify_instance(&self.scope, id, &params).await?;
                let message = Message::success(format!("Instance {id} modification requested"));
                self.finish(writer, format, message, id, ActionType::Modify, wait)
                    .await?;
            }
            InstanceCommands::Delete { id, wait } => {
                self.client.delete_instance(&self.scope, id).await?;
                let message = Message::success(format!("Instance {id} deletion requested"));
                self.finish(writer, format, message, id, ActionType::Delete, wait)
                    .await?;
            }
            InstanceCommands::Start { id, wait } => {
                self.power(writer, format, id, PowerAction::Start, wait).await?;
            }
            InstanceCommands::Stop { id, wait } => {
                self.power(writer, format, id, PowerAction::Stop, wait).await?;
            }
            InstanceCommands::Restart { id, wait } => {
                self.power(writer, format, id, PowerAction::Restart, wait).await?;
            }
            InstanceCommands::Workflow {
                id,
                action,
                poll_interval,
            } => {
                self.follower(*poll_interval)
                    .follow(&self.client, &self.scope, id, *action, writer, format)
                    .await?;
            }
        }
        Ok(())
    }

    async fn power<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        id: &str,
        action: PowerAction,
        wait: &WaitArgs,
    ) -> CliResult<()> {
        self.client.power_action(&self.scope, id, action).await?;
        let message = Message::success(format!("Instance {id} {} requested", action.as_str()));
        let workflow = match action {
            PowerAction::Start => ActionType::Start,
            PowerAction::Stop => ActionType::Stop,
            PowerAction::Restart => ActionType::Restart,
        };
        self.finish(writer, format, message, id, workflow, wait).await
    }

    /// Prints the acknowledgement and, with `--wait`, follows the workflow.
    ///
    /// JSON output carries a single document: the acknowledgement without
    /// `--wait`, the workflow summary with it.
    async fn finish<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        message: Message,
        id: &str,
        action: ActionType,
        wait: &WaitArgs,
    ) -> CliResult<()> {
        if !wait.wait {
            return format.write(writer, &message);
        }
        if !format.is_json() {
            format.write(writer, &message)?;
        }
        self.follower(wait.poll_interval)
            .follow(&self.client, &self.scope, id, action, writer, format)
            .await
    }

    fn follower(&self, override_secs: Option<u64>) -> WorkflowFollower {
        WorkflowFollower::new(
            interval_from_secs(override_secs, self.poll_interval),
            self.cancel.clone(),
        )
    }
}

/// Fake instance API for testing.
#[cfg(test)]
pub struct FakeInstanceApi {
    instances: Vec<Instance>,
    calls: std::sync::Arc<std::sync::Mutex<Vec<String>>>,
    workflow: crate::commands::workflow::ScriptedSource,
}

#[cfg(test)]
impl FakeInstanceApi {
    /// Create a fake with no instances whose workflows finish successfully.
    pub fn new() -> Self {
        Self {
            instances: vec![],
            calls: std::sync::Arc::new(std::sync::Mutex::new(vec![])),
            workflow: crate::commands::workflow::ScriptedSource::finished("success"),
        }
    }

    /// Add an instance.
    #[must_use]
    pub fn with_instance(mut self, id: &str, status: &str) -> Self {
        self.instances.push(Instance {
            id: id.to_string(),
            status: status.to_string(),
            ..Instance::default()
        });
        self
    }

    /// Make followed workflows finish with `status`.
    #[must_use]
    pub fn with_workflow_status(mut self, status: &str) -> Self {
        self.workflow = crate::commands::workflow::ScriptedSource::finished(status);
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
impl InstanceApi for FakeInstanceApi {
    async fn list_instances(&self, _scope: &Scope) -> CliResult<Vec<Instance>> {
        Ok(self.instances.clone())
    }

    async fn describe_instance(&self, _scope: &Scope, id: &str) -> CliResult<Instance> {
        self.instances
            .iter()
            .find(|i| i.id == id)
            .cloned()
            .ok_or_else(|| CliError::NotFound {
                kind: "instance",
                id: id.to_string(),
            })
    }

    async fn create_instance(
        &self,
        _scope: &Scope,
        request: &CreateInstanceRequest,
    ) -> CliResult<String> {
        self.record(format!("create:{}", request.resource_id));
        Ok("instance-new".to_string())
    }

    async fn modify_instance(
        &self,
        _scope: &Scope,
        id: &str,
        params: &Map<String, Value>,
    ) -> CliResult<()> {
        let mut keys: Vec<_> = params.keys().cloned().collect();
        keys.sort();
        self.record(format!("modify:{id}:{}", keys.join(",")));
        Ok(())
    }

    async fn delete_instance(&self, _scope: &Scope, id: &str) -> CliResult<()> {
        self.record(format!("delete:{id}"));
        Ok(())
    }

    async fn power_action(&self, _scope: &Scope, id: &str, action: PowerAction) -> CliResult<()> {
        self.record(format!("{}:{id}", action.as_str()));
        Ok(())
    }
}

#[cfg(test)]
impl WorkflowSource for FakeInstanceApi {
    async fn fetch(
        &self,
        query: &omni_workflow::WorkflowQuery,
    ) -> omni_workflow::WorkflowResult<omni_workflow::WorkflowFetch> {
        self.record(format!("workflow:{}:{}", query.action, query.instance_id));
        self.workflow.fetch(query).await
    }
}
