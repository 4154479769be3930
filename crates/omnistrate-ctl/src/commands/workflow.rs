//! Following a deployment workflow to completion.
//!
//! Mutating commands run with `--wait` and `instance workflow` hand the
//! instance over to a [`WorkflowFollower`], which drives the poller with the
//! right display for the output format and prints the closing banner.

use std::io::Write;
use std::time::Duration;

use omni_workflow::{
    ActionType, NullDisplay, PollerConfig, ProgressDisplay, WorkflowPoller, WorkflowQuery,
    WorkflowSource,
};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::Scope;
use crate::error::CliResult;
use crate::output::{OutputFormat, WorkflowSummary};
use crate::progress::TerminalDisplay;

/// Runs the workflow poller on behalf of a command.
#[derive(Debug, Clone)]
pub struct WorkflowFollower {
    config: PollerConfig,
    cancel: CancellationToken,
}

impl WorkflowFollower {
    /// Creates a follower polling at `interval` until `cancel` fires.
    #[must_use]
    pub fn new(interval: Duration, cancel: CancellationToken) -> Self {
        Self::with_config(PollerConfig::with_interval(interval), cancel)
    }

    /// Creates a follower with a full poller configuration.
    #[must_use]
    pub fn with_config(config: PollerConfig, cancel: CancellationToken) -> Self {
        Self { config, cancel }
    }

    /// Time between polls.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.config.interval
    }

    /// Follows `action` on `instance_id`, drawing spinners on stderr for
    /// table output and none for JSON.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CliError::Workflow`] if the workflow fails or is cancelled.
    pub async fn follow<S, W>(
        &self,
        source: S,
        scope: &Scope,
        instance_id: &str,
        action: ActionType,
        writer: &mut W,
        format: &OutputFormat,
    ) -> CliResult<()>
    where
        S: WorkflowSource,
        W: Write,
    {
        let query = query(scope, instance_id, action);
        if format.is_json() {
            self.follow_with(source, query, &mut NullDisplay, writer, format)
                .await
        } else {
            let mut display = TerminalDisplay::stderr();
            self.follow_with(source, query, &mut display, writer, format)
                .await
        }
    }

    /// Follows a workflow using the given display.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CliError::Workflow`] if the workflow fails or is cancelled.
    pub async fn follow_with<S, D, W>(
        &self,
        source: S,
        query: WorkflowQuery,
        display: &mut D,
        writer: &mut W,
        format: &OutputFormat,
    ) -> CliResult<()>
    where
        S: WorkflowSource,
        D: ProgressDisplay + ?Sized,
        W: Write,
    {
        let instance_id = query.instance_id.clone();
        let action = query.action;
        let poller = WorkflowPoller::with_config(source, query, self.config);

        match poller.run(display, &self.cancel).await {
            Ok(report) => {
                info!(
                    instance = %instance_id,
                    action = %action,
                    polls = report.polls,
                    "Workflow finished"
                );
                let summary = WorkflowSummary {
                    instance_id,
                    action: action.to_string(),
                    report,
                };
                format.write(writer, &summary)
            }
            Err(e) => {
                if !e.is_cancelled() && !format.is_json() {
                    writeln!(writer, "✗ {action} of {instance_id} failed: {e}")?;
                }
                Err(e.into())
            }
        }
    }
}

fn query(scope: &Scope, instance_id: &str, action: ActionType) -> WorkflowQuery {
    WorkflowQuery {
        service_id: scope.service_id.clone(),
        environment_id: scope.environment_id.clone(),
        instance_id: instance_id.to_string(),
        action,
        enhanced: true,
    }
}

/// Workflow source that replays a fixed sequence of fetches.
#[cfg(test)]
pub struct ScriptedSource {
    script: std::sync::Mutex<Vec<omni_workflow::WorkflowResult<omni_workflow::WorkflowFetch>>>,
    queries: std::sync::Arc<std::sync::Mutex<Vec<WorkflowQuery>>>,
}

#[cfg(test)]
impl ScriptedSource {
    /// Returns each result in turn, repeating the last one forever.
    pub fn new(script: Vec<omni_workflow::WorkflowResult<omni_workflow::WorkflowFetch>>) -> Self {
        Self {
            script: std::sync::Mutex::new(script),
            queries: std::sync::Arc::new(std::sync::Mutex::new(vec![])),
        }
    }

    /// A workflow that already finished with `status` and one completed resource.
    pub fn finished(status: &str) -> Self {
        use omni_workflow::{
            DebugEvent, EventType, ResourceWorkflowSnapshot, WorkflowFetch, WorkflowInfo,
        };

        let mut resource = ResourceWorkflowSnapshot::new("r-1", "writer");
        resource
            .steps
            .events_mut(omni_workflow::WorkflowStep::Compute)
            .push(DebugEvent::new(EventType::Completed));
        Self::new(vec![Ok(WorkflowFetch {
            resources: vec![resource],
            workflow: Some(WorkflowInfo::with_status(status)),
        })])
    }

    /// Queries received so far.
    pub fn queries(&self) -> Vec<WorkflowQuery> {
        self.queries.lock().expect("lock").clone()
    }
}

#[cfg(test)]
impl WorkflowSource for ScriptedSource {
    async fn fetch(
        &self,
        query: &WorkflowQuery,
    ) -> omni_workflow::WorkflowResult<omni_workflow::WorkflowFetch> {
        self.queries.lock().expect("lock").push(query.clone());
        let mut script = self.script.lock().expect("lock");
        if script.len() > 1 {
            script.remove(0)
        } else {
            script
                .first()
                .cloned()
                .unwrap_or(Ok(omni_workflow::WorkflowFetch::default()))
        }
    }
}
