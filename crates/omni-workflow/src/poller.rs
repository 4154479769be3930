//! Fixed-interval workflow polling loop.
//!
//! Each tick fetches a fresh snapshot of every resource's debug events,
//! classifies it, refreshes the spinners and checks for termination. Nothing
//! is carried between ticks except the spinner bookkeeping, so tick N always
//! supersedes tick N-1.

use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{WorkflowError, WorkflowResult};
use crate::progress::{ProgressDisplay, SpinnerBoard, SpinnerOutcome};
use crate::resource::{ResourceStatus, ResourceWorkflowSnapshot};
use crate::workflow::{Decision, Termination, Verdict, WorkflowInfo};

/// Default time between polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Default spinner animation period.
pub const DEFAULT_ANIMATION_TICK: Duration = Duration::from_millis(100);

/// Deployment action whose workflow is tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    /// Instance creation.
    Create,
    /// Parameter modification.
    Modify,
    /// Instance deletion.
    Delete,
    /// Restore from snapshot.
    Restore,
    /// Instance start.
    Start,
    /// Instance stop.
    Stop,
    /// Instance restart.
    Restart,
    /// Version upgrade.
    Upgrade,
}

impl ActionType {
    /// Returns the lowercase action name used by the API.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Modify => "modify",
            Self::Delete => "delete",
            Self::Restore => "restore",
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Restart => "restart",
            Self::Upgrade => "upgrade",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "create" => Ok(Self::Create),
            "modify" => Ok(Self::Modify),
            "delete" => Ok(Self::Delete),
            "restore" => Ok(Self::Restore),
            "start" => Ok(Self::Start),
            "stop" => Ok(Self::Stop),
            "restart" => Ok(Self::Restart),
            "upgrade" => Ok(Self::Upgrade),
            other => Err(format!("unknown action type: {other}")),
        }
    }
}

/// Identifies the workflow to follow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowQuery {
    /// Service ID.
    pub service_id: String,
    /// Environment ID.
    pub environment_id: String,
    /// Instance ID.
    pub instance_id: String,
    /// Action whose workflow is followed.
    pub action: ActionType,
    /// Ask the API for enhanced (step-level) status.
    pub enhanced: bool,
}

/// Result of one fetch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowFetch {
    /// Per-resource snapshots.
    #[serde(default)]
    pub resources: Vec<ResourceWorkflowSnapshot>,
    /// Workflow record, absent if no workflow exists for the instance/action.
    #[serde(default, alias = "workflowInfo")]
    pub workflow: Option<WorkflowInfo>,
}

/// Source of workflow snapshots.
pub trait WorkflowSource: Send + Sync {
    /// Fetches the current snapshot for a workflow.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails. The poller treats this as
    /// transient and retries on the next tick.
    fn fetch(
        &self,
        query: &WorkflowQuery,
    ) -> impl Future<Output = WorkflowResult<WorkflowFetch>> + Send;
}

impl<S: WorkflowSource + ?Sized> WorkflowSource for &S {
    fn fetch(
        &self,
        query: &WorkflowQuery,
    ) -> impl Future<Output = WorkflowResult<WorkflowFetch>> + Send {
        (**self).fetch(query)
    }
}

/// Polling cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollerConfig {
    /// Time between polls.
    pub interval: Duration,
    /// Spinner animation period between polls.
    pub animation_tick: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            animation_tick: DEFAULT_ANIMATION_TICK,
        }
    }
}

impl PollerConfig {
    /// Creates a config with the given poll interval.
    #[must_use]
    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval,
            ..Self::default()
        }
    }
}

/// Final status of one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceReport {
    /// Resource key.
    pub key: String,
    /// Display name.
    pub name: String,
    /// Final status.
    pub status: ResourceStatus,
}

/// Outcome of a successful poll run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkflowReport {
    /// Last workflow status seen, `None` if there was no workflow to track.
    pub workflow_status: Option<String>,
    /// Overall verdict.
    pub verdict: Verdict,
    /// Number of fetches issued.
    pub polls: u32,
    /// Final per-resource statuses.
    pub resources: Vec<ResourceReport>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PollState {
    Initializing,
    Polling,
}

/// Polls a workflow until it terminates, fails or is cancelled.
#[derive(Debug)]
pub struct WorkflowPoller<S> {
    source: S,
    query: WorkflowQuery,
    config: PollerConfig,
}

impl<S: WorkflowSource> WorkflowPoller<S> {
    /// Creates a poller with the default cadence.
    #[must_use]
    pub fn new(source: S, query: WorkflowQuery) -> Self {
        Self::with_config(source, query, PollerConfig::default())
    }

    /// Creates a poller with a custom cadence.
    #[must_use]
    pub fn with_config(source: S, query: WorkflowQuery, mut config: PollerConfig) -> Self {
        if config.animation_tick.is_zero() {
            config.animation_tick = DEFAULT_ANIMATION_TICK;
        }
        Self {
            source,
            query,
            config,
        }
    }

    /// Returns the query being followed.
    #[must_use]
    pub fn query(&self) -> &WorkflowQuery {
        &self.query
    }

    /// Runs the polling loop.
    ///
    /// Fetch errors are logged and retried on the next tick. The loop has no
    /// deadline of its own; use `cancel` to bound it.
    ///
    /// # Errors
    ///
    /// - [`WorkflowError::ResourceFailed`] as soon as any resource fails
    /// - [`WorkflowError::WorkflowFailed`] if the workflow ends failed or cancelled
    /// - [`WorkflowError::Cancelled`] if `cancel` fires
    pub async fn run<D>(
        &self,
        display: &mut D,
        cancel: &CancellationToken,
    ) -> WorkflowResult<WorkflowReport>
    where
        D: ProgressDisplay + ?Sized,
    {
        let mut board = SpinnerBoard::default();
        let mut state = PollState::Initializing;
        let mut polls: u32 = 0;

        debug!(
            instance = %self.query.instance_id,
            action = %self.query.action,
            interval_secs = self.config.interval.as_secs(),
            "Following workflow"
        );

        loop {
            if cancel.is_cancelled() {
                return Err(WorkflowError::Cancelled);
            }

            polls += 1;
            let fetched = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(WorkflowError::Cancelled),
                result = self.source.fetch(&self.query) => result,
            };

            match fetched {
                Ok(fetch) => {
                    if let Some(report) =
                        Self::apply(fetch, &mut board, display, &mut state, polls)?
                    {
                        return Ok(report);
                    }
                }
                Err(e) => {
                    // The display owns stderr while spinners are live.
                    debug!(poll = polls, error = %e, "Workflow fetch failed, retrying");
                    display.note(&format!("Fetch failed, retrying: {e}"));
                }
            }

            self.pause(&board, display, cancel).await?;
        }
    }

    /// Applies one fetch. Returns a report when polling should stop successfully.
    fn apply<D>(
        fetch: WorkflowFetch,
        board: &mut SpinnerBoard,
        display: &mut D,
        state: &mut PollState,
        polls: u32,
    ) -> WorkflowResult<Option<WorkflowReport>>
    where
        D: ProgressDisplay + ?Sized,
    {
        let Some(workflow) = fetch.workflow else {
            info!(poll = polls, "No workflow found, nothing to track");
            let mut resources = Vec::new();
            for key in board.unresolved() {
                let name = board.name(&key).to_string();
                let status = ResourceStatus::Completed;
                let text = format!("{name}: {status}");
                board.resolve(display, &key, SpinnerOutcome::Success, &text);
                resources.push(ResourceReport { key, name, status });
            }
            return Ok(Some(WorkflowReport {
                workflow_status: None,
                verdict: Verdict::Success,
                polls,
                resources,
            }));
        };

        if *state == PollState::Initializing && !fetch.resources.is_empty() {
            debug!(resources = fetch.resources.len(), "Creating resource spinners");
            *state = PollState::Polling;
        }

        let mut statuses = Vec::with_capacity(fetch.resources.len());
        for resource in &fetch.resources {
            let status = resource.resource_status();
            let line = resource.summary_line(status);
            board.show(display, resource.key(), resource.display_name(), &line);
            if status == ResourceStatus::Failed {
                board.resolve(display, resource.key(), SpinnerOutcome::Error, &line);
            }
            statuses.push((resource.key().to_string(), status));
        }

        let signal = workflow.signal();
        debug!(
            poll = polls,
            workflow_status = %workflow.status,
            resources = statuses.len(),
            "Workflow polled"
        );

        match Termination::evaluate(&signal, &statuses) {
            Decision::Continue => Ok(None),
            Decision::ResourceFailed { key } => {
                let resource = board.name(&key).to_string();
                for other in board.unresolved() {
                    let text = format!("{}: stopped", board.name(&other));
                    board.resolve(display, &other, SpinnerOutcome::Error, &text);
                }
                warn!(resource = %resource, poll = polls, "Resource failed, stopping");
                Err(WorkflowError::ResourceFailed { resource })
            }
            Decision::Terminal { verdict, forced } => {
                let fallback = match verdict {
                    Verdict::Success => ResourceStatus::Completed,
                    Verdict::Failure => ResourceStatus::Failed,
                };
                let mut resources = Vec::with_capacity(forced.len());
                for (key, status) in forced {
                    let name = board.name(&key).to_string();
                    let text = fetch
                        .resources
                        .iter()
                        .find(|r| r.key() == key)
                        .map_or_else(|| format!("{name}: {status}"), |r| r.summary_line(status));
                    board.resolve(display, &key, outcome_for(status), &text);
                    resources.push(ResourceReport { key, name, status });
                }
                // Spinners for resources missing from the final fetch.
                for key in board.unresolved() {
                    let name = board.name(&key).to_string();
                    let text = format!("{name}: {fallback}");
                    board.resolve(display, &key, outcome_for(fallback), &text);
                    resources.push(ResourceReport {
                        key,
                        name,
                        status: fallback,
                    });
                }

                info!(
                    workflow_status = %workflow.status,
                    verdict = ?verdict,
                    polls,
                    "Workflow finished"
                );

                match verdict {
                    Verdict::Success => Ok(Some(WorkflowReport {
                        workflow_status: Some(workflow.status),
                        verdict,
                        polls,
                        resources,
                    })),
                    Verdict::Failure => Err(WorkflowError::WorkflowFailed {
                        status: workflow.status,
                    }),
                }
            }
        }
    }

    /// Sleeps until the next poll, animating spinners and honouring cancellation.
    async fn pause<D>(
        &self,
        board: &SpinnerBoard,
        display: &mut D,
        cancel: &CancellationToken,
    ) -> WorkflowResult<()>
    where
        D: ProgressDisplay + ?Sized,
    {
        let deadline = Instant::now() + self.config.interval;
        let mut ticker = tokio::time::interval(self.config.animation_tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(WorkflowError::Cancelled),
                () = tokio::time::sleep_until(deadline) => return Ok(()),
                _ = ticker.tick() => {
                    if !board.is_empty() {
                        display.tick();
                    }
                }
            }
        }
    }
}

const fn outcome_for(status: ResourceStatus) -> SpinnerOutcome {
    match status {
        ResourceStatus::Failed => SpinnerOutcome::Error,
        _ => SpinnerOutcome::Success,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_type_parses_case_insensitively() {
        assert_eq!("Create".parse::<ActionType>(), Ok(ActionType::Create));
        assert_eq!("restore".parse::<ActionType>(), Ok(ActionType::Restore));
        assert!("explode".parse::<ActionType>().is_err());
    }

    #[test]
    fn action_type_displays_lowercase() {
        assert_eq!(ActionType::Upgrade.to_string(), "upgrade");
    }

    #[test]
    fn default_config_polls_every_ten_seconds() {
        let config = PollerConfig::default();
        assert_eq!(config.interval, Duration::from_secs(10));
        assert!(!config.animation_tick.is_zero());
    }

    #[test]
    fn fetch_deserializes_without_workflow() {
        let fetch: WorkflowFetch =
            serde_json::from_str(r#"{"resources": []}"#).expect("valid fetch");
        assert!(fetch.workflow.is_none());
    }

    #[test]
    fn outcome_follows_status() {
        assert_eq!(outcome_for(ResourceStatus::Failed), SpinnerOutcome::Error);
        assert_eq!(outcome_for(ResourceStatus::Completed), SpinnerOutcome::Success);
    }
}
