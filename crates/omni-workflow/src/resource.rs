//! Per-resource workflow snapshots and status aggregation.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::step::{StepStatus, WorkflowStep, WorkflowSteps};

/// One resource's view of the workflow, as returned by a single poll.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceWorkflowSnapshot {
    /// Resource ID.
    #[serde(default)]
    pub resource_id: String,
    /// Resource display name.
    #[serde(default)]
    pub resource_name: String,
    /// Event streams per workflow step.
    #[serde(default, alias = "workflowSteps")]
    pub steps: WorkflowSteps,
    /// Resource status supplied directly by the API, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl ResourceWorkflowSnapshot {
    /// Creates an empty snapshot for a resource.
    #[must_use]
    pub fn new(resource_id: impl Into<String>, resource_name: impl Into<String>) -> Self {
        Self {
            resource_id: resource_id.into(),
            resource_name: resource_name.into(),
            ..Self::default()
        }
    }

    /// Identity used to key spinners across polls.
    #[must_use]
    pub fn key(&self) -> &str {
        if self.resource_id.is_empty() {
            &self.resource_name
        } else {
            &self.resource_id
        }
    }

    /// Name shown to the user.
    #[must_use]
    pub fn display_name(&self) -> &str {
        if self.resource_name.is_empty() {
            &self.resource_id
        } else {
            &self.resource_name
        }
    }

    /// Derives the resource status.
    ///
    /// An explicit status from the API wins; otherwise the status is inferred
    /// from the step classifications.
    #[must_use]
    pub fn resource_status(&self) -> ResourceStatus {
        match self.status.as_deref().map(str::trim) {
            Some(explicit) if !explicit.is_empty() => ResourceStatus::from_explicit(explicit),
            _ => ResourceStatus::from_steps(&self.steps.classify_all()),
        }
    }

    /// Renders a one-line progress summary for a spinner.
    #[must_use]
    pub fn summary_line(&self, status: ResourceStatus) -> String {
        let steps: Vec<String> = self
            .steps
            .classify_all()
            .into_iter()
            .filter(|(_, class)| class.has_events())
            .map(|(step, class)| format!("{step} {}", class.icon()))
            .collect();

        if steps.is_empty() {
            format!("{}: {status}", self.display_name())
        } else {
            format!("{}: {status} [{}]", self.display_name(), steps.join("  "))
        }
    }
}

/// Aggregated status of one resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceStatus {
    /// No step has emitted events yet.
    Pending,
    /// Some steps are in progress.
    Running,
    /// Every step with events completed.
    Completed,
    /// A step failed.
    Failed,
}

impl ResourceStatus {
    /// Maps an explicit status string from the API.
    ///
    /// A cancelled resource counts as failed. `stopped` is where a stop
    /// action leaves its resources, so it counts as completed.
    #[must_use]
    pub fn from_explicit(status: &str) -> Self {
        match status.trim().to_ascii_lowercase().as_str() {
            "success" | "completed" | "complete" | "ready" | "stopped" => Self::Completed,
            "failed" | "failure" | "error" | "cancelled" | "canceled" => Self::Failed,
            "pending" | "not_started" | "queued" => Self::Pending,
            _ => Self::Running,
        }
    }

    /// Infers a status from step classifications.
    ///
    /// Steps without events neither block completion nor count as failures.
    #[must_use]
    pub fn from_steps(steps: &[(WorkflowStep, StepStatus)]) -> Self {
        if steps.iter().any(|(_, s)| *s == StepStatus::Failed) {
            return Self::Failed;
        }

        let mut active = steps.iter().filter(|(_, s)| s.has_events()).peekable();
        if active.peek().is_none() {
            return Self::Pending;
        }

        if active.all(|(_, s)| *s == StepStatus::Completed) {
            Self::Completed
        } else {
            Self::Running
        }
    }

    /// Returns true for completed or failed.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Returns the lowercase status name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
