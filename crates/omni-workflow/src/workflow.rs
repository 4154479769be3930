//! Workflow-level status and termination detection.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::resource::ResourceStatus;

/// Overall workflow record returned alongside the resource snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowInfo {
    /// Workflow ID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_id: Option<String>,
    /// Raw status string.
    #[serde(alias = "workflowStatus")]
    pub status: String,
}

impl WorkflowInfo {
    /// Creates a workflow record with the given status.
    #[must_use]
    pub fn with_status(status: impl Into<String>) -> Self {
        Self {
            workflow_id: None,
            status: status.into(),
        }
    }

    /// Interprets the status string.
    #[must_use]
    pub fn signal(&self) -> WorkflowSignal {
        WorkflowSignal::from_status(&self.status)
    }
}

/// Interpreted workflow status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowSignal {
    /// Workflow succeeded.
    Success,
    /// Workflow failed.
    Failed,
    /// Workflow was cancelled.
    Cancelled,
    /// Any other status; polling continues.
    InProgress(String),
}

impl WorkflowSignal {
    /// Parses a status string, ignoring case.
    #[must_use]
    pub fn from_status(status: &str) -> Self {
        match status.trim().to_ascii_lowercase().as_str() {
            "success" => Self::Success,
            "failed" => Self::Failed,
            "cancelled" => Self::Cancelled,
            _ => Self::InProgress(status.to_string()),
        }
    }

    /// Returns true for success, failed and cancelled.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::InProgress(_))
    }
}

impl fmt::Display for WorkflowSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => f.write_str("success"),
            Self::Failed => f.write_str("failed"),
            Self::Cancelled => f.write_str("cancelled"),
            Self::InProgress(status) => f.write_str(status),
        }
    }
}

/// Pass/fail outcome of a whole workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    /// Everything succeeded.
    Success,
    /// The workflow or a resource failed.
    Failure,
}

/// What the poller should do after a poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Keep polling.
    Continue,
    /// A resource failed; stop now.
    ResourceFailed {
        /// Key of the first failed resource.
        key: String,
    },
    /// The workflow reached a terminal state.
    Terminal {
        /// Overall outcome.
        verdict: Verdict,
        /// Final per-resource statuses after applying the workflow override.
        forced: Vec<(String, ResourceStatus)>,
    },
}

/// Termination rules applied after every poll.
#[derive(Debug, Clone, Copy, Default)]
pub struct Termination;

impl Termination {
    /// Decides whether polling stops.
    ///
    /// A failed resource stops polling regardless of the workflow signal.
    /// Otherwise a terminal workflow signal forces every unresolved resource
    /// to completed (on success) or failed (on failure or cancellation).
    #[must_use]
    pub fn evaluate(signal: &WorkflowSignal, resources: &[(String, ResourceStatus)]) -> Decision {
        if let Some((key, _)) = resources
            .iter()
            .find(|(_, status)| *status == ResourceStatus::Failed)
        {
            return Decision::ResourceFailed { key: key.clone() };
        }

        if !signal.is_terminal() {
            return Decision::Continue;
        }

        let (verdict, fallback) = match signal {
            WorkflowSignal::Success => (Verdict::Success, ResourceStatus::Completed),
            _ => (Verdict::Failure, ResourceStatus::Failed),
        };

        let forced = resources
            .iter()
            .map(|(key, status)| {
                let status = if status.is_terminal() { *status } else { fallback };
                (key.clone(), status)
            })
            .collect();

        Decision::Terminal { verdict, forced }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn statuses(list: &[(&str, ResourceStatus)]) -> Vec<(String, ResourceStatus)> {
        list.iter().map(|(k, s)| ((*k).to_string(), *s)).collect()
    }

    #[test_case("success", true ; "success")]
    #[test_case("SUCCESS", true ; "upper success")]
    #[test_case("Failed", true ; "failed")]
    #[test_case("cancelled", true ; "cancelled")]
    #[test_case("running", false ; "running")]
    #[test_case("pending", false ; "pending")]
    fn terminal_signals(status: &str, terminal: bool) {
        assert_eq!(WorkflowSignal::from_status(status).is_terminal(), terminal);
    }

    #[test]
    fn running_workflow_continues() {
        let decision = Termination::evaluate(
            &WorkflowSignal::from_status("running"),
            &statuses(&[("a", ResourceStatus::Running), ("b", ResourceStatus::Completed)]),
        );
        assert_eq!(decision, Decision::Continue);
    }

    #[test]
    fn failed_resource_stops_running_workflow() {
        let decision = Termination::evaluate(
            &WorkflowSignal::from_status("running"),
            &statuses(&[("a", ResourceStatus::Running), ("b", ResourceStatus::Failed)]),
        );
        assert_eq!(decision, Decision::ResourceFailed { key: "b".into() });
    }

    #[test]
    fn success_forces_running_to_completed() {
        let decision = Termination::evaluate(
            &WorkflowSignal::Success,
            &statuses(&[("a", ResourceStatus::Running), ("b", ResourceStatus::Pending)]),
        );
        assert_eq!(
            decision,
            Decision::Terminal {
                verdict: Verdict::Success,
                forced: statuses(&[
                    ("a", ResourceStatus::Completed),
                    ("b", ResourceStatus::Completed)
                ]),
            }
        );
    }

    #[test]
    fn failed_resource_beats_successful_workflow() {
        let decision = Termination::evaluate(
            &WorkflowSignal::Success,
            &statuses(&[("a", ResourceStatus::Completed), ("b", ResourceStatus::Failed)]),
        );
        assert_eq!(decision, Decision::ResourceFailed { key: "b".into() });
    }

    #[test]
    fn cancelled_forces_failure() {
        let decision = Termination::evaluate(
            &WorkflowSignal::from_status("cancelled"),
            &statuses(&[("a", ResourceStatus::Completed), ("b", ResourceStatus::Running)]),
        );
        assert_eq!(
            decision,
            Decision::Terminal {
                verdict: Verdict::Failure,
                forced: statuses(&[
                    ("a", ResourceStatus::Completed),
                    ("b", ResourceStatus::Failed)
                ]),
            }
        );
    }

    #[test]
    fn workflow_info_accepts_status_alias() {
        let info: WorkflowInfo =
            serde_json::from_str(r#"{"workflowId": "wf-1", "workflowStatus": "Running"}"#)
                .expect("valid");
        assert_eq!(info.workflow_id.as_deref(), Some("wf-1"));
        assert_eq!(info.signal(), WorkflowSignal::InProgress("Running".into()));
    }
}
