//! Error types for workflow tracking.

use thiserror::Error;

/// Result type alias for workflow operations.
pub type WorkflowResult<T> = Result<T, WorkflowError>;

/// Errors that end a workflow poll.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    /// A resource reported a failed step; polling stopped early.
    #[error("resource {resource} failed")]
    ResourceFailed {
        /// Name of the failed resource.
        resource: String,
    },

    /// The workflow finished in a non-success terminal state.
    #[error("workflow finished with status {status}")]
    WorkflowFailed {
        /// Status string reported by the fleet API.
        status: String,
    },

    /// Polling was cancelled from outside.
    #[error("workflow polling cancelled")]
    Cancelled,

    /// Fetching workflow events failed.
    #[error("failed to fetch workflow events: {0}")]
    Fetch(String),
}

impl WorkflowError {
    /// Creates a fetch error from anything displayable.
    #[must_use]
    pub fn fetch(err: impl std::fmt::Display) -> Self {
        Self::Fetch(err.to_string())
    }

    /// Returns true if this error is an external cancellation rather than a
    /// deployment failure.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_failed_names_resource() {
        let err = WorkflowError::ResourceFailed {
            resource: "postgres-writer".into(),
        };
        assert_eq!(err.to_string(), "resource postgres-writer failed");
    }

    #[test]
    fn workflow_failed_includes_status() {
        let err = WorkflowError::WorkflowFailed {
            status: "cancelled".into(),
        };
        assert!(err.to_string().contains("cancelled"));
        assert!(!err.is_cancelled());
    }

    #[test]
    fn cancelled_is_distinguishable() {
        assert!(WorkflowError::Cancelled.is_cancelled());
        assert!(!WorkflowError::fetch("timeout").is_cancelled());
    }
}
