//! Debug event records as reported by the fleet API.
//!
//! Only the event-type tag matters for classification; everything else is
//! carried along as opaque metadata.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Event-type tag of a debug event.
///
/// Tags are matched case-insensitively, and the `WorkflowStep` / `Step`
/// prefixes used by some API versions are ignored, so `"WorkflowStepFailed"`,
/// `"failed"` and `"FAILED"` all parse to [`EventType::Failed`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventType {
    /// The step started.
    Started,
    /// Intermediate progress for the step.
    Debug,
    /// The step completed.
    Completed,
    /// The step failed.
    Failed,
    /// A tag outside the known vocabulary.
    Other(String),
}

impl EventType {
    /// Parses a wire tag.
    #[must_use]
    pub fn parse(tag: &str) -> Self {
        let lower = tag.trim().to_ascii_lowercase();
        let bare = lower
            .strip_prefix("workflowstep")
            .or_else(|| lower.strip_prefix("step"))
            .unwrap_or(&lower);

        match bare {
            "started" | "start" => Self::Started,
            "debug" => Self::Debug,
            "completed" | "complete" => Self::Completed,
            "failed" | "failure" => Self::Failed,
            _ => Self::Other(tag.to_string()),
        }
    }

    /// Returns the canonical tag.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Started => "WorkflowStepStarted",
            Self::Debug => "WorkflowStepDebug",
            Self::Completed => "WorkflowStepCompleted",
            Self::Failed => "WorkflowStepFailed",
            Self::Other(tag) => tag,
        }
    }
}

impl From<String> for EventType {
    fn from(tag: String) -> Self {
        Self::parse(&tag)
    }
}

impl From<EventType> for String {
    fn from(event_type: EventType) -> Self {
        event_type.as_str().to_string()
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single debug event for one resource and workflow step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugEvent {
    /// Event-type tag.
    pub event_type: EventType,
    /// Timestamp as reported by the API.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_time: Option<String>,
    /// Human-readable message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Remaining fields, not interpreted.
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

impl DebugEvent {
    /// Creates an event with only a type tag.
    #[must_use]
    pub fn new(event_type: EventType) -> Self {
        Self {
            event_type,
            event_time: None,
            message: None,
            metadata: Map::new(),
        }
    }

    /// Sets the message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("WorkflowStepStarted", EventType::Started ; "prefixed started")]
    #[test_case("started", EventType::Started ; "bare started")]
    #[test_case("STEPDEBUG", EventType::Debug ; "upper step debug")]
    #[test_case("WorkflowStepCompleted", EventType::Completed ; "prefixed completed")]
    #[test_case("Failed", EventType::Failed ; "capitalised failed")]
    #[test_case("WorkflowFailure", EventType::Other("WorkflowFailure".into()) ; "unrelated prefix")]
    fn parses_tags(tag: &str, expected: EventType) {
        assert_eq!(EventType::parse(tag), expected);
    }

    #[test]
    fn deserializes_event_with_metadata() {
        let json = r#"{
            "eventType": "WorkflowStepDebug",
            "eventTime": "2024-05-01T10:00:00Z",
            "message": "pulling image",
            "stepName": "deployment"
        }"#;
        let event: DebugEvent = serde_json::from_str(json).expect("valid event");

        assert_eq!(event.event_type, EventType::Debug);
        assert_eq!(event.message.as_deref(), Some("pulling image"));
        assert_eq!(event.metadata.get("stepName"), Some(&Value::from("deployment")));
    }

    #[test]
    fn unknown_tag_is_preserved() {
        let event: DebugEvent =
            serde_json::from_str(r#"{"eventType": "Heartbeat"}"#).expect("valid event");
        assert_eq!(event.event_type, EventType::Other("Heartbeat".into()));

        let json = serde_json::to_string(&event).expect("serialize");
        assert!(json.contains("\"Heartbeat\""));
    }
}
