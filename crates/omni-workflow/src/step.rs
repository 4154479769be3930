//! Workflow steps and per-step event classification.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::event::{DebugEvent, EventType};

/// A named phase in provisioning one resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowStep {
    /// Bootstrap phase.
    Bootstrap,
    /// Storage provisioning.
    Storage,
    /// Network provisioning.
    Network,
    /// Compute provisioning.
    Compute,
    /// Application deployment.
    Deployment,
    /// Monitoring setup.
    Monitoring,
    /// Events the API could not attribute to a step.
    Unknown,
}

impl WorkflowStep {
    /// All steps in display order.
    pub const ORDERED: [Self; 7] = [
        Self::Bootstrap,
        Self::Storage,
        Self::Network,
        Self::Compute,
        Self::Deployment,
        Self::Monitoring,
        Self::Unknown,
    ];

    /// Returns the lowercase step name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bootstrap => "bootstrap",
            Self::Storage => "storage",
            Self::Network => "network",
            Self::Compute => "compute",
            Self::Deployment => "deployment",
            Self::Monitoring => "monitoring",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for WorkflowStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event streams for every workflow step of one resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowSteps {
    /// Bootstrap events.
    pub bootstrap: Vec<DebugEvent>,
    /// Storage events.
    pub storage: Vec<DebugEvent>,
    /// Network events.
    pub network: Vec<DebugEvent>,
    /// Compute events.
    pub compute: Vec<DebugEvent>,
    /// Deployment events.
    pub deployment: Vec<DebugEvent>,
    /// Monitoring events.
    pub monitoring: Vec<DebugEvent>,
    /// Unattributed events.
    pub unknown: Vec<DebugEvent>,
}

type StepAccessor = fn(&WorkflowSteps) -> &[DebugEvent];

fn bootstrap(s: &WorkflowSteps) -> &[DebugEvent] {
    &s.bootstrap
}

fn storage(s: &WorkflowSteps) -> &[DebugEvent] {
    &s.storage
}

fn network(s: &WorkflowSteps) -> &[DebugEvent] {
    &s.network
}

fn compute(s: &WorkflowSteps) -> &[DebugEvent] {
    &s.compute
}

fn deployment(s: &WorkflowSteps) -> &[DebugEvent] {
    &s.deployment
}

fn monitoring(s: &WorkflowSteps) -> &[DebugEvent] {
    &s.monitoring
}

fn unknown(s: &WorkflowSteps) -> &[DebugEvent] {
    &s.unknown
}

/// Step-to-field table, in display order.
const STEP_TABLE: [(WorkflowStep, StepAccessor); 7] = [
    (WorkflowStep::Bootstrap, bootstrap),
    (WorkflowStep::Storage, storage),
    (WorkflowStep::Network, network),
    (WorkflowStep::Compute, compute),
    (WorkflowStep::Deployment, deployment),
    (WorkflowStep::Monitoring, monitoring),
    (WorkflowStep::Unknown, unknown),
];

impl WorkflowSteps {
    /// Returns the events for one step.
    #[must_use]
    pub fn events(&self, step: WorkflowStep) -> &[DebugEvent] {
        match step {
            WorkflowStep::Bootstrap => &self.bootstrap,
            WorkflowStep::Storage => &self.storage,
            WorkflowStep::Network => &self.network,
            WorkflowStep::Compute => &self.compute,
            WorkflowStep::Deployment => &self.deployment,
            WorkflowStep::Monitoring => &self.monitoring,
            WorkflowStep::Unknown => &self.unknown,
        }
    }

    /// Returns a mutable handle to the events for one step.
    pub fn events_mut(&mut self, step: WorkflowStep) -> &mut Vec<DebugEvent> {
        match step {
            WorkflowStep::Bootstrap => &mut self.bootstrap,
            WorkflowStep::Storage => &mut self.storage,
            WorkflowStep::Network => &mut self.network,
            WorkflowStep::Compute => &mut self.compute,
            WorkflowStep::Deployment => &mut self.deployment,
            WorkflowStep::Monitoring => &mut self.monitoring,
            WorkflowStep::Unknown => &mut self.unknown,
        }
    }

    /// Iterates over all steps in display order.
    pub fn iter(&self) -> impl Iterator<Item = (WorkflowStep, &[DebugEvent])> {
        STEP_TABLE
            .iter()
            .map(move |(step, accessor)| (*step, accessor(self)))
    }

    /// Classifies every step in display order.
    #[must_use]
    pub fn classify_all(&self) -> Vec<(WorkflowStep, StepStatus)> {
        self.iter()
            .map(|(step, events)| (step, StepStatus::classify(events)))
            .collect()
    }

    /// Returns true if no step has any events.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.iter().all(|(_, events)| events.is_empty())
    }

    /// Appends another page of events, step by step.
    pub fn append(&mut self, other: Self) {
        let Self {
            bootstrap,
            storage,
            network,
            compute,
            deployment,
            monitoring,
            unknown,
        } = other;
        self.bootstrap.extend(bootstrap);
        self.storage.extend(storage);
        self.network.extend(network);
        self.compute.extend(compute);
        self.deployment.extend(deployment);
        self.monitoring.extend(monitoring);
        self.unknown.extend(unknown);
    }
}

/// Classification of one step's event stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    /// At least one event failed.
    Failed,
    /// At least one event completed and none failed.
    Completed,
    /// Debug events present, nothing completed or failed.
    Debug,
    /// Only started events.
    Started,
    /// No events yet.
    Pending,
    /// Events present but none with a known tag.
    Unknown,
}

impl StepStatus {
    /// Classifies an event stream.
    ///
    /// The highest-priority tag anywhere in the stream wins, in the order
    /// failed > completed > debug > started. Position in the stream does not
    /// matter: a stream that ever failed stays failed.
    #[must_use]
    pub fn classify(events: &[DebugEvent]) -> Self {
        if events.is_empty() {
            return Self::Pending;
        }

        let has = |wanted: &EventType| events.iter().any(|e| &e.event_type == wanted);

        if has(&EventType::Failed) {
            Self::Failed
        } else if has(&EventType::Completed) {
            Self::Completed
        } else if has(&EventType::Debug) {
            Self::Debug
        } else if has(&EventType::Started) {
            Self::Started
        } else {
            Self::Unknown
        }
    }

    /// Returns the display glyph.
    #[must_use]
    pub const fn icon(self) -> &'static str {
        match self {
            Self::Failed => "✗",
            Self::Completed => "✓",
            Self::Debug | Self::Started => "◐",
            Self::Pending => "○",
            Self::Unknown => "?",
        }
    }

    /// Returns true if the step has emitted any events.
    #[must_use]
    pub const fn has_events(self) -> bool {
        !matches!(self, Self::Pending)
    }
}
