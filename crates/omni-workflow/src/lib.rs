//! # omni-workflow
//!
//! Deployment workflow tracking for `omnistrate-ctl`.
//!
//! The fleet API reports progress of a deployment action (create, modify,
//! restore, ...) as per-resource streams of debug events, grouped by workflow
//! step. This crate turns those streams into a converging status display:
//!
//! - [`step`] classifies the events of one (resource, step) pair
//! - [`resource`] aggregates step classifications into a resource status
//! - [`workflow`] decides when polling stops and whether the action succeeded
//! - [`poller`] runs the fixed-interval polling loop and drives a
//!   [`progress::ProgressDisplay`]
//!
//! ```text
//! ┌──────────────┐  fetch   ┌──────────────┐  classify  ┌──────────────┐
//! │ WorkflowSource│◄────────│WorkflowPoller│───────────►│ProgressDisplay│
//! └──────────────┘  (tick)  └──────────────┘  (update)  └──────────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod event;
pub mod poller;
pub mod progress;
pub mod resource;
pub mod step;
pub mod workflow;

pub use error::{WorkflowError, WorkflowResult};
pub use event::{DebugEvent, EventType};
pub use poller::{
    ActionType, PollerConfig, ResourceReport, WorkflowFetch, WorkflowPoller, WorkflowQuery,
    WorkflowReport, WorkflowSource,
};
pub use progress::{NullDisplay, ProgressDisplay, RecordingDisplay, SpinnerOutcome};
pub use resource::{ResourceStatus, ResourceWorkflowSnapshot};
pub use step::{StepStatus, WorkflowStep, WorkflowSteps};
pub use workflow::{Decision, Termination, Verdict, WorkflowInfo, WorkflowSignal};
