//! Progress display contract driven by the poller.
//!
//! A display shows one spinner per resource. The poller talks to it only
//! through [`ProgressDisplay`], keyed by resource identity, and guarantees:
//!
//! - spinners are created in the order resources are first observed
//! - a spinner is never updated after it has been resolved
//! - each spinner is resolved at most once

use std::collections::HashMap;

/// Final visual state of a spinner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpinnerOutcome {
    /// Resource finished successfully.
    Success,
    /// Resource failed or was stopped.
    Error,
}

/// A set of per-resource progress indicators.
pub trait ProgressDisplay {
    /// Adds a spinner for a newly observed resource.
    fn create(&mut self, key: &str, text: &str);

    /// Replaces the text of an existing spinner.
    fn update(&mut self, key: &str, text: &str);

    /// Moves a spinner to its final state.
    fn resolve(&mut self, key: &str, outcome: SpinnerOutcome, text: &str);

    /// Advances spinner animation. Called frequently between polls.
    fn tick(&mut self) {}

    /// Shows a one-off message that belongs to no spinner, such as a
    /// retried fetch.
    fn note(&mut self, _text: &str) {}
}

/// A display that draws nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullDisplay;

impl ProgressDisplay for NullDisplay {
    fn create(&mut self, _key: &str, _text: &str) {}

    fn update(&mut self, _key: &str, _text: &str) {}

    fn resolve(&mut self, _key: &str, _outcome: SpinnerOutcome, _text: &str) {}
}

/// Calls recorded by [`RecordingDisplay`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayCall {
    /// `create` was called.
    Create {
        /// Resource key.
        key: String,
        /// Spinner text.
        text: String,
    },
    /// `update` was called.
    Update {
        /// Resource key.
        key: String,
        /// Spinner text.
        text: String,
    },
    /// `resolve` was called.
    Resolve {
        /// Resource key.
        key: String,
        /// Final state.
        outcome: SpinnerOutcome,
        /// Final text.
        text: String,
    },
    /// `note` was called.
    Note {
        /// Message text.
        text: String,
    },
}

/// A display that draws nothing and records every call.
#[derive(Debug, Clone, Default)]
pub struct RecordingDisplay {
    calls: Vec<DisplayCall>,
}

impl RecordingDisplay {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded calls in order.
    #[must_use]
    pub fn calls(&self) -> &[DisplayCall] {
        &self.calls
    }

    /// Keys in spinner creation order.
    #[must_use]
    pub fn created_keys(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                DisplayCall::Create { key, .. } => Some(key.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Final outcomes per key, in resolution order.
    #[must_use]
    pub fn resolutions(&self) -> Vec<(&str, SpinnerOutcome)> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                DisplayCall::Resolve { key, outcome, .. } => Some((key.as_str(), *outcome)),
                _ => None,
            })
            .collect()
    }

    /// Messages passed to `note`, in order.
    #[must_use]
    pub fn notes(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                DisplayCall::Note { text } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Most recent text shown for a key.
    #[must_use]
    pub fn last_text(&self, key: &str) -> Option<&str> {
        self.calls.iter().rev().find_map(|call| match call {
            DisplayCall::Create { key: k, text }
            | DisplayCall::Update { key: k, text }
            | DisplayCall::Resolve { key: k, text, .. }
                if k == key =>
            {
                Some(text.as_str())
            }
            _ => None,
        })
    }
}

impl ProgressDisplay for RecordingDisplay {
    fn create(&mut self, key: &str, text: &str) {
        self.calls.push(DisplayCall::Create {
            key: key.to_string(),
            text: text.to_string(),
        });
    }

    fn update(&mut self, key: &str, text: &str) {
        self.calls.push(DisplayCall::Update {
            key: key.to_string(),
            text: text.to_string(),
        });
    }

    fn resolve(&mut self, key: &str, outcome: SpinnerOutcome, text: &str) {
        self.calls.push(DisplayCall::Resolve {
            key: key.to_string(),
            outcome,
            text: text.to_string(),
        });
    }

    fn note(&mut self, text: &str) {
        self.calls.push(DisplayCall::Note {
            text: text.to_string(),
        });
    }
}

/// Spinner bookkeeping keyed by resource identity.
#[derive(Debug, Default)]
pub(crate) struct SpinnerBoard {
    order: Vec<String>,
    entries: HashMap<String, SpinnerEntry>,
}

#[derive(Debug)]
struct SpinnerEntry {
    name: String,
    resolved: bool,
}

impl SpinnerBoard {
    pub(crate) fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Creates the spinner on first sight, otherwise updates it unless resolved.
    pub(crate) fn show<D: ProgressDisplay + ?Sized>(
        &mut self,
        display: &mut D,
        key: &str,
        name: &str,
        text: &str,
    ) {
        match self.entries.get_mut(key) {
            None => {
                self.order.push(key.to_string());
                self.entries.insert(
                    key.to_string(),
                    SpinnerEntry {
                        name: name.to_string(),
                        resolved: false,
                    },
                );
                display.create(key, text);
            }
            Some(entry) if !entry.resolved => {
                entry.name = name.to_string();
                display.update(key, text);
            }
            Some(_) => {}
        }
    }

    /// Resolves a spinner. Returns false if it was already resolved or unknown.
    pub(crate) fn resolve<D: ProgressDisplay + ?Sized>(
        &mut self,
        display: &mut D,
        key: &str,
        outcome: SpinnerOutcome,
        text: &str,
    ) -> bool {
        match self.entries.get_mut(key) {
            Some(entry) if !entry.resolved => {
                entry.resolved = true;
                display.resolve(key, outcome, text);
                true
            }
            _ => false,
        }
    }

    /// Display name last seen for a key.
    pub(crate) fn name<'a>(&'a self, key: &'a str) -> &'a str {
        self.entries.get(key).map_or(key, |entry| entry.name.as_str())
    }

    /// Keys of spinners not yet resolved, in creation order.
    pub(crate) fn unresolved(&self) -> Vec<String> {
        self.order
            .iter()
            .filter(|key| self.entries.get(key.as_str()).is_some_and(|e| !e.resolved))
            .cloned()
            .collect()
    }
}
