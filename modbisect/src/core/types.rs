//! Shared deterministic types for the search core.
//!
//! These types define stable contracts between the registry, the engine and
//! the persisted progress snapshot.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle of a bisection search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchState {
    NotStarted,
    InProgress,
    /// Exactly one suspect remains.
    Completed,
    /// No suspect remains, or there were too few mods to bisect.
    Failed,
}

impl SearchState {
    /// True for the two terminal states.
    pub fn is_terminal(self) -> bool {
        matches!(self, SearchState::Completed | SearchState::Failed)
    }
}

impl fmt::Display for SearchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SearchState::NotStarted => "NOT STARTED",
            SearchState::InProgress => "IN PROGRESS",
            SearchState::Completed => "COMPLETED",
            SearchState::Failed => "FAILED",
        };
        f.write_str(label)
    }
}

/// Outcome of one manual test run, supplied by the user between iterations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    /// The problem is gone: the culprit is among the disabled half.
    Success,
    /// The problem persists: the culprit is still enabled.
    Failure,
}

/// On-disk state of a mod package.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModState {
    Enabled,
    Disabled,
}

impl ModState {
    pub fn label(self) -> &'static str {
        match self {
            ModState::Enabled => "[ENABLED] ",
            ModState::Disabled => "[DISABLED]",
        }
    }
}
