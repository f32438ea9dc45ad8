//! Event status state machine.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EventError;

/// Status of an event or task.
///
/// Persisted as the exact strings `NEW`, `RUNNING`, `COMPLETE`, `FAIL`;
/// anything else read back from storage is invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventStatus {
    /// Created, not yet dispatched.
    New,
    /// A worker is executing the task.
    Running,
    /// The handler finished successfully.
    Complete,
    /// The handler failed, faulted, or could not be resolved.
    Fail,
}

impl EventStatus {
    /// Check if this status allows transitioning to another status.
    ///
    /// `New -> Fail` covers tasks that fail before ever reaching a worker
    /// (unresolvable handler, undecodable parameters).
    pub fn can_transition_to(&self, target: EventStatus) -> bool {
        use EventStatus::*;

        matches!(
            (self, target),
            (New, Running) | (New, Fail) | (Running, Complete) | (Running, Fail)
        )
    }

    /// Check if this is a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Fail)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::Running => "RUNNING",
            Self::Complete => "COMPLETE",
            Self::Fail => "FAIL",
        }
    }
}

impl std::fmt::Display for EventStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventStatus {
    type Err = EventError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NEW" => Ok(Self::New),
            "RUNNING" => Ok(Self::Running),
            "COMPLETE" => Ok(Self::Complete),
            "FAIL" => Ok(Self::Fail),
            other => Err(EventError::InvalidStatus(other.to_string())),
        }
    }
}
