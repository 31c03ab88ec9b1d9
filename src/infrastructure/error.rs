use crate::domain::models::TimeEntry;
use std::fmt;
use thiserror::Error;

/// Whether a failed remote call could have changed persisted state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOutcome {
    /// The request never left the process; nothing changed remotely.
    Unchanged,
    /// The request was sent but not acknowledged; the remote side may have applied it.
    Unknown,
}

impl fmt::Display for ChangeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unchanged => f.write_str("nothing changed"),
            Self::Unknown => f.write_str("may have partially changed"),
        }
    }
}

#[derive(Debug, Error)]
pub enum TimesheetError {
    #[error("invalid time '{0}': expected HH:MM")]
    Parse(String),
    #[error("invalid grid configuration: {0}")]
    Config(String),
    #[error("{message} ({} conflicting entries)", .conflicts.len())]
    Overlap {
        message: String,
        conflicts: Vec<TimeEntry>,
    },
    #[error("no task selected")]
    NoTaskSelected,
    #[error("network error ({outcome}): {message}")]
    Network {
        message: String,
        outcome: ChangeOutcome,
    },
    #[error("not found: {0}")]
    NotFound(String),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("a drag is already in progress")]
    DragInProgress,
    #[error("no drag in progress")]
    NotDragging,
    #[error("a commit is already in flight")]
    CommitInProgress,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("state error: {0}")]
    State(String),
}

impl TimesheetError {
    pub fn network(message: impl Into<String>, outcome: ChangeOutcome) -> Self {
        Self::Network {
            message: message.into(),
            outcome,
        }
    }

    /// True when the failure leaves remote state undetermined and local state must be re-fetched.
    pub fn is_ambiguous(&self) -> bool {
        matches!(
            self,
            Self::Network {
                outcome: ChangeOutcome::Unknown,
                ..
            }
        )
    }

    pub(crate) fn poisoned(what: &str, error: impl fmt::Display) -> Self {
        Self::State(format!("{what} lock poisoned: {error}"))
    }
}
