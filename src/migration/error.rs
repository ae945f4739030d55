//! Migration-specific error types

use crate::executor::StrataError;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Which half of a migration was running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Up => f.write_str("up"),
            Direction::Down => f.write_str("down"),
        }
    }
}

/// Migration-specific errors
#[derive(Debug, Error)]
pub enum MigrationError {
    /// Database execution error outside any single migration
    #[error("Database error: {0}")]
    Database(#[from] StrataError),
    /// Reading or writing an artifact or directory failed
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Artifact name or identity that does not follow the naming convention
    #[error("Invalid migration format: {0}")]
    InvalidFormat(String),
    /// Artifact discovered on disk or named in a command with no registered implementation
    #[error("Migration not found: {0}")]
    NotFound(String),
    /// Advisory lock held by another runner
    #[error(
        "Migration lock timeout: could not acquire `{name}` within {seconds}s. \
         Another process may be running migrations."
    )]
    LockTimeout { name: String, seconds: u64 },
    /// The ledger already records this migration
    #[error("Migration '{0}' has already been applied")]
    AlreadyApplied(String),
    /// Two registry entries share one identity
    #[error("Migration '{0}' is already registered")]
    AlreadyRegistered(String),
    /// `up()`/`down()` or its ledger write failed; the in-flight transaction was rolled back
    #[error(
        "Migration '{migration}' failed during {direction}: {source} (completed before failure: {})",
        completed_list(.completed)
    )]
    ExecutionFailed {
        migration: String,
        direction: Direction,
        /// Migrations that finished in this invocation before the failure
        completed: Vec<String>,
        #[source]
        source: StrataError,
    },
}

fn completed_list(completed: &[String]) -> String {
    if completed.is_empty() {
        "none".to_string()
    } else {
        completed.join(", ")
    }
}

impl MigrationError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        MigrationError::Io {
            path: path.into(),
            source,
        }
    }
}
