//! Error types for the migration system
//!
//! Every failure mode is fatal to the current run: the engine surfaces the
//! first error and halts, leaving previously completed and recorded steps
//! intact. The CLI layer translates these into messages and exit status.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for migration operations
pub type MigrateResult<T> = Result<T, MigrateError>;

/// Error types for migration operations
#[derive(Debug, Error)]
pub enum MigrateError {
    /// A migration source could not be parsed into a valid migration
    #[error("failed to parse migration '{}': {reason}", .path.display())]
    Parse {
        /// Migration directory that failed to parse
        path: PathBuf,
        reason: String,
    },

    /// The migrations directory could not be enumerated, or the catalog is
    /// ambiguous (duplicate version keys)
    #[error("migration discovery failed: {0}")]
    Discovery(String),

    /// A new migration could not be scaffolded (invalid name or a
    /// filesystem failure while creating the template files)
    #[error("failed to create migration: {0}")]
    Scaffold(String),

    /// A history table read or write failed; recorded state can no longer
    /// be trusted to match schema state, so the run must stop
    #[error("history store failure: {0}")]
    Persistence(String),

    /// A single apply/revert statement failed against the cluster
    #[error("statement {statement_index} of migration {version} failed: {reason}")]
    StatementExecution {
        version: String,
        /// Zero-based index into the migration's statement list
        statement_index: usize,
        reason: String,
    },

    /// Revert was requested for a version whose source files are no longer
    /// on disk, so its revert statements are unavailable
    #[error("cannot revert migration {version}: its source files are no longer on disk")]
    UnrecoverableRevert { version: String },
}

impl MigrateError {
    /// Version key the error is about, when it concerns a single migration.
    pub fn version(&self) -> Option<&str> {
        match self {
            MigrateError::StatementExecution { version, .. } => Some(version),
            MigrateError::UnrecoverableRevert { version } => Some(version),
            _ => None,
        }
    }
}
