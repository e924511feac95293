//! Migration Definitions - Core types and structures for migrations
//!
//! Defines the fundamental types used throughout the migration system:
//! Migration, HistoryRecord, MigrationConfig and the run/revert result
//! structures returned to the caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Version key format inside a migration directory name, e.g.
/// `2025-01-04-123045_create_users`.
pub const VERSION_FORMAT: &str = "%Y-%m-%d-%H%M%S";

/// A single versioned schema change with paired apply/revert statements
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Migration {
    /// Sortable version key: the timestamp prefix of the directory name.
    /// Lexicographic order on this string is chronological order.
    pub version: String,
    /// Human-readable name derived from the directory name
    pub name: String,
    /// CQL statements to apply the migration, in source order
    pub up_statements: Vec<String>,
    /// CQL statements to revert the migration, in source order.
    /// May be empty when the migration provides no revert path.
    pub down_statements: Vec<String>,
    /// When the migration was created, per its version key
    pub created_at: DateTime<Utc>,
    /// Directory the migration was parsed from
    pub dir: PathBuf,
}

/// One row of the history table: the persisted outcome for a version
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// Migration version key
    pub version: String,
    /// When the migration was applied
    pub applied_at: DateTime<Utc>,
    /// A version counts as applied only when this is true
    pub success: bool,
}

/// Configuration for the migration system
#[derive(Debug, Clone)]
pub struct MigrationConfig {
    /// Directory containing one subdirectory per migration
    pub migrations_dir: PathBuf,
    /// Keyspace holding the history table, created on demand
    pub keyspace: String,
    /// Name of the history table
    pub history_table: String,
    /// Replication factor used when creating the keyspace
    pub replication_factor: u32,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            migrations_dir: PathBuf::from("migrations"),
            keyspace: "cqlmigrate".to_string(),
            history_table: "migration_history".to_string(),
            replication_factor: 1,
        }
    }
}

/// Result of running pending migrations
#[derive(Debug)]
pub struct MigrationRunResult {
    /// Versions that were applied by this run, in apply order
    pub applied: Vec<String>,
    /// Number of catalog entries skipped because they were already applied
    pub skipped: usize,
    /// Total execution time in milliseconds
    pub execution_time_ms: u128,
}

impl MigrationRunResult {
    /// True when there was nothing pending
    pub fn is_noop(&self) -> bool {
        self.applied.is_empty()
    }
}

/// Result of reverting migrations
#[derive(Debug)]
pub struct RevertResult {
    /// Versions that were reverted by this run, in revert order
    pub reverted: Vec<String>,
    /// Total execution time in milliseconds
    pub execution_time_ms: u128,
}

impl RevertResult {
    /// Successful no-op: nothing was applied, so nothing was reverted.
    /// Distinguishable from failure, which is an `Err` instead.
    pub fn nothing_to_revert() -> Self {
        Self {
            reverted: Vec::new(),
            execution_time_ms: 0,
        }
    }

    pub fn is_noop(&self) -> bool {
        self.reverted.is_empty()
    }
}

/// Migration status in the system
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationStatus {
    /// Discovered on disk but not yet applied
    Pending,
    /// Recorded as applied in the history store
    Applied {
        /// When it was applied
        applied_at: DateTime<Utc>,
    },
}
