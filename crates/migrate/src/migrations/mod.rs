//! Migration System
//!
//! File-defined schema migrations: definitions (data model), manager
//! (discovery and parsing), runner (apply) and rollback (revert).

pub mod definitions;
pub mod manager;
pub mod rollback;
pub mod runner;

pub use definitions::{
    HistoryRecord, Migration, MigrationConfig, MigrationRunResult, MigrationStatus, RevertResult,
};
pub use manager::MigrationManager;
pub use rollback::{revert_plan, MigrationRevert};
pub use runner::{pending_plan, MigrationRunner, StatementExecutor};
