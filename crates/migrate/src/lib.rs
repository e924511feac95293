//! # cqlmigrate: CQL schema migrations for ScyllaDB/Cassandra
//!
//! File-defined, timestamp-ordered schema migrations executed against a
//! live cluster, with execution history tracked in a table inside the same
//! cluster so that re-invocation is safe and idempotent.
//!
//! The crate is built around four pieces:
//! - [`MigrationManager`]: discovers and parses migration directories into
//!   an ordered catalog.
//! - [`HistoryStore`]: the persistent record of which versions have been
//!   applied, living in the target keyspace.
//! - [`MigrationRunner`]: reconciles catalog against history and drives
//!   statement execution ([`MigrationRunner::up`]).
//! - [`MigrationRevert`]: the revert side of the runner
//!   ([`MigrationRevert::down`]).
//!
//! The caller owns connection setup and passes an explicit
//! [`scylla::Session`] handle in; there is no ambient connection state.
//! Concurrent invocations against the same cluster are unsupported: there
//! is no cross-process lock, and two runners may race on history writes.

pub mod error;
pub mod history;
pub mod migrations;

// Re-export core types
pub use error::*;
pub use history::*;
pub use migrations::*;
