//! History Store - Persistent record of applied migrations
//!
//! One table inside the target cluster records, per migration version,
//! whether and when it was applied. The table lives in its own keyspace and
//! both are created lazily on first use. All rows share a single constant
//! partition so the clustering key gives ascending version order
//! server-side.
//!
//! Any failure here is fatal to the run: proceeding past a history
//! read/write failure would desynchronize recorded state from actual
//! schema state.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use scylla::{FromRow, IntoTypedRows, Session};

use crate::error::{MigrateError, MigrateResult};
use crate::migrations::definitions::{HistoryRecord, MigrationConfig};

/// Partition key shared by every history row
const HISTORY_SCOPE: &str = "migrate";

/// Status value marking a version as successfully applied
const STATUS_APPLIED: &str = "applied";

#[derive(Debug, FromRow)]
struct HistoryRow {
    version: String,
    status: String,
    applied_at: DateTime<Utc>,
}

/// Store for migration execution history, bound to an explicit session
pub struct HistoryStore {
    session: Arc<Session>,
    keyspace: String,
    table: String,
    replication_factor: u32,
}

impl HistoryStore {
    /// Create a history store over an existing session handle
    pub fn new(session: Arc<Session>, config: &MigrationConfig) -> Self {
        Self {
            session,
            keyspace: config.keyspace.clone(),
            table: config.history_table.clone(),
            replication_factor: config.replication_factor,
        }
    }

    /// Idempotently create the keyspace and history table. Safe to call on
    /// every run.
    pub async fn ensure_schema(&self) -> MigrateResult<()> {
        self.session
            .query_unpaged(
                create_keyspace_cql(&self.keyspace, self.replication_factor),
                &[],
            )
            .await
            .map_err(|e| {
                MigrateError::Persistence(format!(
                    "failed to create keyspace '{}': {}",
                    self.keyspace, e
                ))
            })?;

        self.session
            .query_unpaged(create_table_cql(&self.keyspace, &self.table), &[])
            .await
            .map_err(|e| {
                MigrateError::Persistence(format!(
                    "failed to create history table '{}.{}': {}",
                    self.keyspace, self.table, e
                ))
            })?;

        Ok(())
    }

    /// Versions currently recorded as successfully applied, ascending by
    /// version, with their applied-at timestamps.
    pub async fn list_applied(&self) -> MigrateResult<Vec<HistoryRecord>> {
        let result = self
            .session
            .query_unpaged(select_history_cql(&self.keyspace, &self.table), (HISTORY_SCOPE,))
            .await
            .map_err(|e| {
                MigrateError::Persistence(format!("failed to read migration history: {}", e))
            })?;

        let mut records = Vec::new();
        for row in result.rows.unwrap_or_default().into_typed::<HistoryRow>() {
            let row = row
                .map_err(|e| MigrateError::Persistence(format!("malformed history row: {}", e)))?;
            if row.status == STATUS_APPLIED {
                records.push(HistoryRecord {
                    version: row.version,
                    applied_at: row.applied_at,
                    success: true,
                });
            }
        }

        Ok(records)
    }

    /// Record `version` as applied now. Must be called only after the
    /// migration's full statement list has been confirmed executed.
    pub async fn record_applied(&self, version: &str) -> MigrateResult<()> {
        self.session
            .query_unpaged(
                insert_history_cql(&self.keyspace, &self.table),
                (HISTORY_SCOPE, version, STATUS_APPLIED, Utc::now()),
            )
            .await
            .map_err(|e| {
                MigrateError::Persistence(format!(
                    "failed to record migration {} as applied: {}",
                    version, e
                ))
            })?;

        Ok(())
    }

    /// Remove the history row for `version`. Must be called only after the
    /// revert statements for that version have been confirmed executed.
    pub async fn record_reverted(&self, version: &str) -> MigrateResult<()> {
        self.session
            .query_unpaged(
                delete_history_cql(&self.keyspace, &self.table),
                (HISTORY_SCOPE, version),
            )
            .await
            .map_err(|e| {
                MigrateError::Persistence(format!(
                    "failed to record migration {} as reverted: {}",
                    version, e
                ))
            })?;

        Ok(())
    }
}

fn create_keyspace_cql(keyspace: &str, replication_factor: u32) -> String {
    format!(
        "CREATE KEYSPACE IF NOT EXISTS {} \
         WITH REPLICATION = {{'class': 'NetworkTopologyStrategy', 'replication_factor': {}}}",
        keyspace, replication_factor
    )
}

fn create_table_cql(keyspace: &str, table: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {}.{} (\
            scope TEXT, \
            version TEXT, \
            status TEXT, \
            applied_at TIMESTAMP, \
            PRIMARY KEY (scope, version)\
         )",
        keyspace, table
    )
}

fn select_history_cql(keyspace: &str, table: &str) -> String {
    format!(
        "SELECT version, status, applied_at FROM {}.{} WHERE scope = ? ORDER BY version ASC",
        keyspace, table
    )
}

fn insert_history_cql(keyspace: &str, table: &str) -> String {
    format!(
        "INSERT INTO {}.{} (scope, version, status, applied_at) VALUES (?, ?, ?, ?)",
        keyspace, table
    )
}

fn delete_history_cql(keyspace: &str, table: &str) -> String {
    format!(
        "DELETE FROM {}.{} WHERE scope = ? AND version = ?",
        keyspace, table
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_keyspace_cql() {
        let cql = create_keyspace_cql("ks", 3);
        assert!(cql.contains("CREATE KEYSPACE IF NOT EXISTS ks"));
        assert!(cql.contains("'replication_factor': 3"));
    }

    #[test]
    fn test_create_table_cql_is_idempotent_ddl() {
        let cql = create_table_cql("ks", "hist");
        assert!(cql.contains("CREATE TABLE IF NOT EXISTS ks.hist"));
        assert!(cql.contains("PRIMARY KEY (scope, version)"));
    }

    #[test]
    fn test_select_history_cql_orders_ascending() {
        let cql = select_history_cql("ks", "hist");
        assert!(cql.contains("FROM ks.hist"));
        assert!(cql.contains("ORDER BY version ASC"));
    }

    #[test]
    fn test_mutation_cql_targets_configured_table() {
        assert!(insert_history_cql("ks", "hist").starts_with("INSERT INTO ks.hist"));
        assert!(delete_history_cql("ks", "hist").starts_with("DELETE FROM ks.hist"));
    }
}
