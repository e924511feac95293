//! Migration Runner - Executes migrations against the cluster
//!
//! Reconciles the discovered catalog against the history store, computes
//! the pending plan and drives statement execution, recording each
//! migration in history only after its full statement list has succeeded.

use std::collections::HashSet;
use std::sync::Arc;

use scylla::Session;

use super::definitions::{Migration, MigrationRunResult, MigrationStatus};
use super::manager::MigrationManager;
use crate::error::{MigrateError, MigrateResult};
use crate::history::HistoryStore;

/// Minimal statement-execution surface the engine needs from the cluster
pub trait StatementExecutor {
    /// Execute a single CQL statement, returning the driver's error text
    /// on failure
    async fn execute(&self, statement: &str) -> Result<(), String>;
}

impl StatementExecutor for Session {
    async fn execute(&self, statement: &str) -> Result<(), String> {
        self.query_unpaged(statement, &[])
            .await
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}

/// History-write surface of the apply loop
pub(super) trait HistoryWriter {
    async fn record_applied(&self, version: &str) -> MigrateResult<()>;
}

impl HistoryWriter for HistoryStore {
    async fn record_applied(&self, version: &str) -> MigrateResult<()> {
        HistoryStore::record_applied(self, version).await
    }
}

/// Migration runner that executes migrations against a cluster
pub struct MigrationRunner {
    session: Arc<Session>,
    manager: MigrationManager,
    history: HistoryStore,
}

impl MigrationRunner {
    /// Create a runner over an explicit session handle. The history store
    /// shares the same session.
    pub fn new(session: Arc<Session>, manager: MigrationManager) -> Self {
        let history = HistoryStore::new(session.clone(), manager.config());
        Self {
            session,
            manager,
            history,
        }
    }

    /// Get the migration manager
    pub fn manager(&self) -> &MigrationManager {
        &self.manager
    }

    /// Get the history store
    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// Get the session handle
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Run all pending migrations in ascending version order.
    ///
    /// A migration is recorded as applied only after every one of its
    /// statements has executed; a statement failure halts the run
    /// immediately, leaving earlier migrations recorded and the failing one
    /// unrecorded. Re-invocation never re-executes applied migrations.
    /// Nothing pending is a successful no-op.
    pub async fn up(&self) -> MigrateResult<MigrationRunResult> {
        let start_time = std::time::Instant::now();

        self.history.ensure_schema().await?;

        let catalog = self.manager.load_catalog()?;
        let applied: HashSet<String> = self
            .history
            .list_applied()
            .await?
            .into_iter()
            .map(|r| r.version)
            .collect();

        let plan = pending_plan(&catalog, &applied);
        let skipped = catalog.len() - plan.len();
        tracing::debug!(
            catalog = catalog.len(),
            pending = plan.len(),
            skipped,
            "computed migration plan"
        );

        let applied_versions = apply_pending(&plan, self.session.as_ref(), &self.history).await?;

        Ok(MigrationRunResult {
            applied: applied_versions,
            skipped,
            execution_time_ms: start_time.elapsed().as_millis(),
        })
    }

    /// Every catalog entry tagged with its applied/pending state.
    pub async fn status(&self) -> MigrateResult<Vec<(Migration, MigrationStatus)>> {
        self.history.ensure_schema().await?;

        let catalog = self.manager.load_catalog()?;
        let applied = self.history.list_applied().await?;

        let status_list = catalog
            .into_iter()
            .map(|migration| {
                let status = applied
                    .iter()
                    .find(|r| r.version == migration.version)
                    .map(|r| MigrationStatus::Applied {
                        applied_at: r.applied_at,
                    })
                    .unwrap_or(MigrationStatus::Pending);
                (migration, status)
            })
            .collect();

        Ok(status_list)
    }
}

/// Pending plan for an up run: the catalog minus the applied versions, in
/// ascending catalog order.
pub fn pending_plan<'a>(
    catalog: &'a [Migration],
    applied: &HashSet<String>,
) -> Vec<&'a Migration> {
    catalog
        .iter()
        .filter(|m| !applied.contains(&m.version))
        .collect()
}

/// Apply a pending plan in order. Each migration's statements run
/// sequentially and its version is recorded only after all of them
/// succeeded; the first failure halts the loop, leaving earlier migrations
/// recorded and the failing one unrecorded.
pub(super) async fn apply_pending<E, W>(
    plan: &[&Migration],
    executor: &E,
    history: &W,
) -> MigrateResult<Vec<String>>
where
    E: StatementExecutor + ?Sized,
    W: HistoryWriter + ?Sized,
{
    let mut applied = Vec::new();
    for migration in plan {
        tracing::info!("applying migration: {} - {}", migration.version, migration.name);
        execute_statements(executor, &migration.version, &migration.up_statements).await?;
        history.record_applied(&migration.version).await?;
        applied.push(migration.version.clone());
    }
    Ok(applied)
}

/// Execute a migration's statement list sequentially, reporting the
/// failing statement index on error. The run does not proceed past a
/// failed statement.
pub(super) async fn execute_statements<E>(
    executor: &E,
    version: &str,
    statements: &[String],
) -> MigrateResult<()>
where
    E: StatementExecutor + ?Sized,
{
    for (statement_index, statement) in statements.iter().enumerate() {
        executor
            .execute(statement)
            .await
            .map_err(|reason| MigrateError::StatementExecution {
                version: version.to_string(),
                statement_index,
                reason,
            })?;
    }
    Ok(())
}
