//! Migration Revert - Rolls back applied migrations
//!
//! Reverts either the most recently applied migration or, with `all`,
//! every applied migration in strict descending version order. The whole
//! revert plan is resolved against the catalog before any statement runs:
//! an applied version whose source files were deleted aborts the run
//! before any database mutation.

use std::time::Instant;

use super::definitions::{HistoryRecord, Migration, RevertResult};
use super::runner::{execute_statements, MigrationRunner};
use crate::error::{MigrateError, MigrateResult};

/// Extension trait for MigrationRunner adding revert functionality
pub trait MigrationRevert {
    /// Revert the most recently applied migration, or every applied
    /// migration in descending order when `all` is set.
    ///
    /// An empty history is a successful no-op
    /// ([`RevertResult::nothing_to_revert`]), not an error. A statement
    /// failure halts the run; migrations reverted before it stay recorded
    /// as reverted.
    async fn down(&self, all: bool) -> MigrateResult<RevertResult>;
}

impl MigrationRevert for MigrationRunner {
    async fn down(&self, all: bool) -> MigrateResult<RevertResult> {
        let start_time = Instant::now();

        self.history().ensure_schema().await?;

        let applied = self.history().list_applied().await?;
        if applied.is_empty() {
            return Ok(RevertResult::nothing_to_revert());
        }

        let catalog = self.manager().load_catalog()?;
        let plan = revert_plan(&catalog, &applied, all)?;

        let mut reverted = Vec::new();
        for migration in plan {
            tracing::info!("reverting migration: {} - {}", migration.version, migration.name);
            execute_statements(self.session(), &migration.version, &migration.down_statements)
                .await?;
            self.history().record_reverted(&migration.version).await?;
            reverted.push(migration.version.clone());
        }

        Ok(RevertResult {
            reverted,
            execution_time_ms: start_time.elapsed().as_millis(),
        })
    }
}

/// Revert plan: the most recently applied version, or every applied
/// version in descending order when `all` is set. `applied` is expected
/// ascending, as the history store returns it.
///
/// Every planned version must still exist in the catalog; a missing one
/// means its revert statements are unavailable and yields
/// [`MigrateError::UnrecoverableRevert`] naming that version.
pub fn revert_plan<'a>(
    catalog: &'a [Migration],
    applied: &[HistoryRecord],
    all: bool,
) -> MigrateResult<Vec<&'a Migration>> {
    let targets: Vec<&HistoryRecord> = if all {
        applied.iter().rev().collect()
    } else {
        applied.last().into_iter().collect()
    };

    let mut plan = Vec::with_capacity(targets.len());
    for record in targets {
        let migration = catalog
            .iter()
            .find(|m| m.version == record.version)
            .ok_or_else(|| MigrateError::UnrecoverableRevert {
                version: record.version.clone(),
            })?;
        plan.push(migration);
    }

    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::path::PathBuf;

    fn migration(version: &str) -> Migration {
        Migration {
            version: version.to_string(),
            name: format!("migration {}", version),
            up_statements: vec!["CREATE TABLE t (id UUID PRIMARY KEY)".to_string()],
            down_statements: vec!["DROP TABLE t".to_string()],
            created_at: Utc::now(),
            dir: PathBuf::from(format!("migrations/{}_m", version)),
        }
    }

    fn record(version: &str) -> HistoryRecord {
        HistoryRecord {
            version: version.to_string(),
            applied_at: Utc::now(),
            success: true,
        }
    }

    fn versions(plan: &[&Migration]) -> Vec<String> {
        plan.iter().map(|m| m.version.clone()).collect()
    }

    #[test]
    fn test_revert_plan_targets_most_recent_only() {
        let catalog = vec![
            migration("2025-01-01-000000"),
            migration("2025-01-02-000000"),
        ];
        let applied = vec![record("2025-01-01-000000"), record("2025-01-02-000000")];

        let plan = revert_plan(&catalog, &applied, false).unwrap();
        assert_eq!(versions(&plan), vec!["2025-01-02-000000"]);
    }

    #[test]
    fn test_revert_plan_all_is_descending() {
        let catalog = vec![
            migration("2025-01-01-000000"),
            migration("2025-01-02-000000"),
            migration("2025-01-03-000000"),
        ];
        let applied = vec![
            record("2025-01-01-000000"),
            record("2025-01-02-000000"),
            record("2025-01-03-000000"),
        ];

        let plan = revert_plan(&catalog, &applied, true).unwrap();
        assert_eq!(
            versions(&plan),
            vec!["2025-01-03-000000", "2025-01-02-000000", "2025-01-01-000000"]
        );
    }

    #[test]
    fn test_revert_plan_empty_history_is_empty() {
        let catalog = vec![migration("2025-01-01-000000")];
        assert!(revert_plan(&catalog, &[], false).unwrap().is_empty());
        assert!(revert_plan(&catalog, &[], true).unwrap().is_empty());
    }

    #[test]
    fn test_revert_plan_missing_source_is_unrecoverable() {
        // Applied in history but the migration directory was deleted.
        let catalog = vec![migration("2025-01-01-000000")];
        let applied = vec![record("2025-01-01-000000"), record("2025-01-02-000000")];

        let err = revert_plan(&catalog, &applied, false).unwrap_err();
        match err {
            MigrateError::UnrecoverableRevert { version } => {
                assert_eq!(version, "2025-01-02-000000");
            }
            other => panic!("expected UnrecoverableRevert, got {:?}", other),
        }
    }

    #[test]
    fn test_revert_plan_all_resolves_before_any_mutation() {
        // A missing version anywhere in the plan fails resolution up front,
        // so no partial revert can start.
        let catalog = vec![migration("2025-01-02-000000")];
        let applied = vec![record("2025-01-01-000000"), record("2025-01-02-000000")];

        let err = revert_plan(&catalog, &applied, true).unwrap_err();
        assert_eq!(err.version(), Some("2025-01-01-000000"));
    }
}
