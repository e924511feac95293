//! End-to-end tests for catalog discovery and plan computation over real
//! migration directories. Statement execution needs a live cluster and is
//! not covered here; everything up to the driver calls is.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use chrono::Utc;
use cqlmigrate::{
    pending_plan, revert_plan, HistoryRecord, MigrateError, MigrationConfig, MigrationManager,
};
use tempfile::TempDir;

fn write_migration(root: &Path, dir_name: &str, up: &str, down: &str) {
    let dir = root.join(dir_name);
    fs::create_dir(&dir).unwrap();
    fs::write(dir.join("up.cql"), up).unwrap();
    fs::write(dir.join("down.cql"), down).unwrap();
}

fn manager_for(dir: &TempDir) -> MigrationManager {
    MigrationManager::with_config(MigrationConfig {
        migrations_dir: dir.path().to_path_buf(),
        ..MigrationConfig::default()
    })
}

fn applied_record(version: &str) -> HistoryRecord {
    HistoryRecord {
        version: version.to_string(),
        applied_at: Utc::now(),
        success: true,
    }
}

#[test]
fn up_plan_applies_catalog_in_order_then_is_idempotent() {
    let temp = TempDir::new().unwrap();
    write_migration(
        temp.path(),
        "2025-01-01-000000_create_table",
        "CREATE TABLE users (id UUID PRIMARY KEY);",
        "DROP TABLE users;",
    );
    write_migration(
        temp.path(),
        "2025-01-02-000000_add_column",
        "ALTER TABLE users ADD email TEXT;",
        "ALTER TABLE users DROP email;",
    );

    let catalog = manager_for(&temp).load_catalog().unwrap();

    // First invocation: both pending, ascending.
    let mut history: HashSet<String> = HashSet::new();
    let plan = pending_plan(&catalog, &history);
    let planned: Vec<_> = plan.iter().map(|m| m.version.as_str()).collect();
    assert_eq!(planned, vec!["2025-01-01-000000", "2025-01-02-000000"]);

    // Simulate the engine recording each migration after it runs.
    for migration in plan {
        history.insert(migration.version.clone());
    }

    // Second invocation with no new files: empty plan.
    assert!(pending_plan(&catalog, &history).is_empty());
}

#[test]
fn up_then_down_all_round_trips_to_empty_history() {
    let temp = TempDir::new().unwrap();
    write_migration(temp.path(), "2025-01-01-000000_a", "A;", "RA;");
    write_migration(temp.path(), "2025-01-02-000000_b", "B;", "RB;");
    write_migration(temp.path(), "2025-01-03-000000_c", "C;", "RC;");

    let catalog = manager_for(&temp).load_catalog().unwrap();

    let mut history: Vec<HistoryRecord> = Vec::new();
    for migration in pending_plan(&catalog, &HashSet::new()) {
        history.push(applied_record(&migration.version));
    }
    assert_eq!(history.len(), 3);

    let plan = revert_plan(&catalog, &history, true).unwrap();
    let planned: Vec<_> = plan.iter().map(|m| m.version.as_str()).collect();
    assert_eq!(
        planned,
        vec!["2025-01-03-000000", "2025-01-02-000000", "2025-01-01-000000"]
    );

    for migration in plan {
        history.retain(|r| r.version != migration.version);
    }
    assert!(history.is_empty());
}

#[test]
fn down_without_all_targets_only_the_most_recent() {
    let temp = TempDir::new().unwrap();
    write_migration(temp.path(), "2025-01-01-000000_create_table", "A;", "RA;");
    write_migration(temp.path(), "2025-01-02-000000_add_column", "B;", "RB;");

    let catalog = manager_for(&temp).load_catalog().unwrap();
    let history = vec![
        applied_record("2025-01-01-000000"),
        applied_record("2025-01-02-000000"),
    ];

    let plan = revert_plan(&catalog, &history, false).unwrap();
    assert_eq!(plan.len(), 1);
    assert_eq!(plan[0].version, "2025-01-02-000000");
    assert_eq!(plan[0].down_statements, vec!["RB"]);
}

#[test]
fn duplicate_versions_are_rejected_not_coalesced() {
    let temp = TempDir::new().unwrap();
    write_migration(temp.path(), "2025-01-01-000000_first", "A;", "RA;");
    write_migration(temp.path(), "2025-01-01-000000_second", "B;", "RB;");

    let err = manager_for(&temp).load_catalog().unwrap_err();
    assert!(matches!(err, MigrateError::Discovery(_)));
    assert!(err.to_string().contains("2025-01-01-000000"));
}

#[test]
fn revert_of_deleted_migration_is_unrecoverable() {
    let temp = TempDir::new().unwrap();
    write_migration(temp.path(), "2025-01-01-000000_keep", "A;", "RA;");
    write_migration(temp.path(), "2025-01-02-000000_gone", "B;", "RB;");

    let manager = manager_for(&temp);
    let history = vec![
        applied_record("2025-01-01-000000"),
        applied_record("2025-01-02-000000"),
    ];

    // Delete the most recent migration's sources after it was applied.
    fs::remove_dir_all(temp.path().join("2025-01-02-000000_gone")).unwrap();
    let catalog = manager.load_catalog().unwrap();

    let err = revert_plan(&catalog, &history, false).unwrap_err();
    match err {
        MigrateError::UnrecoverableRevert { version } => {
            assert_eq!(version, "2025-01-02-000000");
        }
        other => panic!("expected UnrecoverableRevert, got {:?}", other),
    }
}

#[test]
fn modified_applied_migration_is_ignored_by_planning() {
    // History is authoritative: content changes after application do not
    // make a migration pending again.
    let temp = TempDir::new().unwrap();
    write_migration(temp.path(), "2025-01-01-000000_tweaked", "A;", "RA;");

    let manager = manager_for(&temp);
    let history: HashSet<String> = ["2025-01-01-000000".to_string()].into_iter().collect();

    fs::write(
        temp.path().join("2025-01-01-000000_tweaked").join("up.cql"),
        "A; -- edited after apply\nEXTRA;",
    )
    .unwrap();

    let catalog = manager.load_catalog().unwrap();
    assert!(pending_plan(&catalog, &history).is_empty());
}
