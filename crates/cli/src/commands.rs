//! Command implementations: connection setup and result rendering around
//! the migration engine.

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context};
use cqlmigrate::{
    MigrationConfig, MigrationManager, MigrationRevert, MigrationRunner, MigrationStatus,
};
use scylla::{Session, SessionBuilder};

fn manager_for(path: &Path) -> MigrationManager {
    MigrationManager::with_config(MigrationConfig {
        migrations_dir: path.to_path_buf(),
        ..MigrationConfig::default()
    })
}

async fn connect(db_url: Option<&str>) -> anyhow::Result<Arc<Session>> {
    let Some(db_url) = db_url else {
        bail!("no cluster address given; pass --db-url or set CQLMIGRATE_DB_URL");
    };

    let session = SessionBuilder::new()
        .known_node(db_url)
        .build()
        .await
        .with_context(|| format!("failed to connect to cluster at {}", db_url))?;

    Ok(Arc::new(session))
}

pub fn generate(path: &Path, name: &str) -> anyhow::Result<()> {
    let dir = manager_for(path).create_migration(name)?;
    println!("Created migration: {}", dir.display());
    println!("Fill in up.cql before running `cqlmigrate up`.");
    Ok(())
}

pub async fn up(path: &Path, db_url: Option<&str>) -> anyhow::Result<()> {
    let session = connect(db_url).await?;
    let runner = MigrationRunner::new(session, manager_for(path));

    let result = runner.up().await?;
    if result.is_noop() {
        println!("Nothing to apply ({} already applied).", result.skipped);
    } else {
        for version in &result.applied {
            println!("Applied: {}", version);
        }
        println!(
            "Applied {} migration(s) in {}ms.",
            result.applied.len(),
            result.execution_time_ms
        );
    }

    Ok(())
}

pub async fn down(path: &Path, db_url: Option<&str>, all: bool) -> anyhow::Result<()> {
    let session = connect(db_url).await?;
    let runner = MigrationRunner::new(session, manager_for(path));

    let result = runner.down(all).await?;
    if result.is_noop() {
        println!("Nothing to revert.");
    } else {
        for version in &result.reverted {
            println!("Reverted: {}", version);
        }
        println!(
            "Reverted {} migration(s) in {}ms.",
            result.reverted.len(),
            result.execution_time_ms
        );
    }

    Ok(())
}

pub async fn status(path: &Path, db_url: Option<&str>) -> anyhow::Result<()> {
    let session = connect(db_url).await?;
    let runner = MigrationRunner::new(session, manager_for(path));

    let status_list = runner.status().await?;
    if status_list.is_empty() {
        println!("No migrations found.");
        return Ok(());
    }

    println!("Migration status:");
    for (migration, status) in status_list {
        match status {
            MigrationStatus::Applied { applied_at } => {
                println!(
                    "  applied  {}  {}  ({})",
                    migration.version,
                    migration.name,
                    applied_at.format("%Y-%m-%d %H:%M:%S UTC")
                );
            }
            MigrationStatus::Pending => {
                println!("  pending  {}  {}", migration.version, migration.name);
            }
        }
    }

    Ok(())
}
