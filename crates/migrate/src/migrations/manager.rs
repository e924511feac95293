//! Migration Manager - File system operations for migrations
//!
//! Handles creating, loading, and parsing migration directories from the
//! filesystem into an ordered catalog.

use chrono::{DateTime, NaiveDateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};

use super::definitions::{Migration, MigrationConfig, VERSION_FORMAT};
use crate::error::{MigrateError, MigrateResult};

/// Migration manager for creating and loading migrations
pub struct MigrationManager {
    config: MigrationConfig,
}

impl MigrationManager {
    /// Create a new migration manager with default configuration
    pub fn new() -> Self {
        Self::with_config(MigrationConfig::default())
    }

    /// Create a new migration manager with custom configuration
    pub fn with_config(config: MigrationConfig) -> Self {
        Self { config }
    }

    /// Get the configuration
    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    /// Scaffold a new migration: a `{version}_{name}` subdirectory holding
    /// empty `up.cql` and `down.cql` templates. Returns the directory path.
    pub fn create_migration(&self, name: &str) -> MigrateResult<PathBuf> {
        if name.is_empty() {
            return Err(MigrateError::Scaffold(
                "migration name cannot be empty".to_string(),
            ));
        }
        if name.len() > 100 {
            return Err(MigrateError::Scaffold(
                "migration name too long (max 100 characters)".to_string(),
            ));
        }
        if !name
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == ' ' || c == '-')
        {
            return Err(MigrateError::Scaffold(
                "migration name can only contain letters, numbers, spaces, hyphens, and underscores"
                    .to_string(),
            ));
        }

        fs::create_dir_all(&self.config.migrations_dir).map_err(|e| {
            MigrateError::Scaffold(format!("failed to create migrations directory: {}", e))
        })?;

        let version = Utc::now().format(VERSION_FORMAT).to_string();
        let dir_name = format!("{}_{}", version, name.replace(' ', "_").to_lowercase());
        let dir = self.config.migrations_dir.join(&dir_name);

        fs::create_dir(&dir).map_err(|e| {
            MigrateError::Scaffold(format!(
                "failed to create migration directory '{}': {}",
                dir.display(),
                e
            ))
        })?;

        let up_template = format!(
            "-- Migration: {}\n-- Version: {}\n-- Statements are executed in order, separated by ';'\n\n",
            name, version
        );
        let down_template =
            "-- Revert statements, executed in order when this migration is rolled back\n\n";

        fs::write(dir.join("up.cql"), up_template)
            .and_then(|_| fs::write(dir.join("down.cql"), down_template))
            .map_err(|e| {
                MigrateError::Scaffold(format!("failed to write migration templates: {}", e))
            })?;

        Ok(dir)
    }

    /// Load the full catalog: every migration subdirectory parsed and
    /// sorted ascending by version key.
    ///
    /// Fails when the directory is unreadable, when any migration fails to
    /// parse (the specific directory and reason are surfaced), or when two
    /// migrations share a version key (ambiguous ordering is rejected, not
    /// deduplicated).
    pub fn load_catalog(&self) -> MigrateResult<Vec<Migration>> {
        if !self.config.migrations_dir.exists() {
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&self.config.migrations_dir).map_err(|e| {
            MigrateError::Discovery(format!(
                "failed to read migrations directory '{}': {}",
                self.config.migrations_dir.display(),
                e
            ))
        })?;

        let mut catalog = Vec::new();
        for entry in entries {
            let entry = entry
                .map_err(|e| MigrateError::Discovery(format!("failed to read directory entry: {}", e)))?;
            let path = entry.path();
            if path.is_dir() {
                catalog.push(Self::parse_migration(&path)?);
            }
        }

        catalog.sort_by(|a, b| a.version.cmp(&b.version));

        for pair in catalog.windows(2) {
            if pair[0].version == pair[1].version {
                return Err(MigrateError::Discovery(format!(
                    "duplicate migration version {}: '{}' and '{}'",
                    pair[0].version,
                    pair[0].dir.display(),
                    pair[1].dir.display()
                )));
            }
        }

        Ok(catalog)
    }

    /// Parse a single migration directory into a Migration. Pure aside from
    /// reading the two statement files.
    pub fn parse_migration(dir: &Path) -> MigrateResult<Migration> {
        let parse_err = |reason: String| MigrateError::Parse {
            path: dir.to_path_buf(),
            reason,
        };

        let dir_name = dir
            .file_name()
            .and_then(|s| s.to_str())
            .ok_or_else(|| parse_err("directory name is not valid UTF-8".to_string()))?;

        let (version, name_part) = dir_name.split_once('_').ok_or_else(|| {
            parse_err("directory name must follow format: {version}_{name}".to_string())
        })?;

        let created_at = parse_version(version)
            .ok_or_else(|| parse_err(format!("'{}' is not a valid version key", version)))?;

        if name_part.is_empty() {
            return Err(parse_err("migration name is empty".to_string()));
        }
        let name = name_part.replace('_', " ");

        let up_raw = fs::read_to_string(dir.join("up.cql"))
            .map_err(|e| parse_err(format!("failed to read up.cql: {}", e)))?;
        let up_statements = split_statements(&up_raw);
        if up_statements.is_empty() {
            return Err(parse_err("up.cql contains no statements".to_string()));
        }

        // down.cql is optional; a migration without one cannot be reverted
        // but is still a valid catalog entry.
        let down_statements = match fs::read_to_string(dir.join("down.cql")) {
            Ok(raw) => split_statements(&raw),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(parse_err(format!("failed to read down.cql: {}", e))),
        };

        Ok(Migration {
            version: version.to_string(),
            name,
            up_statements,
            down_statements,
            created_at,
            dir: dir.to_path_buf(),
        })
    }
}

impl Default for MigrationManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a version key into its creation timestamp. Returns None when the
/// key does not match the `%Y-%m-%d-%H%M%S` convention.
pub fn parse_version(version: &str) -> Option<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(version, VERSION_FORMAT).ok()?;
    Some(DateTime::from_naive_utc_and_offset(naive, Utc))
}

/// Split raw CQL into individual statements on `;`, preserving source
/// order. Comment-only lines and blank fragments are dropped; statements
/// run verbatim otherwise (no templating or substitution).
///
/// Statements are split because the driver cannot run multiple statements
/// in one request, and batches reject DDL.
pub fn split_statements(raw: &str) -> Vec<String> {
    raw.split(';')
        .map(|fragment| {
            fragment
                .lines()
                .filter(|line| {
                    let trimmed = line.trim();
                    !trimmed.is_empty() && !trimmed.starts_with("--")
                })
                .collect::<Vec<_>>()
                .join("\n")
                .trim()
                .to_string()
        })
        .filter(|statement| !statement.is_empty())
        .collect()
}
