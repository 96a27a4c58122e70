use std::collections::BTreeMap;

use rusqlite::{Connection, params};
use tabata_common::{Error, Result};
use tracing::{debug, info, warn};

use super::catalog::MigrationDescriptor;
use super::statements::{Guard, split_sql_statements};

/// Outcome of one applier run, in catalog order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub applied: Vec<u32>,
    pub skipped: Vec<u32>,
}

impl MigrationReport {
    pub fn is_up_to_date(&self) -> bool {
        self.applied.is_empty()
    }
}

/// A catalog entry joined with its `schema_version` row, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
    pub migration: MigrationDescriptor,
    pub applied_at: Option<String>,
}

impl MigrationStatus {
    pub fn is_applied(&self) -> bool {
        self.applied_at.is_some()
    }
}

/// Apply every migration in `migrations` that has no `schema_version` row.
///
/// Each pending migration runs in its own transaction together with the
/// insert of its tracking row, so a version is only ever recorded when all
/// of its statements took effect. Applied migrations are not read again.
pub fn apply_migrations(
    conn: &mut Connection,
    migrations: &[MigrationDescriptor],
) -> Result<MigrationReport> {
    ensure_schema_table(conn)?;
    let applied = applied_versions(conn)?;
    for version in applied.keys() {
        if !migrations.iter().any(|m| m.version == *version) {
            warn!("schema_version records version {version}, which has no migration file");
        }
    }

    let mut report = MigrationReport::default();
    for migration in migrations {
        if applied.contains_key(&migration.version) {
            debug!("migration {} already applied", migration.label());
            report.skipped.push(migration.version);
            continue;
        }

        let sql = migration.read_sql()?;
        let statements = split_sql_statements(&sql);

        let tx = conn.transaction().map_err(|e| {
            Error::Database(format!(
                "failed to begin transaction for migration {}: {e}",
                migration.label()
            ))
        })?;
        let mut executed = 0;
        for statement in &statements {
            let ran = guarded_execute(&tx, statement).map_err(|e| {
                Error::Database(format!("migration {} failed: {e}", migration.label()))
            })?;
            executed += usize::from(ran);
        }
        tx.execute(
            "INSERT INTO schema_version (version) VALUES (?1)",
            params![migration.version],
        )
        .map_err(|e| {
            Error::Database(format!(
                "failed to record migration {}: {e}",
                migration.label()
            ))
        })?;
        tx.commit().map_err(|e| {
            Error::Database(format!(
                "failed to commit migration {}: {e}",
                migration.label()
            ))
        })?;

        info!(
            "applied migration {} ({executed}/{} statements executed)",
            migration.label(),
            statements.len()
        );
        report.applied.push(migration.version);
    }

    Ok(report)
}

/// Pair every catalog entry with its applied timestamp.
pub fn schema_status(
    conn: &Connection,
    migrations: &[MigrationDescriptor],
) -> Result<Vec<MigrationStatus>> {
    ensure_schema_table(conn)?;
    let applied = applied_versions(conn)?;
    Ok(migrations
        .iter()
        .map(|m| MigrationStatus {
            migration: m.clone(),
            applied_at: applied.get(&m.version).cloned(),
        })
        .collect())
}

fn ensure_schema_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        );",
    )
    .map_err(|e| Error::Database(format!("failed to create schema_version table: {e}")))
}

/// Applied versions mapped to their `applied_at` timestamps.
fn applied_versions(conn: &Connection) -> Result<BTreeMap<u32, String>> {
    let mut stmt = conn
        .prepare("SELECT version, applied_at FROM schema_version ORDER BY version")
        .map_err(|e| Error::Database(format!("failed to prepare query: {e}")))?;

    let rows = stmt
        .query_map([], |row| Ok((row.get::<_, u32>(0)?, row.get::<_, String>(1)?)))
        .map_err(|e| Error::Database(format!("failed to query schema_version: {e}")))?;

    let mut applied = BTreeMap::new();
    for row in rows {
        let (version, applied_at) =
            row.map_err(|e| Error::Database(format!("failed to read schema_version row: {e}")))?;
        applied.insert(version, applied_at);
    }
    Ok(applied)
}

/// Execute `statement` unless its guard says the effect is already present.
/// Returns whether the statement ran.
fn guarded_execute(conn: &Connection, statement: &str) -> rusqlite::Result<bool> {
    match Guard::classify(statement) {
        Guard::AddColumn { table, column } if column_exists(conn, &table, &column)? => {
            debug!("skipping ADD COLUMN: {table}.{column} already exists");
            return Ok(false);
        }
        Guard::CreateIndex { index } if index_exists(conn, &index)? => {
            debug!("skipping CREATE INDEX: {index} already exists");
            return Ok(false);
        }
        _ => {}
    }

    // execute_batch, not execute: a trailing comment is a valid segment.
    conn.execute_batch(statement)?;
    Ok(true)
}

fn column_exists(conn: &Connection, table: &str, column: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM pragma_table_info(?1) WHERE name = ?2 COLLATE NOCASE)",
        params![table, column],
        |row| row.get(0),
    )
}

fn index_exists(conn: &Connection, index: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'index' AND name = ?1 COLLATE NOCASE)",
        params![index],
        |row| row.get(0),
    )
}
