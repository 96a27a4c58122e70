//! Versioned SQL migrations tracked in a `schema_version` table.
//!
//! Migrations are files named `<version>_<snake_name>.sql`. The catalog is
//! read fresh from disk on every run, validated, and applied in ascending
//! version order. Re-running against an up-to-date database is a no-op.

mod applier;
mod catalog;
mod statements;

use std::path::Path;

use rusqlite::Connection;
use tabata_common::{Error, Result};
use tracing::info;

pub use applier::{MigrationReport, MigrationStatus, apply_migrations, schema_status};
pub use catalog::{MigrationDescriptor, load_migrations, validate_migrations};
pub use statements::{Guard, split_sql_statements};

/// The migrations shipped with this crate. The path is fixed at build time,
/// so installed binaries should ship a copy and point at it explicitly.
pub const DEFAULT_MIGRATIONS_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/migrations");

/// Load the catalog from `migrations_dir` and bring the database at
/// `db_path` up to date, creating the file and its directory if needed.
pub fn migrate(db_path: &Path, migrations_dir: &Path) -> Result<MigrationReport> {
    let migrations = load_migrations(migrations_dir)?;

    ensure_parent_dir(db_path)?;

    info!("migrating database at {}", db_path.display());
    let mut conn = Connection::open(db_path)
        .map_err(|e| Error::Database(format!("failed to open database: {e}")))?;
    apply_migrations(&mut conn, &migrations)
}

/// Report which catalog entries the database at `db_path` has applied,
/// without applying anything.
pub fn migration_status(db_path: &Path, migrations_dir: &Path) -> Result<Vec<MigrationStatus>> {
    let migrations = load_migrations(migrations_dir)?;
    ensure_parent_dir(db_path)?;
    let conn = Connection::open(db_path)
        .map_err(|e| Error::Database(format!("failed to open database: {e}")))?;
    schema_status(&conn, &migrations)
}

fn ensure_parent_dir(db_path: &Path) -> Result<()> {
    if let Some(parent) = db_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}
