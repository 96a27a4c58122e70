use std::path::Path;

use rusqlite::Connection;
use tabata_common::{Error, Result};
use tracing::info;

use crate::migrations::{
    DEFAULT_MIGRATIONS_DIR, MigrationDescriptor, MigrationReport, MigrationStatus,
    apply_migrations, load_migrations, schema_status,
};
use crate::sqlite_store::{
    SqliteBlockRepository, SqliteExerciseRepository, SqliteSessionRepository,
};

/// A migrated SQLite database holding workout definitions.
pub struct Database {
    conn: Connection,
    report: MigrationReport,
}

impl Database {
    /// Open (or create) the database at `db_path` and apply any pending
    /// migrations from `migrations_dir`.
    /// An invalid catalog is rejected before anything is created on disk.
    pub fn open(db_path: &Path, migrations_dir: &Path) -> Result<Self> {
        let migrations = load_migrations(migrations_dir)?;

        info!("opening workout database at {}", db_path.display());
        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(db_path)
            .map_err(|e| Error::Database(format!("failed to open database: {e}")))?;
        Self::with_connection(conn, &migrations)
    }

    /// A fresh in-memory database with the bundled migrations applied.
    pub fn in_memory() -> Result<Self> {
        let migrations = load_migrations(Path::new(DEFAULT_MIGRATIONS_DIR))?;
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::Database(format!("failed to open in-memory database: {e}")))?;
        Self::with_connection(conn, &migrations)
    }

    fn with_connection(mut conn: Connection, migrations: &[MigrationDescriptor]) -> Result<Self> {
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
            .map_err(|e| Error::Database(format!("failed to set pragmas: {e}")))?;

        let report = apply_migrations(&mut conn, migrations)?;
        Ok(Self { conn, report })
    }

    /// What the migration run at open time did.
    pub fn migration_report(&self) -> &MigrationReport {
        &self.report
    }

    pub fn schema_status(&self, migrations_dir: &Path) -> Result<Vec<MigrationStatus>> {
        let migrations = load_migrations(migrations_dir)?;
        schema_status(&self.conn, &migrations)
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn exercises(&self) -> SqliteExerciseRepository<'_> {
        SqliteExerciseRepository::new(&self.conn)
    }

    pub fn blocks(&self) -> SqliteBlockRepository<'_> {
        SqliteBlockRepository::new(&self.conn)
    }

    pub fn sessions(&self) -> SqliteSessionRepository<'_> {
        SqliteSessionRepository::new(&self.conn)
    }
}
