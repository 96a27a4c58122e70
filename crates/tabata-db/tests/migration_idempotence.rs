use std::collections::BTreeSet;
use std::path::Path;

use rusqlite::Connection;
use tabata_db::{
    DEFAULT_MIGRATIONS_DIR, apply_migrations, load_migrations, migrate, migration_status,
};

fn column_names(conn: &Connection, table: &str) -> Vec<String> {
    let mut stmt = conn
        .prepare("SELECT name FROM pragma_table_info(?1)")
        .unwrap();
    stmt.query_map([table], |row| row.get(0))
        .unwrap()
        .map(Result::unwrap)
        .collect()
}

fn index_names(conn: &Connection) -> Vec<String> {
    let mut stmt = conn
        .prepare("SELECT name FROM sqlite_master WHERE type = 'index' ORDER BY name")
        .unwrap();
    stmt.query_map([], |row| row.get(0))
        .unwrap()
        .map(Result::unwrap)
        .collect()
}

/// Every table, index, and column, for comparing whole schemas.
fn schema_snapshot(conn: &Connection) -> BTreeSet<String> {
    let mut stmt = conn
        .prepare("SELECT type, name FROM sqlite_master WHERE name NOT LIKE 'sqlite_%'")
        .unwrap();
    let objects: Vec<(String, String)> = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
        .unwrap()
        .map(Result::unwrap)
        .collect();

    let mut snapshot = BTreeSet::new();
    for (kind, name) in objects {
        if kind == "table" {
            for column in column_names(conn, &name) {
                snapshot.insert(format!("column {name}.{column}"));
            }
        }
        snapshot.insert(format!("{kind} {name}"));
    }
    snapshot
}

fn schema_versions(conn: &Connection) -> Vec<u32> {
    let mut stmt = conn
        .prepare("SELECT version FROM schema_version ORDER BY version")
        .unwrap();
    stmt.query_map([], |row| row.get(0))
        .unwrap()
        .map(Result::unwrap)
        .collect()
}

#[test]
fn bundled_catalog_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("app.db");
    let migrations = load_migrations(Path::new(DEFAULT_MIGRATIONS_DIR)).unwrap();

    let mut conn = Connection::open(&db_path).unwrap();
    apply_migrations(&mut conn, &migrations).unwrap();
    let once = schema_snapshot(&conn);
    let second = apply_migrations(&mut conn, &migrations).unwrap();
    drop(conn);

    assert!(second.is_up_to_date());

    let conn = Connection::open(&db_path).unwrap();
    assert_eq!(schema_snapshot(&conn), once);

    let notes = column_names(&conn, "entries")
        .into_iter()
        .filter(|c| c == "notes")
        .count();
    assert_eq!(notes, 1);

    let index = index_names(&conn)
        .into_iter()
        .filter(|i| i == "idx_entries_created_at")
        .count();
    assert_eq!(index, 1);

    assert_eq!(schema_versions(&conn), [1, 2]);
}

#[test]
fn guards_make_a_forgotten_ledger_safe() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("app.db");
    let migrations = load_migrations(Path::new(DEFAULT_MIGRATIONS_DIR)).unwrap();

    let mut conn = Connection::open(&db_path).unwrap();
    apply_migrations(&mut conn, &migrations).unwrap();
    let before = schema_snapshot(&conn);

    // Losing the ledger forces every statement to run again; the ADD COLUMN
    // and CREATE INDEX guards are what keep that from failing.
    conn.execute_batch("DELETE FROM schema_version").unwrap();
    let report = apply_migrations(&mut conn, &migrations).unwrap();

    assert_eq!(report.applied, [1, 2]);
    assert_eq!(schema_snapshot(&conn), before);
    assert_eq!(schema_versions(&conn), [1, 2]);
}

#[test]
fn migrate_creates_the_database_directory() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("var").join("app.db");

    let report = migrate(&db_path, Path::new(DEFAULT_MIGRATIONS_DIR)).unwrap();
    assert_eq!(report.applied, [1, 2]);
    assert!(db_path.exists());

    let report = migrate(&db_path, Path::new(DEFAULT_MIGRATIONS_DIR)).unwrap();
    assert!(report.is_up_to_date());
    assert_eq!(report.skipped, [1, 2]);
}

#[test]
fn invalid_catalog_never_touches_the_database() {
    let dir = tempfile::tempdir().unwrap();
    let migrations_dir = dir.path().join("migrations");
    std::fs::create_dir(&migrations_dir).unwrap();
    std::fs::write(migrations_dir.join("2_start_late.sql"), "CREATE TABLE t (x INT);").unwrap();

    let db_path = dir.path().join("app.db");
    assert!(migrate(&db_path, &migrations_dir).is_err());
    assert!(!db_path.exists());
}

#[test]
fn status_reports_without_applying() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("app.db");
    let migrations = Path::new(DEFAULT_MIGRATIONS_DIR);

    let pending = migration_status(&db_path, migrations).unwrap();
    assert_eq!(pending.len(), 2);
    assert!(pending.iter().all(|s| !s.is_applied()));

    migrate(&db_path, migrations).unwrap();
    let applied = migration_status(&db_path, migrations).unwrap();
    assert!(applied.iter().all(|s| s.is_applied()));
}
