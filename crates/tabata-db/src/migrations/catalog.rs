use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tabata_common::{Error, MigrationError, Result};
use tracing::debug;

static MIGRATION_FILENAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)_([a-z0-9_]+)\.sql$").expect("migration filename pattern is valid")
});

/// One versioned SQL file in the migrations directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationDescriptor {
    pub version: u32,
    pub name: String,
    pub path: PathBuf,
}

impl MigrationDescriptor {
    /// Parse `<version>_<name>.sql`. Returns `None` when the filename does
    /// not follow the pattern or the version does not fit in a `u32`.
    pub fn from_path(path: &Path) -> Option<Self> {
        let filename = path.file_name()?.to_str()?;
        let captures = MIGRATION_FILENAME.captures(filename)?;
        let version = captures[1].parse().ok()?;
        Some(Self {
            version,
            name: captures[2].to_string(),
            path: path.to_path_buf(),
        })
    }

    pub fn read_sql(&self) -> Result<String> {
        std::fs::read_to_string(&self.path).map_err(Error::from)
    }

    /// `<version>_<name>`, for logs and error messages.
    pub fn label(&self) -> String {
        format!("{}_{}", self.version, self.name)
    }
}

/// Load every `*.sql` file in `directory` as a migration, ordered by numeric
/// version. Other files are ignored.
pub fn load_migrations(directory: &Path) -> Result<Vec<MigrationDescriptor>> {
    let entries = std::fs::read_dir(directory).map_err(|e| {
        Error::Io(std::io::Error::new(
            e.kind(),
            format!("failed to read migrations directory {}: {e}", directory.display()),
        ))
    })?;

    let mut migrations = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if !path.is_file() || path.extension().is_none_or(|ext| ext != "sql") {
            continue;
        }
        let migration = MigrationDescriptor::from_path(&path).ok_or_else(|| {
            let filename = path
                .file_name()
                .map(|f| f.to_string_lossy().into_owned())
                .unwrap_or_default();
            MigrationError::InvalidFilename(filename)
        })?;
        debug!("found migration {}", migration.label());
        migrations.push(migration);
    }

    // Numeric, not lexicographic: 10_ must come after 2_.
    migrations.sort_by_key(|m| m.version);

    if migrations.is_empty() {
        return Err(MigrationError::Empty(directory.to_path_buf()).into());
    }
    validate_migrations(&migrations)?;
    Ok(migrations)
}

/// Check a catalog in the order given: non-empty, lowest version 1, strictly
/// increasing, no duplicates.
pub fn validate_migrations(migrations: &[MigrationDescriptor]) -> Result<()> {
    let Some(min) = migrations.iter().map(|m| m.version).min() else {
        return Err(MigrationError::Empty(PathBuf::new()).into());
    };
    if min != 1 {
        return Err(MigrationError::InitialVersion(min).into());
    }

    for pair in migrations.windows(2) {
        let (previous, next) = (pair[0].version, pair[1].version);
        if previous == next {
            return Err(MigrationError::DuplicateVersion(next).into());
        }
        if previous > next {
            return Err(MigrationError::NotIncreasing { previous, next }.into());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(version: u32) -> MigrationDescriptor {
        MigrationDescriptor {
            version,
            name: format!("step_{version}"),
            path: PathBuf::from(format!("{version}_step_{version}.sql")),
        }
    }

    fn catalog(versions: &[u32]) -> Vec<MigrationDescriptor> {
        versions.iter().copied().map(descriptor).collect()
    }

    fn write(dir: &Path, name: &str, sql: &str) {
        std::fs::write(dir.join(name), sql).unwrap();
    }

    fn migration_error(result: Result<impl std::fmt::Debug>) -> MigrationError {
        match result {
            Err(Error::Migration(e)) => e,
            other => panic!("expected migration error, got {other:?}"),
        }
    }

    #[test]
    fn parses_version_and_name() {
        let m = MigrationDescriptor::from_path(Path::new("/m/007_add_notes.sql")).unwrap();
        assert_eq!(m.version, 7);
        assert_eq!(m.name, "add_notes");
        assert_eq!(m.label(), "7_add_notes");
    }

    #[test]
    fn rejects_malformed_filenames() {
        for name in [
            "add_notes.sql",
            "1-add-notes.sql",
            "1_AddNotes.sql",
            "1_.sql",
            "v1_init.sql",
            "99999999999_too_big.sql",
        ] {
            assert!(
                MigrationDescriptor::from_path(Path::new(name)).is_none(),
                "{name} should not parse"
            );
        }
    }

    #[test]
    fn loads_in_numeric_order() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "10_tenth.sql", "SELECT 10;");
        write(dir.path(), "2_second.sql", "SELECT 2;");
        write(dir.path(), "1_first.sql", "SELECT 1;");

        let migrations = load_migrations(dir.path()).unwrap();
        let versions: Vec<_> = migrations.iter().map(|m| m.version).collect();
        assert_eq!(versions, [1, 2, 10]);
        assert_eq!(migrations[2].name, "tenth");
    }

    #[test]
    fn ignores_non_sql_entries() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "1_init.sql", "SELECT 1;");
        write(dir.path(), "README.md", "notes");
        std::fs::create_dir(dir.path().join("archive.sql")).unwrap();

        let migrations = load_migrations(dir.path()).unwrap();
        assert_eq!(migrations.len(), 1);
    }

    #[test]
    fn invalid_sql_filename_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "1_init.sql", "SELECT 1;");
        write(dir.path(), "2_Bad-Name.sql", "SELECT 2;");

        let err = migration_error(load_migrations(dir.path()));
        assert_eq!(err, MigrationError::InvalidFilename("2_Bad-Name.sql".into()));
    }

    #[test]
    fn empty_directory_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = migration_error(load_migrations(dir.path()));
        assert!(matches!(err, MigrationError::Empty(_)));
    }

    #[test]
    fn missing_directory_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_migrations(&dir.path().join("nope"));
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn catalog_not_starting_at_one_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "2_second.sql", "SELECT 2;");
        write(dir.path(), "3_third.sql", "SELECT 3;");

        let err = migration_error(load_migrations(dir.path()));
        assert_eq!(err, MigrationError::InitialVersion(2));
    }

    #[test]
    fn duplicate_versions_on_disk_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "1_init.sql", "SELECT 1;");
        write(dir.path(), "2_alpha.sql", "SELECT 2;");
        write(dir.path(), "02_beta.sql", "SELECT 2;");

        let err = migration_error(load_migrations(dir.path()));
        assert_eq!(err, MigrationError::DuplicateVersion(2));
    }

    #[test]
    fn gaps_are_allowed() {
        assert!(validate_migrations(&catalog(&[1, 3, 7])).is_ok());
    }

    #[test]
    fn validate_rejects_empty() {
        let err = migration_error(validate_migrations(&[]));
        assert!(matches!(err, MigrationError::Empty(_)));
    }

    #[test]
    fn validate_rejects_out_of_order() {
        let err = migration_error(validate_migrations(&catalog(&[1, 3, 2])));
        assert_eq!(
            err,
            MigrationError::NotIncreasing {
                previous: 3,
                next: 2
            }
        );
    }

    #[test]
    fn validate_rejects_duplicates() {
        let err = migration_error(validate_migrations(&catalog(&[1, 2, 2])));
        assert_eq!(err, MigrationError::DuplicateVersion(2));
    }

    #[test]
    fn validate_rejects_missing_first_version() {
        let err = migration_error(validate_migrations(&catalog(&[2, 3])));
        assert_eq!(err, MigrationError::InitialVersion(2));
    }
}
