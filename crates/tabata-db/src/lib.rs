pub mod database;
pub mod history_store;
pub mod memory_store;
pub mod migrations;
pub mod repository;
pub mod sqlite_store;

pub use database::Database;
pub use history_store::HistoryStore;
pub use memory_store::MemoryStore;
pub use migrations::{
    DEFAULT_MIGRATIONS_DIR, MigrationDescriptor, MigrationReport, MigrationStatus,
    apply_migrations, load_migrations, migrate, migration_status, schema_status,
    validate_migrations,
};
pub use repository::{BlockRepository, ExerciseRepository, SessionRepository};
pub use sqlite_store::{SqliteBlockRepository, SqliteExerciseRepository, SqliteSessionRepository};
