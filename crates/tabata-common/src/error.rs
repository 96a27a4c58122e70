use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("migration error: {0}")]
    Migration(#[from] MigrationError),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Other(String),
}

/// Fatal problems with the migration catalog itself. Any of these stops
/// startup; nothing is applied from a catalog that fails validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MigrationError {
    #[error("invalid migration filename: {0}")]
    InvalidFilename(String),

    #[error("no migrations found in {}", .0.display())]
    Empty(PathBuf),

    #[error("initial migration must be version 1, found {0}")]
    InitialVersion(u32),

    #[error("migrations must be in strictly increasing order ({previous} is followed by {next})")]
    NotIncreasing { previous: u32, next: u32 },

    #[error("duplicate migration version {0}")]
    DuplicateVersion(u32),
}
