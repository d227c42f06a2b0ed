// SPDX-License-Identifier: MIT

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("sql error: {0}")]
    Sql(#[from] sqlx::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("duplicate item: {0}")]
    Duplicate(String),

    #[error("migration {version} missing its {direction} file ({name})")]
    MissingMigrationFile { version: i64, name: String, direction: &'static str },

    #[error("migration {version} ({name}) failed: {source}")]
    MigrationFailed { version: i64, name: String, #[source] source: sqlx::Error },

    #[error("no migration registered for version {0}")]
    UnknownVersion(i64),
}
