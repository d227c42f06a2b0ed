// SPDX-License-Identifier: MIT

use mediabin_core::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("could not determine the user's home directory")]
    NoHomeDir,

    #[error("daemon is already running (pid {0})")]
    AlreadyRunning(i32),

    #[error("failed to detach daemon process: {0}")]
    Detach(String),

    #[error("config file error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ledger error: {0}")]
    Ledger(#[from] mediabin_ledger::LedgerError),

    #[error("fetcher error: {0}")]
    Fetcher(#[from] mediabin_fetcher::FetcherError),

    #[error("protocol error: {0}")]
    Protocol(#[from] mediabin_wire::ProtocolError),

    #[error("item {0} was not found")]
    NotFound(String),

    #[error("duplicate item {0}")]
    Duplicate(String),

    #[error("unknown command {0:?}")]
    UnknownCommand(String),

    #[error("bad arguments: {0}")]
    BadArgs(String),
}

impl DaemonError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DaemonError::AlreadyRunning(_) => ErrorKind::AlreadyRunning,
            DaemonError::Duplicate(_) => ErrorKind::DuplicateItem,
            DaemonError::Fetcher(_) => ErrorKind::FetcherMetadata,
            DaemonError::Ledger(mediabin_ledger::LedgerError::MigrationFailed { .. })
            | DaemonError::Ledger(mediabin_ledger::LedgerError::MissingMigrationFile { .. }) => ErrorKind::MigrationFailed,
            DaemonError::Ledger(mediabin_ledger::LedgerError::Duplicate(_)) => ErrorKind::DuplicateItem,
            DaemonError::Protocol(_) => ErrorKind::ProtocolError,
            DaemonError::NotFound(_) => ErrorKind::NotFound,
            DaemonError::UnknownCommand(_) | DaemonError::BadArgs(_) => ErrorKind::ProtocolError,
            _ => ErrorKind::Internal,
        }
    }
}
