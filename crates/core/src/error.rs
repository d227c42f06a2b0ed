// SPDX-License-Identifier: MIT

//! Error kind taxonomy shared across crate boundaries (spec §7).
//!
//! Individual crates (`mediabin-ledger`, `mediabin-fetcher`,
//! `mediabin-daemon`) define their own `thiserror` error enums for the
//! failures specific to their domain; this type is the common currency
//! they convert into at the `ErrorResult{message, kind}` wire boundary, so
//! a CLI client can match on `kind` without depending on internal error
//! types of the daemon it happens to be talking to.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    DaemonUnreachable,
    AlreadyRunning,
    DuplicateItem,
    FetcherMetadata,
    FetcherDownload,
    MigrationFailed,
    ProtocolError,
    NotFound,
    Internal,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorKind::DaemonUnreachable => "daemon_unreachable",
            ErrorKind::AlreadyRunning => "already_running",
            ErrorKind::DuplicateItem => "duplicate_item",
            ErrorKind::FetcherMetadata => "fetcher_metadata",
            ErrorKind::FetcherDownload => "fetcher_download",
            ErrorKind::MigrationFailed => "migration_failed",
            ErrorKind::ProtocolError => "protocol_error",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Internal => "internal",
        };
        f.write_str(s)
    }
}

/// A typed error carrying the wire-visible kind alongside a human message.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct MediabinError {
    pub kind: ErrorKind,
    pub message: String,
}

impl MediabinError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }
}
