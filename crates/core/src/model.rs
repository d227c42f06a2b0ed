// SPDX-License-Identifier: MIT

//! The ledger data model (spec §3): `MediaItem`, `Metadata`, and the
//! status transitions a row moves through.

use serde::{Deserialize, Serialize};

/// Status a `MediaItem` row can hold. Transitions are totally ordered and
/// monotone for a given id: `pending -> downloading -> {complete, error}`.
/// The reverse transition only happens via `reset_downloading_to_pending`
/// at daemon startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Pending,
    Downloading,
    Complete,
    Error,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::Downloading => "downloading",
            Status::Complete => "complete",
            Status::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Status::Pending),
            "downloading" => Some(Status::Downloading),
            "complete" => Some(Status::Complete),
            "error" => Some(Status::Error),
            _ => None,
        }
    }
}

/// A row in the ledger's `media_items` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaItem {
    pub id: String,
    pub title: String,
    pub origin_url: String,
    pub video_url: String,
    pub thumbnail_url: String,
    pub timestamp_created: i64,
    pub timestamp_installed: Option<i64>,
    pub timestamp_updated: Option<i64>,
    pub object_path: String,
    pub status: Status,
}

/// The singleton `metadata` row: written at most once, on daemon startup,
/// and immutable thereafter for the daemon's lifetime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub datadir_location: String,
}

/// Metadata probed for a media source before any bytes are downloaded
/// (the `Fetcher::fetch_info` result, spec §4.6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoInfo {
    pub id: String,
    pub object_path: String,
    pub title: String,
    pub origin_url: String,
    pub video_url: String,
    pub thumbnail_url: String,
    pub timestamp: i64,
}

/// A status event emitted by the fetcher while a download is in flight
/// (spec §4.6). `Downloading` may repeat (rate-limited to one per 500ms);
/// `Finished`/`Error` are terminal and emitted at most once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FetchStatus {
    Pending,
    Downloading { progress: f32, bytes: u64, speed: Option<u64>, eta: Option<u64> },
    Finished { filepath: String },
    Error { message: String, details: Option<String> },
}

impl FetchStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, FetchStatus::Finished { .. } | FetchStatus::Error { .. })
    }
}
