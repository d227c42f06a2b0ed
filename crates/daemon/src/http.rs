// SPDX-License-Identifier: MIT

//! The media HTTP server host (spec §4.8): a read-only `axum` server
//! exposing `GET /media/list` and `GET /media/play/<id>`. Range parsing
//! and the partial-content response shape are grounded directly on
//! `ferrex-server::stream::stream_handlers` (`bytes=start-end` parsing,
//! `ReaderStream` + `Content-Range`/`Accept-Ranges`), simplified to the
//! single-user, no-auth surface this spec calls for. The host opens a
//! fresh ledger connection per request (spec §4.8) rather than sharing
//! the scheduler's pool, since it has no other state to coordinate.

use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path as AxumPath, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;
use tracing::warn;

#[derive(Clone)]
pub struct HttpState {
    pub ledger_path: PathBuf,
    pub datadir: PathBuf,
}

pub fn router(state: HttpState) -> Router {
    Router::new()
        .route("/media/list", get(list_handler))
        .route("/media/play/:id", get(play_handler))
        .with_state(Arc::new(state))
}

async fn list_handler(State(state): State<Arc<HttpState>>) -> Result<axum::Json<serde_json::Value>, (StatusCode, String)> {
    let ledger = mediabin_ledger::open_single(&state.ledger_path)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    let rows = ledger
        .list_complete(None, &[])
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    let items: Vec<serde_json::Value> =
        rows.into_iter().map(|item| serde_json::json!({"id": item.id, "title": item.title})).collect();
    Ok(axum::Json(serde_json::json!({"items": items})))
}

async fn play_handler(
    State(state): State<Arc<HttpState>>,
    AxumPath(id): AxumPath<String>,
    headers: HeaderMap,
) -> Result<Response, (StatusCode, String)> {
    let ledger = mediabin_ledger::open_single(&state.ledger_path)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    let item = ledger
        .get(&id)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .filter(|item| item.status == mediabin_core::Status::Complete)
        .ok_or((StatusCode::NOT_FOUND, "media not found".to_string()))?;

    let video_path = state.datadir.join(&item.object_path).join("video.mp4");
    let mut file = tokio::fs::File::open(&video_path).await.map_err(|e| {
        warn!(path = %video_path.display(), error = %e, "media file missing on disk");
        (StatusCode::NOT_FOUND, "media file missing on disk".to_string())
    })?;
    let file_size = file
        .metadata()
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .len();

    if let Some(range) = headers.get(header::RANGE).and_then(|v| v.to_str().ok()).and_then(|s| parse_range(s, file_size)) {
        file.seek(std::io::SeekFrom::Start(*range.start()))
            .await
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
        let content_length = range.end() - range.start() + 1;
        let stream = ReaderStream::new(file.take(content_length));
        return Response::builder()
            .status(StatusCode::PARTIAL_CONTENT)
            .header(header::CONTENT_TYPE, "video/mp4")
            .header(header::CONTENT_LENGTH, content_length.to_string())
            .header(header::CONTENT_RANGE, format!("bytes {}-{}/{}", range.start(), range.end(), file_size))
            .header(header::ACCEPT_RANGES, "bytes")
            .body(Body::from_stream(stream))
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
    }

    let stream = ReaderStream::new(file);
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "video/mp4")
        .header(header::CONTENT_LENGTH, file_size.to_string())
        .header(header::ACCEPT_RANGES, "bytes")
        .body(Body::from_stream(stream))
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}

/// Parse a `bytes=start-end` Range header value (spec §4.8). An empty
/// start means "last N bytes"; an empty end means "to end of file".
fn parse_range(range_str: &str, file_size: u64) -> Option<RangeInclusive<u64>> {
    let range_part = range_str.strip_prefix("bytes=")?;
    let (start_str, end_str) = range_part.split_once('-')?;

    let start = if start_str.is_empty() {
        let suffix_len: u64 = end_str.parse().ok()?;
        file_size.saturating_sub(suffix_len)
    } else {
        start_str.parse().ok()?
    };

    let end = if end_str.is_empty() || start_str.is_empty() {
        file_size.saturating_sub(1)
    } else {
        let requested: u64 = end_str.parse().ok()?;
        requested.min(file_size.saturating_sub(1))
    };

    if start > end {
        return None;
    }
    Some(start..=end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bounded_range() {
        let range = parse_range("bytes=0-99", 1000).unwrap();
        assert_eq!(*range.start(), 0);
        assert_eq!(*range.end(), 99);
    }

    #[test]
    fn parses_suffix_range() {
        let range = parse_range("bytes=-100", 1000).unwrap();
        assert_eq!(*range.start(), 900);
        assert_eq!(*range.end(), 999);
    }

    #[test]
    fn parses_open_ended_range() {
        let range = parse_range("bytes=500-", 1000).unwrap();
        assert_eq!(*range.start(), 500);
        assert_eq!(*range.end(), 999);
    }

    #[test]
    fn clamps_end_beyond_file_size() {
        let range = parse_range("bytes=0-99999", 1000).unwrap();
        assert_eq!(*range.end(), 999);
    }

    #[test]
    fn rejects_malformed_unit() {
        assert!(parse_range("items=0-99", 1000).is_none());
    }
}
