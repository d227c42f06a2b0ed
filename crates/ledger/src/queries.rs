// SPDX-License-Identifier: MIT

//! Ledger queries (spec §4.4): the durable record of media items, the
//! metadata singleton, and tag filtering.

use chrono::Utc;
use mediabin_core::{MediaItem, Metadata, Status};
use sqlx::{Row, SqlitePool};

use crate::error::LedgerError;

#[derive(Clone)]
pub struct Ledger {
    pool: SqlitePool,
}

fn row_to_item(row: sqlx::sqlite::SqliteRow) -> Result<MediaItem, LedgerError> {
    let status_str: String = row.try_get("status")?;
    let status = Status::parse(&status_str).unwrap_or(Status::Error);
    Ok(MediaItem {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        origin_url: row.try_get("origin_url")?,
        video_url: row.try_get("video_url")?,
        thumbnail_url: row.try_get("thumbnail_url")?,
        timestamp_created: row.try_get("timestamp_created")?,
        timestamp_installed: row.try_get("timestamp_installed")?,
        timestamp_updated: row.try_get("timestamp_updated")?,
        object_path: row.try_get("object_path")?,
        status,
    })
}

impl Ledger {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Insert a new row in `pending` status. Rejects a duplicate `id` with
    /// `LedgerError::Duplicate`, which callers interpret as "already
    /// known" per the error handling design (`DuplicateItem`, not a hard
    /// failure). The `UNIQUE` primary key on `id` is the atomic boundary
    /// that makes this safe under concurrent enqueue of the same URL
    /// (spec §9's "ambiguity" note: a concurrent duplicate enqueue sees
    /// either the row or a constraint violation, never a torn insert).
    pub async fn insert_pending(&self, item: &MediaItem) -> Result<(), LedgerError> {
        let result = sqlx::query(
            "INSERT INTO media_items
                (id, title, origin_url, video_url, thumbnail_url, timestamp_created,
                 timestamp_installed, timestamp_updated, object_path, status)
             VALUES (?, ?, ?, ?, ?, ?, NULL, NULL, ?, 'pending')",
        )
        .bind(&item.id)
        .bind(&item.title)
        .bind(&item.origin_url)
        .bind(&item.video_url)
        .bind(&item.thumbnail_url)
        .bind(item.timestamp_created)
        .bind(&item.object_path)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(LedgerError::Duplicate(item.id.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn promote_to_downloading(&self, id: &str) -> Result<bool, LedgerError> {
        let result = sqlx::query("UPDATE media_items SET status = 'downloading' WHERE id = ? AND status = 'pending'")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn mark_complete(&self, id: &str, now_ms: i64) -> Result<(), LedgerError> {
        sqlx::query(
            "UPDATE media_items SET status = 'complete', timestamp_installed = ?, timestamp_updated = ? WHERE id = ?",
        )
        .bind(now_ms)
        .bind(now_ms)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn mark_error(&self, id: &str) -> Result<(), LedgerError> {
        sqlx::query("UPDATE media_items SET status = 'error' WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Reset every `downloading` row back to `pending`. Called exactly
    /// once at daemon startup to recover jobs interrupted by a previous
    /// crash (spec P4).
    pub async fn reset_downloading_to_pending(&self) -> Result<u64, LedgerError> {
        let result = sqlx::query("UPDATE media_items SET status = 'pending' WHERE status = 'downloading'")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// One `(id, origin_url)` pair with status `pending`, or `None`. The
    /// caller must promote it under the scheduler lock before acting on
    /// it (spec §4.4: "the caller must promote it under the scheduler
    /// lock").
    pub async fn next_pending(&self) -> Result<Option<(String, String)>, LedgerError> {
        let row = sqlx::query("SELECT id, origin_url FROM media_items WHERE status = 'pending' LIMIT 1")
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| (r.get("id"), r.get("origin_url"))))
    }

    pub async fn get(&self, id: &str) -> Result<Option<MediaItem>, LedgerError> {
        let row = sqlx::query("SELECT * FROM media_items WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(row_to_item).transpose()
    }

    /// Rows with status `downloading`, for `list_current_procs` to join
    /// against titles (spec §4.7).
    pub async fn list_downloading(&self) -> Result<Vec<MediaItem>, LedgerError> {
        let rows = sqlx::query("SELECT * FROM media_items WHERE status = 'downloading'")
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(row_to_item).collect()
    }

    /// Rows still `pending` (not yet promoted), for `list_current_procs`.
    pub async fn list_pending(&self) -> Result<Vec<MediaItem>, LedgerError> {
        let rows = sqlx::query("SELECT * FROM media_items WHERE status = 'pending'")
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(row_to_item).collect()
    }

    /// Completed items ordered `timestamp_updated DESC, timestamp_installed
    /// DESC, title ASC` (spec P8), filtered by a case-insensitive
    /// whitespace-split title substring match and a tag intersection.
    pub async fn list_complete(
        &self,
        title_like: Option<&str>,
        tags: &[String],
    ) -> Result<Vec<MediaItem>, LedgerError> {
        let mut sql = String::from(
            "SELECT m.* FROM media_items m WHERE m.status = 'complete'",
        );
        let words: Vec<String> = title_like
            .unwrap_or_default()
            .split_whitespace()
            .map(|w| w.to_lowercase())
            .collect();
        for _ in &words {
            sql.push_str(" AND LOWER(m.title) LIKE ?");
        }

        // Tag intersection: require a matching tags row per requested tag
        // rather than a bare `IN ?` placeholder for a list (spec §9's
        // "ambiguity" note) — and skip the join entirely on an empty list
        // so `ls` with no `-t` doesn't accidentally exclude untagged items.
        for _ in tags {
            sql.push_str(" AND EXISTS (SELECT 1 FROM tags t WHERE t.resource_id = m.id AND t.tag = ?)");
        }

        sql.push_str(" ORDER BY m.timestamp_updated DESC, m.timestamp_installed DESC, m.title ASC");

        let mut query = sqlx::query(&sql);
        for word in &words {
            query = query.bind(format!("%{word}%"));
        }
        for tag in tags {
            query = query.bind(tag);
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.into_iter().map(row_to_item).collect()
    }

    pub async fn add_tag(&self, resource_id: &str, tag: &str) -> Result<(), LedgerError> {
        sqlx::query("INSERT OR IGNORE INTO tags (resource_id, tag) VALUES (?, ?)")
            .bind(resource_id)
            .bind(tag)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Write the metadata singleton if it doesn't exist yet; a no-op
    /// otherwise, since the row is immutable for the daemon's lifetime
    /// once written (spec §3).
    pub async fn ensure_metadata(&self, default_datadir: &str) -> Result<Metadata, LedgerError> {
        if let Some(existing) = self.get_metadata().await? {
            return Ok(existing);
        }
        sqlx::query("INSERT OR IGNORE INTO metadata (id, datadir_location) VALUES (1, ?)")
            .bind(default_datadir)
            .execute(&self.pool)
            .await?;
        self.get_metadata()
            .await?
            .ok_or_else(|| LedgerError::UnknownVersion(0))
    }

    pub async fn get_metadata(&self) -> Result<Option<Metadata>, LedgerError> {
        let row = sqlx::query("SELECT datadir_location FROM metadata WHERE id = 1")
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| Metadata { datadir_location: r.get("datadir_location") }))
    }

    /// Total bytes of completed artifacts' directories is a filesystem
    /// concern (`du`, spec §6); this returns only the row count used to
    /// sanity-check the scan.
    pub async fn count_complete(&self) -> Result<i64, LedgerError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM media_items WHERE status = 'complete'")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0)
    }
}

pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}
