// SPDX-License-Identifier: MIT

//! Schema migrator (spec §4.4): brings the ledger to a target version using
//! a directory of numbered, reversible SQL scripts embedded into the
//! binary. Every migration runs in its own transaction; applied versions
//! are recorded in `_schema_migrations`; a file-copy backup is taken
//! before the first migration step of an already-populated database;
//! missing direction files are a load-time error, not a deferred one.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::Utc;
use include_dir::{include_dir, Dir};
use sqlx::SqlitePool;

use crate::error::LedgerError;

static MIGRATIONS_DIR: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/migrations");

struct Migration {
    name: String,
    up_sql: String,
    down_sql: String,
}

#[derive(Default)]
struct MigrationFile {
    name: Option<String>,
    up_sql: Option<String>,
    down_sql: Option<String>,
}

fn parse_stem(file_name: &str) -> Option<(i64, String, bool)> {
    let stem = file_name.strip_suffix(".sql")?;
    let (version_str, rest) = stem.split_once('_')?;
    let version: i64 = version_str.parse().ok()?;
    if let Some(name) = rest.strip_suffix("_up") {
        Some((version, name.to_string(), true))
    } else if let Some(name) = rest.strip_suffix("_down") {
        Some((version, name.to_string(), false))
    } else {
        None
    }
}

/// Load and validate the embedded migration set, failing loudly if any
/// version is missing its up or down script.
fn load_migrations() -> Result<BTreeMap<i64, Migration>, LedgerError> {
    let mut files: BTreeMap<i64, MigrationFile> = BTreeMap::new();

    for entry in MIGRATIONS_DIR.files() {
        let Some(file_name) = entry.path().file_name().and_then(|f| f.to_str()) else {
            continue;
        };
        let Some((version, name, is_up)) = parse_stem(file_name) else {
            continue;
        };
        let sql = entry.contents_utf8().unwrap_or_default().to_string();
        let record = files.entry(version).or_default();
        record.name = Some(name);
        if is_up {
            record.up_sql = Some(sql);
        } else {
            record.down_sql = Some(sql);
        }
    }

    let mut migrations = BTreeMap::new();
    for (version, file) in files {
        let name = file.name.unwrap_or_default();
        let up_sql = file.up_sql.ok_or_else(|| LedgerError::MissingMigrationFile {
            version,
            name: name.clone(),
            direction: "up",
        })?;
        let down_sql = file.down_sql.ok_or_else(|| LedgerError::MissingMigrationFile {
            version,
            name: name.clone(),
            direction: "down",
        })?;
        migrations.insert(version, Migration { name, up_sql, down_sql });
    }
    Ok(migrations)
}

async fn ensure_migrations_table(pool: &SqlitePool) -> Result<(), LedgerError> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS _schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn current_version(pool: &SqlitePool) -> Result<i64, LedgerError> {
    let row: (Option<i64>,) = sqlx::query_as("SELECT MAX(version) FROM _schema_migrations")
        .fetch_one(pool)
        .await?;
    Ok(row.0.unwrap_or(0))
}

fn split_statements(sql: &str) -> impl Iterator<Item = &str> {
    sql.split(';').map(str::trim).filter(|s| !s.is_empty())
}

async fn run_script(pool: &SqlitePool, sql: &str) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    for statement in split_statements(sql) {
        sqlx::query(statement).execute(&mut *tx).await?;
    }
    tx.commit().await
}

/// Back up `path` (a file-copy, not a logical dump) before mutating an
/// already-populated database. Best-effort on missing path info: a
/// connection without a known file path (e.g. `:memory:`) skips the
/// backup, since there's nothing on disk to copy.
fn backup_file(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        return Ok(());
    }
    let stamp = Utc::now().format("%Y%m%dT%H%M%S%.3f");
    let backup_path = path.with_extension(format!("bak-{stamp}"));
    std::fs::copy(path, backup_path)?;
    Ok(())
}

/// Bring the schema to `target`, migrating up or down from whatever
/// version it currently sits at. `ledger_path` is used only to take a
/// backup copy before the first step of a populated database.
pub async fn ensure_at_version(
    pool: &SqlitePool,
    target: i64,
    ledger_path: Option<&Path>,
) -> Result<(), LedgerError> {
    ensure_migrations_table(pool).await?;
    let current = current_version(pool).await?;
    if current == target {
        return Ok(());
    }

    let migrations = load_migrations()?;
    let populated = current > 0;
    if populated {
        if let Some(path) = ledger_path {
            backup_file(path)?;
        }
    }

    if target > current {
        for version in (current + 1)..=target {
            let migration = migrations
                .get(&version)
                .ok_or(LedgerError::UnknownVersion(version))?;
            run_script(pool, &migration.up_sql).await.map_err(|source| {
                LedgerError::MigrationFailed { version, name: migration.name.clone(), source }
            })?;
            sqlx::query("INSERT INTO _schema_migrations (version, applied_at) VALUES (?, ?)")
                .bind(version)
                .bind(Utc::now().timestamp_millis())
                .execute(pool)
                .await?;
        }
    } else {
        for version in ((target + 1)..=current).rev() {
            let migration = migrations
                .get(&version)
                .ok_or(LedgerError::UnknownVersion(version))?;
            run_script(pool, &migration.down_sql).await.map_err(|source| {
                LedgerError::MigrationFailed { version, name: migration.name.clone(), source }
            })?;
            sqlx::query("DELETE FROM _schema_migrations WHERE version = ?")
                .bind(version)
                .execute(pool)
                .await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn fresh_pool() -> SqlitePool {
        SqlitePoolOptions::new().connect("sqlite::memory:").await.unwrap()
    }

    #[tokio::test]
    async fn migrates_up_to_latest() {
        let pool = fresh_pool().await;
        ensure_at_version(&pool, 3, None).await.unwrap();
        assert_eq!(current_version(&pool).await.unwrap(), 3);

        // Tables exist and are usable.
        sqlx::query("INSERT INTO media_items (id, title, origin_url, video_url, thumbnail_url, timestamp_created, object_path, status) VALUES ('a', 't', 'u', 'v', 'th', 0, 'a/a', 'pending')")
            .execute(&pool)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn round_trip_up_then_down(/* P7 */) {
        let pool = fresh_pool().await;
        ensure_at_version(&pool, 3, None).await.unwrap();
        ensure_at_version(&pool, 1, None).await.unwrap();
        assert_eq!(current_version(&pool).await.unwrap(), 1);

        let applied: Vec<i64> = sqlx::query_as("SELECT version FROM _schema_migrations ORDER BY version")
            .fetch_all(&pool)
            .await
            .unwrap()
            .into_iter()
            .map(|(v,): (i64,)| v)
            .collect();
        assert_eq!(applied, vec![1]);

        ensure_at_version(&pool, 3, None).await.unwrap();
        assert_eq!(current_version(&pool).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn is_idempotent_at_same_version() {
        let pool = fresh_pool().await;
        ensure_at_version(&pool, 2, None).await.unwrap();
        ensure_at_version(&pool, 2, None).await.unwrap();
        assert_eq!(current_version(&pool).await.unwrap(), 2);
    }

    #[test]
    fn parses_version_name_and_direction() {
        assert_eq!(
            parse_stem("0001_media_items_up.sql"),
            Some((1, "media_items".to_string(), true))
        );
        assert_eq!(
            parse_stem("0002_metadata_down.sql"),
            Some((2, "metadata".to_string(), false))
        );
        assert_eq!(parse_stem("not_a_migration.sql"), None);
    }
}
