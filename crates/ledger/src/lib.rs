// SPDX-License-Identifier: MIT

//! The durable ledger (spec §4.4): an embedded SQLite database holding
//! `media_items`, the `metadata` singleton, `tags`, and the schema
//! migration state. The ledger is the queue — the "ready set" at any
//! instant is simply the set of rows with status `pending`.

mod error;
mod migration;
mod queries;

pub use error::LedgerError;
pub use migration::ensure_at_version;
pub use queries::{now_ms, Ledger};

use std::path::Path;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

pub const SCHEMA_VERSION: i64 = 3;

/// Open (creating if necessary) the ledger file at `path`, then migrate it
/// to the current schema version.
pub async fn open(path: &Path) -> Result<Ledger, LedgerError> {
    let options = SqliteConnectOptions::new().filename(path).create_if_missing(true);
    let pool = SqlitePoolOptions::new().max_connections(8).connect_with(options).await?;
    ensure_at_version(&pool, SCHEMA_VERSION, Some(path)).await?;
    Ok(Ledger::new(pool))
}

/// Open a single fresh connection (spec §4.8: the HTTP host "opens a
/// fresh ledger connection per request").
pub async fn open_single(path: &Path) -> Result<Ledger, LedgerError> {
    let options = SqliteConnectOptions::new().filename(path).create_if_missing(false);
    let pool = SqlitePoolOptions::new().max_connections(1).connect_with(options).await?;
    Ok(Ledger::new(pool))
}
