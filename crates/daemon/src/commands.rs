// SPDX-License-Identifier: MIT

//! The four remote-call handlers (spec §6): `i` (enqueue), `ps` (current
//! jobs), `ls` (completed listing), `du` (disk usage). Each is registered
//! under its CLI-facing name in `CommandRegistry` by `lifecycle::serve`.
//! Grounded on the teacher's `listener::query`/`listener::mutations`
//! split: a mutation handler (`i`) and three read-only query handlers.

use std::path::Path;
use std::sync::Arc;

use serde_json::json;

use crate::error::DaemonError;
use crate::registry::Args;
use crate::scheduler::Scheduler;
use mediabin_ledger::Ledger;

pub async fn enqueue(scheduler: Arc<Scheduler>, args: Args) -> Result<serde_json::Value, DaemonError> {
    let url = args.first_str()?;
    match scheduler.enqueue(url).await {
        Ok(id) => Ok(json!({"id": id, "status": "pending"})),
        Err(DaemonError::Duplicate(id)) => {
            // spec §7: DuplicateItem is reported as info, not an error.
            crate::output::stdout(format!("{url} is already known (id {id})"));
            Ok(json!({"id": id, "status": "duplicate"}))
        }
        Err(e) => Err(e),
    }
}

pub async fn list_current_procs(scheduler: Arc<Scheduler>, _args: Args) -> Result<serde_json::Value, DaemonError> {
    let rows = scheduler.list_current_procs().await?;
    let items: Vec<serde_json::Value> = rows
        .into_iter()
        .map(|row| {
            json!({
                "id": row.id,
                "title": row.title,
                "status": row.status,
            })
        })
        .collect();
    Ok(json!({"items": items}))
}

pub async fn list_complete(ledger: Ledger, args: Args) -> Result<serde_json::Value, DaemonError> {
    let title_like = args.keyword_str("q");
    let tags = args.keyword_str_list("t");
    let rows = ledger.list_complete(title_like, &tags).await?;
    let items: Vec<serde_json::Value> = rows
        .into_iter()
        .map(|item| json!({"id": item.id, "title": item.title}))
        .collect();
    Ok(json!({"items": items}))
}

pub async fn disk_usage(datadir: &Path) -> Result<serde_json::Value, DaemonError> {
    let total_bytes = dir_size(datadir).await.unwrap_or(0);
    Ok(json!({"datadir": datadir.to_string_lossy(), "total_bytes": total_bytes}))
}

async fn dir_size(path: &Path) -> std::io::Result<u64> {
    let mut total = 0u64;
    let mut stack = vec![path.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => return Err(e),
        };
        while let Some(entry) = entries.next_entry().await? {
            let metadata = entry.metadata().await?;
            if metadata.is_dir() {
                stack.push(entry.path());
            } else {
                total += metadata.len();
            }
        }
    }
    Ok(total)
}
