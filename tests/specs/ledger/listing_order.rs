// SPDX-License-Identifier: MIT

//! P8: `list_complete` returns rows sorted by
//! `timestamp_updated DESC, timestamp_installed DESC, title ASC`.

use crate::prelude::*;
use mediabin_core::{MediaItem, Status};

fn item(id: &str, title: &str) -> MediaItem {
    MediaItem {
        id: id.to_string(),
        title: title.to_string(),
        origin_url: format!("https://example.test/{id}"),
        video_url: format!("https://example.test/{id}/video"),
        thumbnail_url: String::new(),
        timestamp_created: 0,
        timestamp_installed: None,
        timestamp_updated: None,
        object_path: id.to_string(),
        status: Status::Pending,
    }
}

#[tokio::test]
async fn complete_rows_sort_by_updated_then_installed_then_title() {
    let (_dir, ledger) = fresh_ledger().await;

    ledger.insert_pending(&item("a", "Charlie")).await.expect("insert a");
    ledger.insert_pending(&item("b", "Alpha")).await.expect("insert b");
    ledger.insert_pending(&item("c", "Bravo")).await.expect("insert c");

    // "a" and "b" complete at the same timestamp, so they tie-break on
    // title; "c" completes later and must sort first.
    ledger.mark_complete("a", 100).await.expect("complete a");
    ledger.mark_complete("b", 100).await.expect("complete b");
    ledger.mark_complete("c", 200).await.expect("complete c");

    let rows = ledger.list_complete(None, &[]).await.expect("list complete");
    let ids: Vec<&str> = rows.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["c", "b", "a"]);
}

#[tokio::test]
async fn title_filter_is_case_insensitive_and_whitespace_split() {
    let (_dir, ledger) = fresh_ledger().await;
    ledger.insert_pending(&item("a", "Evening News Recap")).await.expect("insert a");
    ledger.insert_pending(&item("b", "Morning Weather")).await.expect("insert b");
    ledger.mark_complete("a", 10).await.expect("complete a");
    ledger.mark_complete("b", 10).await.expect("complete b");

    let rows = ledger.list_complete(Some("evening recap"), &[]).await.expect("list complete");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, "a");
}
