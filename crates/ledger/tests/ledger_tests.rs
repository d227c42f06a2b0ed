// SPDX-License-Identifier: MIT

use mediabin_core::{MediaItem, Status};

fn sample_item(id: &str, title: &str) -> MediaItem {
    MediaItem {
        id: id.to_string(),
        title: title.to_string(),
        origin_url: format!("https://example.test/{id}"),
        video_url: format!("https://example.test/{id}/video"),
        thumbnail_url: String::new(),
        timestamp_created: mediabin_ledger::now_ms(),
        timestamp_installed: None,
        timestamp_updated: None,
        object_path: format!("{}/{}/{}", &id[0..4], &id[4..8], id),
        status: Status::Pending,
    }
}

async fn open_temp() -> (tempfile::TempDir, mediabin_ledger::Ledger) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.db");
    let ledger = mediabin_ledger::open(&path).await.unwrap();
    (dir, ledger)
}

#[tokio::test]
async fn p1_dedup_rejects_repeated_id() {
    let (_dir, ledger) = open_temp().await;
    let item = sample_item("11112222333344445555666677778888", "Dup");
    ledger.insert_pending(&item).await.unwrap();

    let err = ledger.insert_pending(&item).await.unwrap_err();
    assert!(matches!(err, mediabin_ledger::LedgerError::Duplicate(_)));

    let rows = ledger.list_pending().await.unwrap();
    assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn p3_terminal_status_is_not_reverted_by_promote() {
    let (_dir, ledger) = open_temp().await;
    let item = sample_item("aaaa1111bbbb2222cccc3333dddd4444", "Terminal");
    ledger.insert_pending(&item).await.unwrap();
    assert!(ledger.promote_to_downloading(&item.id).await.unwrap());
    ledger.mark_complete(&item.id, mediabin_ledger::now_ms()).await.unwrap();

    // promote_to_downloading only matches rows still `pending`; a
    // complete row must not be re-promoted.
    assert!(!ledger.promote_to_downloading(&item.id).await.unwrap());
    let row = ledger.get(&item.id).await.unwrap().unwrap();
    assert_eq!(row.status, Status::Complete);
}

#[tokio::test]
async fn p4_reset_downloading_recovers_interrupted_jobs() {
    let (_dir, ledger) = open_temp().await;
    let item = sample_item("ffff0000eeee1111dddd2222cccc3333", "Interrupted");
    ledger.insert_pending(&item).await.unwrap();
    ledger.promote_to_downloading(&item.id).await.unwrap();

    let reset = ledger.reset_downloading_to_pending().await.unwrap();
    assert_eq!(reset, 1);
    let row = ledger.get(&item.id).await.unwrap().unwrap();
    assert_eq!(row.status, Status::Pending);
}

#[tokio::test]
async fn p8_list_complete_is_ordered() {
    let (_dir, ledger) = open_temp().await;
    let ids = [
        "0000000000000000000000000000000a",
        "0000000000000000000000000000000b",
        "0000000000000000000000000000000c",
    ];
    for (i, id) in ids.iter().enumerate() {
        let mut item = sample_item(&id[..32], &format!("Title {i}"));
        item.id = id[..32].to_string();
        ledger.insert_pending(&item).await.unwrap();
        ledger.promote_to_downloading(&item.id).await.unwrap();
    }

    // Complete out of insertion order, with distinct timestamps, so a
    // naive insertion-order listing would fail this assertion.
    ledger.mark_complete(&ids[1][..32], 100).await.unwrap();
    ledger.mark_complete(&ids[0][..32], 300).await.unwrap();
    ledger.mark_complete(&ids[2][..32], 200).await.unwrap();

    let rows = ledger.list_complete(None, &[]).await.unwrap();
    let titles: Vec<&str> = rows.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, vec!["Title 0", "Title 2", "Title 1"]);
}

#[tokio::test]
async fn list_complete_filters_by_title_substring_and_tags() {
    let (_dir, ledger) = open_temp().await;
    let mut a = sample_item("1111111111111111111111111111111a", "Morning Coffee Routine");
    let mut b = sample_item("2222222222222222222222222222222b", "Evening Walk");
    a.id.truncate(32);
    b.id.truncate(32);
    for item in [&a, &b] {
        ledger.insert_pending(item).await.unwrap();
        ledger.promote_to_downloading(&item.id).await.unwrap();
        ledger.mark_complete(&item.id, mediabin_ledger::now_ms()).await.unwrap();
    }
    ledger.add_tag(&a.id, "food").await.unwrap();
    ledger.add_tag(&b.id, "fitness").await.unwrap();

    let by_title = ledger.list_complete(Some("coffee"), &[]).await.unwrap();
    assert_eq!(by_title.len(), 1);
    assert_eq!(by_title[0].id, a.id);

    let by_tag = ledger.list_complete(None, &["fitness".to_string()]).await.unwrap();
    assert_eq!(by_tag.len(), 1);
    assert_eq!(by_tag[0].id, b.id);

    let by_both = ledger.list_complete(None, &["food".to_string(), "fitness".to_string()]).await.unwrap();
    assert!(by_both.is_empty(), "intersection of disjoint tags must be empty");
}

#[tokio::test]
async fn metadata_singleton_is_written_once() {
    let (_dir, ledger) = open_temp().await;
    let first = ledger.ensure_metadata("/data/one").await.unwrap();
    assert_eq!(first.datadir_location, "/data/one");

    // A second call with a different default must not overwrite it.
    let second = ledger.ensure_metadata("/data/two").await.unwrap();
    assert_eq!(second.datadir_location, "/data/one");
}
