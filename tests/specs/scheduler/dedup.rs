// SPDX-License-Identifier: MIT

//! P1: repeated enqueue of the same URL yields exactly one row.

use crate::prelude::*;
use mediabin_daemon::DaemonError;
use mediabin_fetcher::testing::Script;

#[tokio::test]
async fn repeated_enqueue_of_same_url_yields_one_row() {
    let (_dir, ledger) = fresh_ledger().await;
    let fetcher = null_fetcher(Script::Succeeds { ticks: 1 });
    let (scheduler, _rx) = scheduler_with(ledger.clone(), fetcher, 4);

    let url = "https://example.test/v1";
    let first = scheduler.enqueue(url).await.expect("first enqueue succeeds");

    let second = scheduler.enqueue(url).await;
    assert!(matches!(second, Err(DaemonError::Duplicate(id)) if id == first));

    let pending = ledger.list_pending().await.expect("list pending");
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, first);
}
