// SPDX-License-Identifier: MIT

//! P4 / scenario 5: a row left `downloading` by a crashed daemon goes
//! back to `pending` on the next `recover()`, and the fresh scheduler
//! starts with no orphaned in-memory job entries.

use crate::prelude::*;
use mediabin_core::Status;
use mediabin_fetcher::testing::Script;

#[tokio::test]
async fn interrupted_downloads_are_reset_to_pending_on_recover() {
    let (_dir, ledger) = fresh_ledger().await;
    let fetcher = null_fetcher(Script::Succeeds { ticks: 1 });
    let (scheduler, _rx) = scheduler_with(ledger.clone(), fetcher, 4);

    let id = scheduler.enqueue("https://example.test/crash").await.expect("enqueue");
    assert!(ledger.promote_to_downloading(&id).await.expect("promote"));

    let row = ledger.get(&id).await.expect("get").expect("row exists");
    assert_eq!(row.status, Status::Downloading);

    // Simulate a restart: a brand new scheduler over the same ledger file,
    // as the daemon binary would construct at startup.
    let fresh_fetcher = null_fetcher(Script::Succeeds { ticks: 1 });
    let (fresh_scheduler, _rx2) = scheduler_with(ledger.clone(), fresh_fetcher, 4);
    let reset_count = fresh_scheduler.recover().await.expect("recover");
    assert_eq!(reset_count, 1);

    let row = ledger.get(&id).await.expect("get").expect("row exists");
    assert_eq!(row.status, Status::Pending);
    assert_eq!(fresh_scheduler.in_flight_count(), 0, "recovery must not fabricate in-memory job entries");
}
