// SPDX-License-Identifier: MIT

//! P2 / scenario 3: with `max_concurrent_downloads = 1`, enqueuing three
//! URLs promotes exactly one to `downloading` at a time; the rest stay
//! `pending` until the in-flight job reports `Finished`.

use std::sync::Arc;
use std::time::Duration;

use crate::prelude::*;
use mediabin_fetcher::testing::{NullFetcher, Script};

#[tokio::test]
async fn at_most_one_job_is_downloading_at_a_time() {
    let (_dir, ledger) = fresh_ledger().await;
    // Long enough that the test can observe the in-flight state before it
    // finishes, short enough the test stays fast.
    let fetcher: Arc<dyn mediabin_fetcher::Fetcher> =
        Arc::new(NullFetcher::new(Script::Succeeds { ticks: 5 }).with_tick_interval(Duration::from_millis(30)));
    let (scheduler, rx) = scheduler_with(ledger.clone(), fetcher, 1);
    let scheduler_task = tokio::spawn(Arc::clone(&scheduler).run(rx));

    for n in 0..3 {
        scheduler.enqueue(&format!("https://example.test/bound{n}")).await.expect("enqueue");
    }

    // Give the scheduler a few wakeups to promote as many rows as the
    // bound allows.
    tokio::time::sleep(Duration::from_millis(100)).await;

    let downloading = ledger.list_downloading().await.expect("list downloading");
    assert_eq!(downloading.len(), 1, "at most one row may be downloading at a time");
    assert_eq!(scheduler.in_flight_count(), 1);

    let pending = ledger.list_pending().await.expect("list pending");
    assert_eq!(pending.len(), 2);

    // Let the in-flight job finish and the next one get promoted.
    tokio::time::sleep(Duration::from_millis(300)).await;
    let downloading = ledger.list_downloading().await.expect("list downloading");
    assert!(downloading.len() <= 1);

    scheduler.stop();
    scheduler_task.abort();
}
