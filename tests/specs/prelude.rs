// SPDX-License-Identifier: MIT

//! Shared fixtures for the workspace-level specs: a fresh on-disk ledger
//! and a scheduler wired to the deterministic `NullFetcher`, so scenarios
//! exercise the real scheduling/ledger code without spawning an external
//! extractor process.

use std::path::PathBuf;
use std::sync::Arc;

use mediabin_daemon::scheduler::Scheduler;
use mediabin_fetcher::testing::{NullFetcher, Script};
use mediabin_fetcher::Fetcher;
use mediabin_ledger::Ledger;

/// An open ledger backed by a file in a temp directory that outlives the
/// returned `Ledger` for the duration of the test.
pub async fn fresh_ledger() -> (tempfile::TempDir, Ledger) {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("ledger.db");
    let ledger = mediabin_ledger::open(&path).await.expect("open ledger");
    (dir, ledger)
}

/// A scheduler over `fetcher`, plus the channel its `run` loop consumes.
/// Callers are responsible for spawning `scheduler.clone().run(rx)` and
/// calling `scheduler.stop()` before the test ends.
pub fn scheduler_with(
    ledger: Ledger,
    fetcher: Arc<dyn Fetcher>,
    max_concurrent: usize,
) -> (Arc<Scheduler>, tokio::sync::mpsc::UnboundedReceiver<(mediabin_core::VideoInfo, mediabin_core::FetchStatus)>) {
    Scheduler::new(ledger, fetcher, PathBuf::from("/tmp/mediabin-specs"), max_concurrent)
}

pub fn null_fetcher(script: Script) -> Arc<dyn Fetcher> {
    Arc::new(NullFetcher::new(script))
}
