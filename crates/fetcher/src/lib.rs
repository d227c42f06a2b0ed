// SPDX-License-Identifier: MIT

//! The fetcher adapter (spec §4.6): a contract with an external media
//! extractor, not a wrapper specification. `ProcessFetcher` is a concrete
//! default implementation that spawns a `yt-dlp`-class binary, grounded on
//! the process-spawning/line-pump shape used by comparable ecosystem
//! downloader wrappers. Anything implementing `Fetcher` can stand in for
//! it — the scheduler (`mediabin-daemon`) only ever depends on the trait.

mod error;
mod process;

#[cfg(feature = "test-support")]
pub mod testing;

pub use error::FetcherError;
pub use process::ProcessFetcher;

use async_trait::async_trait;
use mediabin_core::{FetchStatus, VideoInfo};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

/// One `(info, status)` event delivered from the fetcher's background
/// work to the scheduler. Delivered via a channel rather than invoked as a
/// callback from fetcher-owned threads (spec §9's "callback-from-unknown-
/// thread" redesign flag), so the scheduler never has to take its own
/// locks from a thread it doesn't control.
pub type StatusSender = UnboundedSender<(VideoInfo, FetchStatus)>;

/// A download in flight. `cancel()` is cooperative: it sets a flag the
/// fetcher checks between progress updates (spec §5, "Cancellation &
/// timeouts"). The fetcher guarantees no terminal event is sent after
/// cancellation is observed.
pub struct JobHandle {
    cancel_flag: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl JobHandle {
    pub fn new(cancel_flag: Arc<AtomicBool>, task: JoinHandle<()>) -> Self {
        Self { cancel_flag, task }
    }

    pub fn cancel(&self) {
        self.cancel_flag.store(true, Ordering::SeqCst);
    }

    pub async fn join(self) {
        let _ = self.task.await;
    }
}

/// A shared, checkable cancellation flag, threaded into the fetcher's
/// background task so it can poll it between progress updates.
#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.0)
    }
}

#[async_trait]
pub trait Fetcher: Send + Sync + 'static {
    /// Blocking metadata probe without downloading bytes (spec §4.6).
    /// Returns `None` when the source yields no usable metadata.
    async fn fetch_info(&self, url: &str) -> Result<Option<VideoInfo>, FetcherError>;

    /// Begin a background download into `<datadir>/<object_path>/`,
    /// streaming status events onto `status_tx`: any number of rate-
    /// limited `Downloading` events, then exactly one terminal event,
    /// unless cancelled first.
    fn start(&self, info: VideoInfo, datadir: PathBuf, status_tx: StatusSender) -> JobHandle;
}
