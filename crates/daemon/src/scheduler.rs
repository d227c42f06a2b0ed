// SPDX-License-Identifier: MIT

//! The download scheduler (spec §4.7): bounded-concurrency worker that
//! drains the pending queue, tracks in-flight jobs, and applies ledger
//! status transitions. Grounded on the teacher's queue-drain/worker-wake
//! shape (`oj-daemon::listener::queues::workers`) adapted to a single
//! fetcher-backed job type instead of an external worker pool, with
//! status delivered over an `mpsc` channel rather than a direct callback
//! (spec §9's "callback-from-unknown-thread" redesign flag) so the
//! scheduler never takes its own locks from a thread it doesn't control.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{mpsc, Notify, OwnedSemaphorePermit, Semaphore};
use tokio::time::{timeout, Duration};
use tracing::{info, warn};

use mediabin_core::{FetchStatus, MediaItem, Status, VideoInfo};
use mediabin_fetcher::{Fetcher, JobHandle};
use mediabin_ledger::Ledger;

use crate::error::DaemonError;

const POLL_INTERVAL: Duration = Duration::from_secs(1);

struct Job {
    handle: JobHandle,
    // Released when the job's entry is dropped, freeing a slot for
    // `try_promote_one`'s fast-path check. The ledger + in-memory map
    // stay the authoritative bound (invariant 2); this permit is purely
    // an efficiency gate so a burst of wakeups doesn't all fall through
    // to a ledger round-trip once the bound is already saturated.
    _permit: OwnedSemaphorePermit,
}

/// A snapshot row for `ps` (spec §4.7 `list_current_procs`): either an
/// in-flight job's latest status, or a still-pending row not yet
/// promoted.
#[derive(Debug, Clone)]
pub struct ProcRow {
    pub id: String,
    pub title: String,
    pub status: FetchStatus,
}

pub struct Scheduler {
    ledger: Ledger,
    fetcher: Arc<dyn Fetcher>,
    datadir: PathBuf,
    // Fixed lock order everywhere in this module: downloads before
    // statuses (spec §5, "Shared resources").
    current_downloads: Mutex<HashMap<String, Job>>,
    current_statuses: Mutex<HashMap<String, FetchStatus>>,
    enqueue: Notify,
    stopping: AtomicBool,
    status_tx: mpsc::UnboundedSender<(VideoInfo, FetchStatus)>,
    // Fast-path concurrency gate (SPEC_FULL §5.7), grounded on LocalTube's
    // `CONCURRENCY_SEMAPHORE`; not the source of truth for the bound.
    slots: Arc<Semaphore>,
}

impl Scheduler {
    pub fn new(
        ledger: Ledger,
        fetcher: Arc<dyn Fetcher>,
        datadir: PathBuf,
        max_concurrent: usize,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<(VideoInfo, FetchStatus)>) {
        let (status_tx, status_rx) = mpsc::unbounded_channel();
        let scheduler = Arc::new(Self {
            ledger,
            fetcher,
            datadir,
            current_downloads: Mutex::new(HashMap::new()),
            current_statuses: Mutex::new(HashMap::new()),
            slots: Arc::new(Semaphore::new(max_concurrent)),
            enqueue: Notify::new(),
            stopping: AtomicBool::new(false),
            status_tx,
        });
        (scheduler, status_rx)
    }

    /// Recover jobs interrupted by a previous crash (spec P4, invariant
    /// 5). Must run before the scheduling loop starts.
    pub async fn recover(&self) -> Result<u64, DaemonError> {
        let reset = self.ledger.reset_downloading_to_pending().await?;
        if reset > 0 {
            info!(count = reset, "reset interrupted downloads back to pending");
        }
        Ok(reset)
    }

    /// Probe metadata and insert a pending row (spec §4.7, "Enqueue
    /// path"). Returns the id either way; `Err(Duplicate)` means the row
    /// already existed and no new row was created (spec §7:
    /// `DuplicateItem` is reported as info, not a hard error).
    pub async fn enqueue(&self, url: &str) -> Result<String, DaemonError> {
        let info = self
            .fetcher
            .fetch_info(url)
            .await?
            .ok_or_else(|| DaemonError::NotFound(url.to_string()))?;

        let item = MediaItem {
            id: info.id.clone(),
            title: info.title.clone(),
            origin_url: info.origin_url.clone(),
            video_url: info.video_url.clone(),
            thumbnail_url: info.thumbnail_url.clone(),
            timestamp_created: mediabin_ledger::now_ms(),
            timestamp_installed: None,
            timestamp_updated: None,
            object_path: info.object_path.clone(),
            status: Status::Pending,
        };

        match self.ledger.insert_pending(&item).await {
            Ok(()) => {
                self.enqueue.notify_one();
                Ok(item.id)
            }
            Err(mediabin_ledger::LedgerError::Duplicate(id)) => Err(DaemonError::Duplicate(id)),
            Err(e) => Err(e.into()),
        }
    }

    /// The scheduling loop (spec §4.7, "Scheduling loop"): wakes on
    /// enqueue or a 1-second timeout, promotes at most one pending row
    /// per wakeup while under the concurrency bound.
    pub async fn run(self: Arc<Self>, mut status_rx: mpsc::UnboundedReceiver<(VideoInfo, FetchStatus)>) {
        loop {
            if self.stopping.load(Ordering::SeqCst) {
                break;
            }
            tokio::select! {
                _ = timeout(POLL_INTERVAL, self.enqueue.notified()) => {
                    if let Err(e) = self.try_promote_one().await {
                        warn!(error = %e, "failed to promote pending download");
                    }
                }
                Some((info, status)) = status_rx.recv() => {
                    self.handle_status(info, status).await;
                }
            }
        }
    }

    async fn try_promote_one(&self) -> Result<(), DaemonError> {
        let Ok(permit) = Arc::clone(&self.slots).try_acquire_owned() else {
            return Ok(());
        };

        let Some((id, origin_url)) = self.ledger.next_pending().await? else {
            return Ok(());
        };

        let row = match self.ledger.get(&id).await? {
            Some(row) => row,
            None => return Ok(()),
        };

        if !self.ledger.promote_to_downloading(&id).await? {
            // Another path already promoted it between next_pending and here.
            return Ok(());
        }

        let info = VideoInfo {
            id: row.id.clone(),
            object_path: row.object_path.clone(),
            title: row.title.clone(),
            origin_url,
            video_url: row.video_url.clone(),
            thumbnail_url: row.thumbnail_url.clone(),
            timestamp: row.timestamp_created,
        };

        let handle = self.fetcher.start(info, self.datadir.clone(), self.status_tx.clone());

        {
            let mut downloads = self.current_downloads.lock();
            downloads.insert(id.clone(), Job { handle, _permit: permit });
            let mut statuses = self.current_statuses.lock();
            statuses.insert(id, FetchStatus::Pending);
        }

        Ok(())
    }

    async fn handle_status(&self, info: VideoInfo, status: FetchStatus) {
        let is_terminal = status.is_terminal();
        if !is_terminal {
            let mut statuses = self.current_statuses.lock();
            statuses.insert(info.id.clone(), status);
            return;
        }

        match &status {
            FetchStatus::Finished { .. } => {
                if let Err(e) = self.ledger.mark_complete(&info.id, mediabin_ledger::now_ms()).await {
                    warn!(id = %info.id, error = %e, "failed to mark download complete");
                }
            }
            FetchStatus::Error { message, .. } => {
                warn!(id = %info.id, message = %message, "download failed");
                if let Err(e) = self.ledger.mark_error(&info.id).await {
                    warn!(id = %info.id, error = %e, "failed to mark download error");
                }
            }
            FetchStatus::Pending | FetchStatus::Downloading { .. } => {}
        }

        // Terminal status is written to the ledger above before the job
        // is removed from the in-flight maps (spec §4.7, invariant 4).
        let mut downloads = self.current_downloads.lock();
        downloads.remove(&info.id);
        let mut statuses = self.current_statuses.lock();
        statuses.remove(&info.id);
    }

    /// `list_current_procs` (spec §4.7): a snapshot of in-flight jobs
    /// joined against ledger titles, plus rows still `pending`.
    pub async fn list_current_procs(&self) -> Result<Vec<ProcRow>, DaemonError> {
        let snapshot: Vec<(String, FetchStatus)> = {
            let statuses = self.current_statuses.lock();
            statuses.iter().map(|(id, status)| (id.clone(), status.clone())).collect()
        };

        let mut rows = Vec::with_capacity(snapshot.len());
        for (id, status) in snapshot {
            let title = match self.ledger.get(&id).await? {
                Some(item) => item.title,
                None => continue,
            };
            rows.push(ProcRow { id, title, status });
        }

        for item in self.ledger.list_pending().await? {
            rows.push(ProcRow { id: item.id, title: item.title, status: FetchStatus::Pending });
        }

        Ok(rows)
    }

    /// Request cancellation of every in-flight job and stop the loop
    /// (spec §4.7, "Shutdown"). Any `downloading` rows left in the
    /// ledger are recovered by `recover()` at next startup.
    pub fn stop(&self) {
        self.stopping.store(true, Ordering::SeqCst);
        let downloads = self.current_downloads.lock();
        for job in downloads.values() {
            job.handle.cancel();
        }
        self.enqueue.notify_one();
    }

    pub fn in_flight_count(&self) -> usize {
        self.current_downloads.lock().len()
    }
}
