// SPDX-License-Identifier: MIT

//! A deterministic `Fetcher` test double. No process is spawned and no
//! network access occurs; metadata and progress sequences are fabricated
//! from the input URL alone, so the same URL always produces the same
//! address, title, and progress trace. Used by the scheduler's unit and
//! property tests (spec §9, P2/P3/P4) where exercising a real extractor
//! binary would be both slow and non-deterministic.

use std::path::PathBuf;

use async_trait::async_trait;
use mediabin_core::{ContentAddress, FetchStatus, VideoInfo};
use tokio::time::{sleep, Duration};

use crate::{CancelToken, Fetcher, FetcherError, JobHandle, StatusSender};

/// Controls how many `Downloading` ticks a `NullFetcher` job emits before
/// its terminal event, and what that terminal event is.
#[derive(Debug, Clone)]
pub enum Script {
    /// Emit `ticks` progress events at even intervals, then `Finished`.
    Succeeds { ticks: u32 },
    /// Emit `ticks` progress events, then `Error`.
    Fails { ticks: u32, message: String },
    /// Never emit a terminal event; used to exercise cancellation.
    Hangs,
}

impl Default for Script {
    fn default() -> Self {
        Script::Succeeds { ticks: 3 }
    }
}

#[derive(Clone, Default)]
pub struct NullFetcher {
    script: Script,
    tick_interval: Duration,
}

impl NullFetcher {
    pub fn new(script: Script) -> Self {
        Self { script, tick_interval: Duration::from_millis(1) }
    }

    /// Override the inter-tick delay; tests that assert on timing use this
    /// to slow a `Hangs` job down enough to cancel it mid-flight.
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }
}

#[async_trait]
impl Fetcher for NullFetcher {
    async fn fetch_info(&self, url: &str) -> Result<Option<VideoInfo>, FetcherError> {
        if url.is_empty() {
            return Ok(None);
        }
        let address = ContentAddress::new("null", url);
        Ok(Some(VideoInfo {
            id: address.id().to_string(),
            object_path: address.object_path().to_string_lossy().into_owned(),
            title: format!("Fixture for {url}"),
            origin_url: url.to_string(),
            video_url: url.to_string(),
            thumbnail_url: String::new(),
            timestamp: 0,
        }))
    }

    fn start(&self, info: VideoInfo, _datadir: PathBuf, status_tx: StatusSender) -> JobHandle {
        let script = self.script.clone();
        let interval = self.tick_interval;
        let cancel = CancelToken::new();
        let cancel_flag = cancel.flag();

        let task = tokio::spawn(async move {
            let (ticks, terminal) = match script {
                Script::Succeeds { ticks } => (ticks, Some(FetchStatus::Finished { filepath: format!("/tmp/null/{}", info.id) })),
                Script::Fails { ticks, message } => (ticks, Some(FetchStatus::Error { message, details: None })),
                Script::Hangs => (u32::MAX, None),
            };

            for i in 0..ticks {
                if cancel.is_cancelled() {
                    return;
                }
                let progress = FetchStatus::Downloading {
                    progress: (i as f32 + 1.0) / ticks.max(1) as f32 * 100.0,
                    bytes: (i as u64 + 1) * 1024,
                    speed: Some(1024),
                    eta: Some((ticks - i) as u64),
                };
                if status_tx.send((info.clone(), progress)).is_err() {
                    return;
                }
                sleep(interval).await;
            }

            if cancel.is_cancelled() {
                return;
            }
            if let Some(terminal) = terminal {
                let _ = status_tx.send((info, terminal));
            }
        });

        JobHandle::new(cancel_flag, task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn fetch_info_is_deterministic_for_same_url() {
        let fetcher = NullFetcher::default();
        let a = fetcher.fetch_info("https://example.test/a").await.unwrap().unwrap();
        let b = fetcher.fetch_info("https://example.test/a").await.unwrap().unwrap();
        assert_eq!(a.id, b.id);
        assert_eq!(a.object_path, b.object_path);
    }

    #[tokio::test]
    async fn succeeds_script_emits_exactly_one_terminal_event() {
        let fetcher = NullFetcher::new(Script::Succeeds { ticks: 3 });
        let info = fetcher.fetch_info("https://example.test/b").await.unwrap().unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = fetcher.start(info, PathBuf::from("/tmp"), tx);
        handle.join().await;

        let mut terminal_count = 0;
        while let Ok((_, status)) = rx.try_recv() {
            if status.is_terminal() {
                terminal_count += 1;
            }
        }
        assert_eq!(terminal_count, 1);
    }

    #[tokio::test]
    async fn cancel_suppresses_terminal_event() {
        let fetcher = NullFetcher::new(Script::Hangs).with_tick_interval(Duration::from_millis(20));
        let info = fetcher.fetch_info("https://example.test/c").await.unwrap().unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = fetcher.start(info, PathBuf::from("/tmp"), tx);

        sleep(Duration::from_millis(30)).await;
        handle.cancel();
        handle.join().await;

        while let Ok((_, status)) = rx.try_recv() {
            assert!(!status.is_terminal(), "cancelled job must not emit a terminal event");
        }
    }
}
