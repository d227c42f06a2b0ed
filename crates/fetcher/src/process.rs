// SPDX-License-Identifier: MIT

//! A `Fetcher` that spawns an external `yt-dlp`-class extractor binary,
//! probes metadata via `--dump-json`, and pumps its download stdout for
//! progress lines. Grounded on the process-spawn/line-pump shape used by
//! ecosystem wrappers around the same binary (`Command::new(...).stdout
//! (Stdio::piped())`, `BufReader::lines()`, `tokio::select!` over stdout
//! and stderr) rather than on any particular crate's API.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use mediabin_core::{ContentAddress, FetchStatus, VideoInfo};
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::{CancelToken, Fetcher, FetcherError, JobHandle, StatusSender};

const PROGRESS_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Deserialize)]
struct RawMetadata {
    id: String,
    #[serde(default, alias = "extractor_key")]
    extractor: String,
    #[serde(default)]
    title: String,
    #[serde(default, alias = "webpage_url")]
    origin_url: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    thumbnail: String,
    #[serde(default)]
    timestamp: Option<i64>,
}

/// Spawns `binary_path` (default `yt-dlp` resolved on `$PATH`) as a child
/// process for both metadata probing and downloading.
#[derive(Clone)]
pub struct ProcessFetcher {
    binary_path: PathBuf,
}

impl Default for ProcessFetcher {
    fn default() -> Self {
        Self { binary_path: PathBuf::from("yt-dlp") }
    }
}

impl ProcessFetcher {
    pub fn new(binary_path: impl Into<PathBuf>) -> Self {
        Self { binary_path: binary_path.into() }
    }
}

#[async_trait]
impl Fetcher for ProcessFetcher {
    async fn fetch_info(&self, url: &str) -> Result<Option<VideoInfo>, FetcherError> {
        let output = Command::new(&self.binary_path)
            .arg("--dump-json")
            .arg("--no-playlist")
            .arg("--simulate")
            .arg(url)
            .stdin(Stdio::null())
            .output()
            .await?;

        if !output.status.success() || output.stdout.is_empty() {
            return Ok(None);
        }

        let first_line = output
            .stdout
            .split(|b| *b == b'\n')
            .find(|line| !line.is_empty())
            .unwrap_or(&output.stdout[..]);
        let raw: RawMetadata = serde_json::from_slice(first_line)?;

        let address = ContentAddress::new(&raw.extractor, &raw.id);
        Ok(Some(VideoInfo {
            id: address.id().to_string(),
            object_path: address.object_path().to_string_lossy().into_owned(),
            title: raw.title,
            origin_url: if raw.origin_url.is_empty() { url.to_string() } else { raw.origin_url },
            video_url: raw.url,
            thumbnail_url: raw.thumbnail,
            timestamp: raw.timestamp.unwrap_or_default(),
        }))
    }

    fn start(&self, info: VideoInfo, datadir: PathBuf, status_tx: StatusSender) -> JobHandle {
        let binary_path = self.binary_path.clone();
        let cancel = CancelToken::new();
        let cancel_flag = cancel.flag();

        let task = tokio::spawn(async move {
            run_download(binary_path, info, datadir, status_tx, cancel).await;
        });

        JobHandle::new(cancel_flag, task)
    }
}

async fn run_download(
    binary_path: PathBuf,
    info: VideoInfo,
    datadir: PathBuf,
    status_tx: StatusSender,
    cancel: CancelToken,
) {
    let target_dir = datadir.join(&info.object_path);
    if let Err(e) = tokio::fs::create_dir_all(&target_dir).await {
        let _ = status_tx.send((
            info.clone(),
            FetchStatus::Error { message: "could not create artifact directory".into(), details: Some(e.to_string()) },
        ));
        return;
    }
    let output_template = target_dir.join("video.%(ext)s");

    let mut child = match Command::new(&binary_path)
        .arg("--newline")
        .arg("--write-thumbnail")
        .arg("--write-info-json")
        .arg("-o")
        .arg(&output_template)
        .arg(&info.origin_url)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
    {
        Ok(child) => child,
        Err(e) => {
            let _ = status_tx.send((info, FetchStatus::Error { message: "failed to spawn extractor".into(), details: Some(e.to_string()) }));
            return;
        }
    };

    let Some(stdout) = child.stdout.take() else {
        let _ = status_tx.send((info, FetchStatus::Error { message: "extractor process had no stdout pipe".into(), details: None }));
        return;
    };
    let Some(stderr) = child.stderr.take() else {
        let _ = status_tx.send((info, FetchStatus::Error { message: "extractor process had no stderr pipe".into(), details: None }));
        return;
    };
    let mut stdout_lines = BufReader::new(stdout).lines();
    let mut stderr_lines = BufReader::new(stderr).lines();
    let mut last_emit = Instant::now() - PROGRESS_INTERVAL;
    let mut stdout_done = false;
    let mut stderr_done = false;

    while !stdout_done || !stderr_done {
        if cancel.is_cancelled() {
            let _ = child.start_kill();
            return;
        }
        tokio::select! {
            line = stdout_lines.next_line(), if !stdout_done => {
                match line {
                    Ok(Some(line)) => {
                        if let Some(progress) = parse_progress_line(&line) {
                            if last_emit.elapsed() >= PROGRESS_INTERVAL {
                                last_emit = Instant::now();
                                if status_tx.send((info.clone(), progress)).is_err() {
                                    let _ = child.start_kill();
                                    return;
                                }
                            }
                        }
                    }
                    Ok(None) => stdout_done = true,
                    Err(e) => {
                        warn!(error = %e, "failed to read extractor stdout");
                        stdout_done = true;
                    }
                }
            }
            line = stderr_lines.next_line(), if !stderr_done => {
                match line {
                    Ok(Some(line)) => debug!(extractor_stderr = %line),
                    Ok(None) => stderr_done = true,
                    Err(e) => {
                        warn!(error = %e, "failed to read extractor stderr");
                        stderr_done = true;
                    }
                }
            }
        }
    }

    let status = child.wait().await;
    if cancel.is_cancelled() {
        // Spec §4.6: the adapter MUST NOT emit a terminal event after
        // cancel is requested, even if the child happened to finish.
        return;
    }

    match status {
        Ok(exit) if exit.success() => {
            let filepath = target_dir.join("video.mp4").to_string_lossy().into_owned();
            let _ = status_tx.send((info, FetchStatus::Finished { filepath }));
        }
        Ok(exit) => {
            let _ = status_tx.send((
                info,
                FetchStatus::Error { message: "extractor exited non-zero".into(), details: Some(exit.to_string()) },
            ));
        }
        Err(e) => {
            let _ = status_tx.send((info, FetchStatus::Error { message: "failed to wait on extractor".into(), details: Some(e.to_string()) }));
        }
    }
}

/// Parse a `[download]  42.0% of 10.00MiB at 1.00MiB/s ETA 00:05` style
/// line into a `Downloading` status. Returns `None` for any other line
/// (including the final "has already been downloaded" / merge lines).
fn parse_progress_line(line: &str) -> Option<FetchStatus> {
    let line = line.trim();
    if !line.starts_with("[download]") {
        return None;
    }
    let rest = line.trim_start_matches("[download]").trim();
    let percent_str = rest.split('%').next()?.trim();
    let progress: f32 = percent_str.parse().ok()?;

    let bytes = rest
        .split("of ")
        .nth(1)
        .and_then(|s| s.split_whitespace().next())
        .and_then(parse_size)
        .unwrap_or(0);

    let speed = rest
        .split("at ")
        .nth(1)
        .and_then(|s| s.split_whitespace().next())
        .and_then(|s| parse_size(s.trim_end_matches("/s")));

    let eta = rest.split("ETA ").nth(1).and_then(|s| parse_eta(s.trim()));

    Some(FetchStatus::Downloading { progress, bytes, speed, eta })
}

fn parse_size(s: &str) -> Option<u64> {
    let s = s.trim();
    let (num_part, unit) = s.split_at(s.find(|c: char| c.is_alphabetic()).unwrap_or(s.len()));
    let value: f64 = num_part.parse().ok()?;
    let multiplier: f64 = match unit.to_ascii_uppercase().as_str() {
        "B" | "" => 1.0,
        "KIB" => 1024.0,
        "MIB" => 1024.0 * 1024.0,
        "GIB" => 1024.0 * 1024.0 * 1024.0,
        _ => return None,
    };
    Some((value * multiplier) as u64)
}

fn parse_eta(s: &str) -> Option<u64> {
    let parts: Vec<&str> = s.split(':').collect();
    let mut seconds: u64 = 0;
    for part in parts {
        seconds = seconds * 60 + part.parse::<u64>().ok()?;
    }
    Some(seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_download_progress_line() {
        let line = "[download]  42.0% of 10.00MiB at 1.00MiB/s ETA 00:05";
        let status = parse_progress_line(line).unwrap();
        match status {
            FetchStatus::Downloading { progress, bytes, speed, eta } => {
                assert!((progress - 42.0).abs() < f32::EPSILON);
                assert_eq!(bytes, 10 * 1024 * 1024);
                assert_eq!(speed, Some(1024 * 1024));
                assert_eq!(eta, Some(5));
            }
            other => panic!("unexpected status: {other:?}"),
        }
    }

    #[test]
    fn ignores_non_progress_lines() {
        assert!(parse_progress_line("[info] Writing video metadata as JSON").is_none());
        assert!(parse_progress_line("[download] 100% of 10.00MiB in 00:02").is_some());
    }

    #[test]
    fn parses_multi_minute_eta() {
        assert_eq!(parse_eta("01:02:03"), Some(3723));
    }
}
