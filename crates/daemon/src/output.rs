// SPDX-License-Identifier: MIT

//! Output router (spec §4.2): forwards handler-scoped writes to the
//! client that issued the call, as `StdoutChunk`/`StderrChunk` frames,
//! flushed immediately. Writes that happen outside any handler (daemon
//! housekeeping, the scheduler, fetcher background work) are not routed
//! here at all — they go through `tracing` straight to the log file,
//! matching the teacher's split between a per-connection capability and
//! process-wide structured logging.
//!
//! The per-handler association is a `tokio::task_local!`, scoped to the
//! handler's own task via `Output::scope`, so a handler never needs to be
//! passed a connection handle explicitly and there is no global map to
//! leak entries from on an error path — the task-local is torn down when
//! `scope`'s future completes, success or not.

use tokio::sync::mpsc::UnboundedSender;

use mediabin_wire::Frame;

/// What a handler sees of the calling client: a sink for chunks, plus the
/// two tty hints carried on the `Call` frame (spec §4.2).
#[derive(Clone)]
pub struct Output {
    tx: UnboundedSender<Frame>,
    pub stdout_is_tty: bool,
    pub stderr_is_tty: bool,
}

tokio::task_local! {
    static CURRENT: Output;
}

impl Output {
    pub fn new(tx: UnboundedSender<Frame>, stdout_is_tty: bool, stderr_is_tty: bool) -> Self {
        Self { tx, stdout_is_tty, stderr_is_tty }
    }

    pub fn stdout(&self, text: impl Into<String>) {
        let _ = self.tx.send(Frame::stdout(text));
    }

    pub fn stderr(&self, text: impl Into<String>) {
        let _ = self.tx.send(Frame::stderr(text));
    }

    /// Run `fut` with `self` as the task-local current output; handler
    /// code calls `stdout`/`stderr` below to reach it without threading
    /// it through every function signature.
    pub async fn scope<F, T>(self, fut: F) -> T
    where
        F: std::future::Future<Output = T>,
    {
        CURRENT.scope(self, fut).await
    }
}

/// Write a line to the current handler's client, or to the log if called
/// outside a handler scope (spec §4.2: "Outside any handler ... writes
/// are appended to the daemon log file").
pub fn stdout(text: impl Into<String>) {
    let text = text.into();
    if CURRENT.try_with(|out| out.stdout(text.clone())).is_err() {
        tracing::info!(target: "mediabin::stdout", "{text}");
    }
}

pub fn stderr(text: impl Into<String>) {
    let text = text.into();
    if CURRENT.try_with(|out| out.stderr(text.clone())).is_err() {
        tracing::warn!(target: "mediabin::stderr", "{text}");
    }
}

pub fn stdout_is_tty() -> bool {
    CURRENT.try_with(|out| out.stdout_is_tty).unwrap_or(false)
}

pub fn stderr_is_tty() -> bool {
    CURRENT.try_with(|out| out.stderr_is_tty).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn writes_inside_scope_are_routed_to_the_client() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let out = Output::new(tx, true, false);
        out.scope(async {
            stdout("line one");
            stderr("line two");
        })
        .await;

        assert_eq!(rx.try_recv().unwrap(), Frame::stdout("line one"));
        assert_eq!(rx.try_recv().unwrap(), Frame::stderr("line two"));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn writes_outside_scope_do_not_panic() {
        stdout("no active connection");
        assert!(!stdout_is_tty());
    }
}
