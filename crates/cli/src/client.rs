// SPDX-License-Identifier: MIT

//! The IPC client: connects to the daemon's Unix socket, sends one
//! `Call` frame, and streams back `StdoutChunk`/`StderrChunk` frames to
//! the local terminal as they arrive, returning the `Result`/
//! `ErrorResult` value as the call's outcome (spec §4.1, §4.3).
//!
//! Grounded conceptually on the teacher's `client_queries*` modules
//! (one query function per remote concept, each opening its own
//! connection) even though the teacher's actual connection-management
//! file was not present in the retrieved pack; `connect_or_start` is
//! authored directly from spec §4.3's detach contract ("the parent call
//! returns the child pid synchronously") plus a bounded connect-retry
//! loop, the common idiom for "start a daemon if it isn't already up".

use std::collections::HashMap;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::time::Duration;

use tokio::net::UnixStream;

use mediabin_core::ErrorKind;
use mediabin_daemon::config::Paths;
use mediabin_wire::{read_frame, write_frame, ArgValue, Frame, ProtocolError};

use crate::exit_error::ExitError;

const CONNECT_RETRY_ATTEMPTS: u32 = 20;
const CONNECT_RETRY_INTERVAL: Duration = Duration::from_millis(100);

pub struct Client {
    stream: UnixStream,
}

impl Client {
    /// Connect, spawning the daemon binary first if the socket isn't
    /// live (the implicit-start path any remote subcommand takes).
    pub async fn connect_or_start(mediabind_path: &PathBuf, ledger_path: Option<PathBuf>) -> Result<Self, ExitError> {
        let paths = Paths::resolve().map_err(|e| ExitError::unreachable(e.to_string()))?;
        if let Ok(stream) = UnixStream::connect(&paths.socket_path).await {
            return Ok(Self { stream });
        }

        let mut command = tokio::process::Command::new(mediabind_path);
        if let Some(path) = &ledger_path {
            command.arg("--ledger-path").arg(path);
        }
        command.spawn().map_err(|e| ExitError::unreachable(format!("failed to spawn mediabind: {e}")))?;

        for _ in 0..CONNECT_RETRY_ATTEMPTS {
            tokio::time::sleep(CONNECT_RETRY_INTERVAL).await;
            if let Ok(stream) = UnixStream::connect(&paths.socket_path).await {
                return Ok(Self { stream });
            }
        }
        Err(ExitError::unreachable("daemon did not become reachable after starting"))
    }

    /// Send one call and stream the result; `StdoutChunk`/`StderrChunk`
    /// frames are printed to the local terminal as they arrive, so a
    /// long-running handler's progress is visible in real time.
    pub async fn call(
        &mut self,
        name: &str,
        args: Vec<ArgValue>,
        kwargs: HashMap<String, ArgValue>,
    ) -> Result<serde_json::Value, ExitError> {
        let call = Frame::call(name, args, kwargs, std::io::stdout().is_terminal(), std::io::stderr().is_terminal());
        write_frame(&mut self.stream, &call).await.map_err(|e| ExitError::unreachable(e.to_string()))?;

        loop {
            match read_frame(&mut self.stream).await {
                Ok(Some(Frame::StdoutChunk { text })) => println!("{text}"),
                Ok(Some(Frame::StderrChunk { text })) => eprintln!("{text}"),
                Ok(Some(Frame::Result { value })) => return Ok(value),
                Ok(Some(Frame::ErrorResult { message, kind })) => return Err(map_error_kind(kind, message)),
                Ok(Some(Frame::Call { .. })) => {
                    return Err(ExitError::unreachable("daemon sent an unexpected Call frame"));
                }
                Ok(None) | Err(ProtocolError::ConnectionClosed) => {
                    return Err(ExitError::unreachable("daemon closed the connection mid-call"));
                }
                Err(e) => return Err(ExitError::unreachable(e.to_string())),
            }
        }
    }
}

fn map_error_kind(kind: ErrorKind, message: String) -> ExitError {
    match kind {
        ErrorKind::DaemonUnreachable | ErrorKind::AlreadyRunning => ExitError::unreachable(message),
        _ => ExitError::new(1, message),
    }
}
