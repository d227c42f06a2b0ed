// SPDX-License-Identifier: MIT

//! Per-connection dispatch (spec §4.3): reads `Call` frames off one
//! connection in order, runs each under the output router, and writes
//! back `Result`/`ErrorResult`. Grounded on the teacher's
//! `listener::handle_connection` shape (split reader/writer halves,
//! `tokio::spawn` per accepted connection) generalized from the
//! teacher's single-request-then-close connections to the spec's
//! "a connection may carry multiple sequential calls" requirement.

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use mediabin_wire::{read_frame, write_frame, ArgValue, Frame, ProtocolError};

use crate::registry::{Args, CommandRegistry};
use crate::output::Output;

/// Handle one client connection to completion: read frames, dispatch
/// each `Call`, stream the handler's chunks, and write the terminator.
/// Returns when the client disconnects or sends a frame that isn't a
/// valid `Call` (spec §4.1: unknown tags close the connection; here any
/// non-`Call` first frame is the same kind of protocol violation).
pub async fn handle_connection<R, W>(mut reader: R, writer: W, registry: Arc<CommandRegistry>)
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (frame_tx, mut frame_rx) = mpsc::unbounded_channel::<Frame>();
    let writer_task = tokio::spawn(async move {
        let mut writer = writer;
        while let Some(frame) = frame_rx.recv().await {
            if let Err(e) = write_frame(&mut writer, &frame).await {
                warn!(error = %e, "failed to write frame to client");
                break;
            }
        }
    });

    loop {
        let frame = match read_frame(&mut reader).await {
            Ok(Some(frame)) => frame,
            Ok(None) => break,
            Err(ProtocolError::ConnectionClosed) => break,
            Err(e) => {
                warn!(error = %e, "protocol error reading frame, closing connection");
                break;
            }
        };

        let Frame::Call { name, args, kwargs, stdout_is_tty, stderr_is_tty } = frame else {
            warn!("expected a Call frame to start a request, closing connection");
            break;
        };

        let result_frame = dispatch_call(&registry, name, args, kwargs, stdout_is_tty, stderr_is_tty, frame_tx.clone()).await;
        if frame_tx.send(result_frame).is_err() {
            break;
        }
    }

    drop(frame_tx);
    let _ = writer_task.await;
}

async fn dispatch_call(
    registry: &CommandRegistry,
    name: String,
    positional: Vec<ArgValue>,
    keyword: std::collections::HashMap<String, ArgValue>,
    stdout_is_tty: bool,
    stderr_is_tty: bool,
    frame_tx: mpsc::UnboundedSender<Frame>,
) -> Frame {
    let Some(handler) = registry.get(&name) else {
        debug!(command = %name, "unknown command");
        return Frame::ErrorResult {
            message: format!("unknown command {name:?}"),
            kind: mediabin_core::ErrorKind::ProtocolError,
        };
    };

    let output = Output::new(frame_tx, stdout_is_tty, stderr_is_tty);
    let args = Args { positional, keyword };

    match output.scope(handler.call(args)).await {
        Ok(value) => Frame::Result { value },
        Err(e) => Frame::ErrorResult { message: e.to_string(), kind: e.kind() },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediabin_wire::Frame as WireFrame;
    use tokio::io::duplex;

    #[tokio::test]
    async fn streams_chunks_before_terminator() {
        let mut registry = CommandRegistry::new();
        registry
            .register("greet", |_args: Args| async move {
                crate::output::stdout("hello");
                crate::output::stdout("world");
                Ok(serde_json::json!({"ok": true}))
            })
            .unwrap();

        let (client, server) = duplex(4096);
        let (server_read, server_write) = tokio::io::split(server);
        let registry = Arc::new(registry);
        tokio::spawn(handle_connection(server_read, server_write, registry));

        let (mut client_read, mut client_write) = tokio::io::split(client);
        let call = WireFrame::call("greet", vec![], std::collections::HashMap::new(), false, false);
        write_frame(&mut client_write, &call).await.unwrap();

        let first = read_frame(&mut client_read).await.unwrap().unwrap();
        let second = read_frame(&mut client_read).await.unwrap().unwrap();
        let terminator = read_frame(&mut client_read).await.unwrap().unwrap();

        assert_eq!(first, WireFrame::stdout("hello"));
        assert_eq!(second, WireFrame::stdout("world"));
        assert!(terminator.is_terminal());
    }

    #[tokio::test]
    async fn unknown_command_returns_error_result() {
        let registry = Arc::new(CommandRegistry::new());
        let (client, server) = duplex(4096);
        let (server_read, server_write) = tokio::io::split(server);
        tokio::spawn(handle_connection(server_read, server_write, registry));

        let (mut client_read, mut client_write) = tokio::io::split(client);
        let call = WireFrame::call("nonexistent", vec![], std::collections::HashMap::new(), false, false);
        write_frame(&mut client_write, &call).await.unwrap();

        let response = read_frame(&mut client_read).await.unwrap().unwrap();
        assert!(matches!(response, WireFrame::ErrorResult { .. }));
    }
}
