// SPDX-License-Identifier: MIT

//! Length-prefixed object framing over a stream socket (spec §4.1).
//!
//! Each message is an 8-byte big-endian unsigned length followed by
//! exactly that many bytes of a JSON-serialized `Frame`. The reader reads
//! the full length prefix before allocating the payload buffer, then reads
//! the payload to completion; end-of-stream before completion is
//! `ProtocolError::ConnectionClosed`. The writer sends length and payload
//! as a single logical write via `write_all` on a pre-built buffer, so two
//! concurrent writers on the same connection can never interleave bytes
//! of two frames (the caller must still serialize writes with a lock —
//! see `mediabin-daemon`'s per-connection write half).

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::frame::Frame;

/// Frames larger than this are refused outright rather than allocated,
/// bounding a single frame's memory footprint (ambient hardening, not a
/// spec invariant: the spec only requires reading the full prefix before
/// allocating).
pub const MAX_FRAME_LEN: u64 = 256 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("connection closed before a full frame was read")]
    ConnectionClosed,
    #[error("frame of {0} bytes exceeds the {MAX_FRAME_LEN} byte limit")]
    FrameTooLarge(u64),
    #[error("malformed frame payload: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Read one length-prefixed frame. Returns `Ok(None)` only when the stream
/// is cleanly closed with zero bytes read for a new frame (the caller's
/// natural end-of-connection); any partial read is `ConnectionClosed`.
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Option<Frame>, ProtocolError> {
    let mut len_buf = [0u8; 8];
    match read_exact_or_eof(reader, &mut len_buf).await? {
        ReadOutcome::Eof => return Ok(None),
        ReadOutcome::Partial => return Err(ProtocolError::ConnectionClosed),
        ReadOutcome::Full => {}
    }
    let len = u64::from_be_bytes(len_buf);
    if len > MAX_FRAME_LEN {
        return Err(ProtocolError::FrameTooLarge(len));
    }
    let mut payload = vec![0u8; len as usize];
    reader.read_exact(&mut payload).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            ProtocolError::ConnectionClosed
        } else {
            ProtocolError::Io(e)
        }
    })?;
    let frame: Frame = serde_json::from_slice(&payload)?;
    Ok(Some(frame))
}

/// Serialize and write one frame as a single logical write (one
/// `write_all` call over a buffer holding the length prefix and payload
/// back to back).
pub async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, frame: &Frame) -> Result<(), ProtocolError> {
    let payload = serde_json::to_vec(frame)?;
    let mut buf = Vec::with_capacity(8 + payload.len());
    buf.extend_from_slice(&(payload.len() as u64).to_be_bytes());
    buf.extend_from_slice(&payload);
    writer.write_all(&buf).await?;
    writer.flush().await?;
    Ok(())
}

enum ReadOutcome {
    Full,
    Partial,
    Eof,
}

/// Like `read_exact`, but distinguishes "zero bytes read, clean EOF" from
/// "some bytes read, then EOF" (a torn length prefix), which the spec
/// requires treating as `ConnectionClosed` rather than silently returning
/// `None`.
async fn read_exact_or_eof<R: AsyncRead + Unpin>(
    reader: &mut R,
    buf: &mut [u8],
) -> Result<ReadOutcome, ProtocolError> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            return Ok(if filled == 0 { ReadOutcome::Eof } else { ReadOutcome::Partial });
        }
        filled += n;
    }
    Ok(ReadOutcome::Full)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::ArgValue;
    use std::collections::HashMap;

    #[tokio::test]
    async fn roundtrip_call_frame() {
        let frame = Frame::call(
            "i",
            vec![ArgValue::from("https://example.test/v1")],
            HashMap::new(),
            true,
            false,
        );
        let mut buf = Vec::new();
        write_frame(&mut buf, &frame).await.unwrap();
        assert_eq!(buf.len(), 8 + buf[8..].len());
        let len = u64::from_be_bytes(buf[0..8].try_into().unwrap());
        assert_eq!(len as usize, buf.len() - 8);

        let mut cursor = std::io::Cursor::new(buf);
        let read_back = read_frame(&mut cursor).await.unwrap().unwrap();
        assert_eq!(read_back, frame);
    }

    #[tokio::test]
    async fn clean_eof_between_frames_is_none() {
        let mut cursor = std::io::Cursor::new(Vec::<u8>::new());
        assert!(matches!(read_frame(&mut cursor).await, Ok(None)));
    }

    #[tokio::test]
    async fn torn_length_prefix_is_connection_closed() {
        let mut cursor = std::io::Cursor::new(vec![0u8, 0, 0]);
        assert!(matches!(read_frame(&mut cursor).await, Err(ProtocolError::ConnectionClosed)));
    }

    #[tokio::test]
    async fn truncated_payload_is_connection_closed() {
        let frame = Frame::stdout("hello");
        let mut buf = Vec::new();
        write_frame(&mut buf, &frame).await.unwrap();
        buf.truncate(buf.len() - 2);
        let mut cursor = std::io::Cursor::new(buf);
        assert!(matches!(read_frame(&mut cursor).await, Err(ProtocolError::ConnectionClosed)));
    }

    #[tokio::test]
    async fn oversized_length_prefix_is_rejected_before_allocating() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&(MAX_FRAME_LEN + 1).to_be_bytes());
        let mut cursor = std::io::Cursor::new(buf);
        assert!(matches!(read_frame(&mut cursor).await, Err(ProtocolError::FrameTooLarge(_))));
    }

    #[tokio::test]
    async fn unknown_tag_is_decode_error() {
        let payload = br#"{"type":"NotARealFrame"}"#;
        let mut buf = Vec::new();
        buf.extend_from_slice(&(payload.len() as u64).to_be_bytes());
        buf.extend_from_slice(payload);
        let mut cursor = std::io::Cursor::new(buf);
        assert!(matches!(read_frame(&mut cursor).await, Err(ProtocolError::Decode(_))));
    }
}
