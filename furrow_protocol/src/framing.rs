// Newline-delimited message framing over TCP.
//
// The simulation server speaks a line protocol: each request and each
// response is exactly one UTF-8 JSON object followed by `\n`. No length
// prefixes, no compression, no multiplexing. This module provides the three
// pieces the client needs:
//
// - `write_frame`: payload bytes plus a single `\n` terminator, flushed.
// - `FrameDecoder`: a stateful splitter that retains any unterminated tail
//   across reads, so a frame may arrive in one chunk, split across several
//   chunks, or packed many-per-chunk.
// - `FrameReader`: pulls a `Read` stream through a `FrameDecoder` until one
//   complete frame is available.
//
// The caller handles JSON serialization separately — this module is
// format-agnostic apart from the newline terminator.
//
// `MAX_FRAME_SIZE` (1 MB) protects against unbounded buffering when a peer
// never sends a terminator. Tick results with full weather payloads are the
// largest expected frames; 1 MB is generous headroom.

use std::io::{self, Read, Write};

/// Maximum allowed frame size (1 MB). Protects against unbounded buffering
/// from a peer that never terminates a line.
pub const MAX_FRAME_SIZE: usize = 1024 * 1024;

/// Write a newline-terminated frame: payload bytes, then `\n`, then flush.
///
/// Rejects payloads that contain a raw `\n` (they would split into two
/// frames on the wire) or exceed `MAX_FRAME_SIZE`.
pub fn write_frame<W: Write>(writer: &mut W, payload: &[u8]) -> io::Result<()> {
    if payload.len() > MAX_FRAME_SIZE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("frame too large: {} bytes (max {MAX_FRAME_SIZE})", payload.len()),
        ));
    }
    if payload.contains(&b'\n') {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "frame payload contains a raw newline",
        ));
    }
    writer.write_all(payload)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// Stateful newline splitter. Bytes pushed in are buffered until a `\n`
/// completes a frame; anything after the terminator is retained as the
/// start of the next frame.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buf: Vec<u8>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append raw bytes from a read.
    pub fn push(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Pop the next complete frame (without its terminator), if one is
    /// buffered. The remainder stays buffered for subsequent calls.
    pub fn next_frame(&mut self) -> Option<Vec<u8>> {
        let pos = self.buf.iter().position(|&b| b == b'\n')?;
        let mut frame: Vec<u8> = self.buf.drain(..=pos).collect();
        frame.pop(); // drop the terminator
        Some(frame)
    }

    /// Number of buffered bytes not yet part of a completed frame.
    pub fn buffered_len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

/// A `Read` stream pulled through a `FrameDecoder`.
pub struct FrameReader<R: Read> {
    inner: R,
    decoder: FrameDecoder,
}

impl<R: Read> FrameReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            decoder: FrameDecoder::new(),
        }
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Read until one complete frame is available.
    ///
    /// Returns `Ok(None)` when the stream closes cleanly between frames.
    /// Returns `UnexpectedEof` when it closes mid-frame, and `InvalidData`
    /// when a frame exceeds `MAX_FRAME_SIZE`. Read timeouts surface as the
    /// underlying I/O error.
    pub fn read_frame(&mut self) -> io::Result<Option<Vec<u8>>> {
        loop {
            if let Some(frame) = self.decoder.next_frame() {
                return Ok(Some(frame));
            }
            if self.decoder.buffered_len() > MAX_FRAME_SIZE {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!(
                        "unterminated frame exceeds {MAX_FRAME_SIZE} bytes"
                    ),
                ));
            }
            let mut chunk = [0u8; 8192];
            let n = self.inner.read(&mut chunk)?;
            if n == 0 {
                if self.decoder.is_empty() {
                    return Ok(None);
                }
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "stream closed mid-frame",
                ));
            }
            self.decoder.push(&chunk[..n]);
        }
    }
}
