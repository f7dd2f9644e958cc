//! Newline Framing
//!
//! Provides reliable line boundaries over stream-based IPC (stdin/stdout).
//! A single read may surface several lines, or only part of one; the
//! persistent [`LineBuffer`] keeps the remainder until its newline arrives.

use crate::READ_CHUNK_SIZE;
use std::fmt::Display;
use std::io::{Read, Write};
use thiserror::Error;

/// Errors that can occur while moving lines over a stream
#[derive(Debug, Error)]
pub enum FrameError {
    /// Underlying read or write failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The peer closed its end
    #[error("End of stream")]
    EndOfStream,
}

/// Persistent receive buffer that yields only complete lines
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Append raw bytes as received
    pub fn extend(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
    }

    /// Remove and return every complete line currently buffered, without
    /// their terminators. Bytes after the last newline stay buffered.
    pub fn drain_lines(&mut self) -> Vec<String> {
        let Some(last_newline) = self.pending.iter().rposition(|&b| b == b'\n') else {
            return Vec::new();
        };

        let complete: Vec<u8> = self.pending.drain(..=last_newline).collect();
        complete[..complete.len() - 1]
            .split(|&b| b == b'\n')
            .map(|line| {
                let line = line.strip_suffix(b"\r").unwrap_or(line);
                String::from_utf8_lossy(line).into_owned()
            })
            .collect()
    }

    /// Number of bytes waiting for a newline
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Whether no partial line is buffered
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Lines surfaced by one read
#[derive(Debug, Default)]
pub struct LineChunk {
    /// Complete lines, in arrival order
    pub lines: Vec<String>,
    /// Raw bytes returned by the read
    pub bytes_read: usize,
}

/// Line reader over any byte stream
pub struct LineReader<R: Read> {
    reader: R,
    buffer: LineBuffer,
}

impl<R: Read> LineReader<R> {
    /// Create a new line reader
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: LineBuffer::new(),
        }
    }

    /// Block for one read and return every line it completed.
    ///
    /// Returns [`FrameError::EndOfStream`] once the writer has gone away.
    /// A partial line left at end of stream is discarded, never acted upon.
    pub fn read_chunk(&mut self) -> Result<LineChunk, FrameError> {
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        let bytes_read = loop {
            match self.reader.read(&mut chunk) {
                Ok(0) => return Err(FrameError::EndOfStream),
                Ok(n) => break n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(FrameError::Io(e)),
            }
        };

        self.buffer.extend(&chunk[..bytes_read]);
        Ok(LineChunk {
            lines: self.buffer.drain_lines(),
            bytes_read,
        })
    }

    /// Bytes received but not yet terminated by a newline
    pub fn pending_len(&self) -> usize {
        self.buffer.pending_len()
    }
}

/// Line writer that flushes after every message
pub struct LineWriter<W: Write> {
    writer: W,
}

impl<W: Write> LineWriter<W> {
    /// Create a new line writer
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Write one message followed by a newline, then flush so the peer sees
    /// it immediately.
    pub fn send<M: Display>(&mut self, message: &M) -> Result<(), FrameError> {
        writeln!(self.writer, "{}", message)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Consume and return the inner writer
    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Command, Response};
    use std::io::Cursor;

    #[test]
    fn test_drain_multiple_lines() {
        let mut buffer = LineBuffer::new();
        buffer.extend(b"ITERS 1\nITERS 2\nQU");

        assert_eq!(buffer.drain_lines(), vec!["ITERS 1", "ITERS 2"]);
        assert_eq!(buffer.pending_len(), 2);

        buffer.extend(b"IT\n");
        assert_eq!(buffer.drain_lines(), vec!["QUIT"]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_partial_line_is_held() {
        let mut buffer = LineBuffer::new();
        buffer.extend(b"ITERS 10");
        assert!(buffer.drain_lines().is_empty());
        assert_eq!(buffer.pending_len(), 8);
    }

    #[test]
    fn test_crlf_and_empty_lines() {
        let mut buffer = LineBuffer::new();
        buffer.extend(b"OK\r\n\nNOT OK\n");
        assert_eq!(buffer.drain_lines(), vec!["OK", "", "NOT OK"]);
    }

    #[test]
    fn test_reader_surfaces_all_buffered_lines() {
        let mut reader = LineReader::new(Cursor::new(b"banner\nOK\n".to_vec()));
        let chunk = reader.read_chunk().unwrap();
        assert_eq!(chunk.lines, vec!["banner", "OK"]);
        assert_eq!(chunk.bytes_read, 10);
        assert!(matches!(reader.read_chunk(), Err(FrameError::EndOfStream)));
    }

    #[test]
    fn test_writer_terminates_lines() {
        let mut writer = LineWriter::new(Vec::new());
        writer.send(&Command::Iters(3)).unwrap();
        writer.send(&Response::Value(0.5)).unwrap();
        assert_eq!(writer.into_inner(), b"ITERS 3\nVALUE 0.5\n");
    }
}
