#![warn(missing_docs)]
//! DuelBench IPC Protocol
//!
//! Line-oriented text protocol for controller-worker communication.
//! Every message is a single newline-terminated line, so any program that can
//! read stdin and write stdout can act as a worker.
//!
//! ```text
//! controller ── "ITERS 10\n" ──▶ worker
//! controller ◀── "OK\n"       ── worker
//! controller ── "QUIT\n"     ──▶ worker   (no reply)
//! ```

mod framing;
mod messages;

pub use framing::{FrameError, LineBuffer, LineChunk, LineReader, LineWriter};
pub use messages::{Command, ProtocolError, Response};

/// Bytes of unrecognized worker output tolerated while waiting for a
/// terminal marker. Past this the worker is considered runaway.
pub const MAX_UNMARKED_OUTPUT: usize = 10_000;

/// Read chunk size used by [`LineReader`]
pub const READ_CHUNK_SIZE: usize = 4096;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants() {
        assert_eq!(MAX_UNMARKED_OUTPUT, 10_000);
        assert!(READ_CHUNK_SIZE < MAX_UNMARKED_OUTPUT);
    }
}
