//! Chunked storage writes with resume support.
//!
//! Each upload owns one storage target, a plain file named after the
//! upload id. Chunks arrive as byte streams: [`drain_chunk`] collects a
//! chunk and verifies its size against the client-declared length, then
//! [`ChunkWriter::write_at`] writes it at its offset.

mod chunked;
mod validation;

pub use chunked::{ChunkReader, ChunkWriter, FileChunk, drain_chunk};
pub use validation::validate_upload_id;

use std::io;
use std::pin::Pin;

use futures_util::Stream;

/// Default chunk size used by clients: 4 MiB.
pub const DEFAULT_CHUNK_SIZE: usize = 4 * 1024 * 1024;

/// A lazy, finite, non-restartable sequence of chunk bytes.
pub type ChunkStream = Pin<Box<dyn Stream<Item = io::Result<Vec<u8>>> + Send>>;

/// Wraps an in-memory buffer as a single-part chunk stream.
pub fn stream_from_bytes(data: impl Into<Vec<u8>>) -> ChunkStream {
    let data = data.into();
    Box::pin(futures_util::stream::once(async move { Ok(data) }))
}

/// Wraps several buffers as a multi-part chunk stream.
pub fn stream_from_parts(parts: Vec<Vec<u8>>) -> ChunkStream {
    Box::pin(futures_util::stream::iter(parts.into_iter().map(Ok)))
}

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The chunk body did not match its declared length. `actual` counts the
    /// bytes seen before the stream ended or overran the declared length.
    #[error("chunk size mismatch: declared {declared} bytes, received {actual}")]
    SizeMismatch { declared: u64, actual: u64 },

    #[error("chunk stream failed: {0}")]
    Stream(io::Error),

    #[error("storage target already exists: {0}")]
    TargetExists(String),

    #[error("storage target missing: {0}")]
    TargetMissing(String),

    #[error("invalid upload id: {0}")]
    InvalidId(String),
}
