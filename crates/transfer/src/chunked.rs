use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use tracing::debug;

use crate::{ChunkStream, DEFAULT_CHUNK_SIZE, TransferError};

/// Upper bound for the buffer reserved up front from a declared length.
///
/// The declared length comes from the client; larger chunks still work,
/// the buffer just grows as bytes actually arrive.
const MAX_PREALLOC: usize = 8 * 1024 * 1024;

// ---------------------------------------------------------------------------
// ChunkWriter
// ---------------------------------------------------------------------------

/// Writes upload chunks into per-upload storage targets at exact offsets.
///
/// The writer holds no per-upload state: callers are responsible for
/// serializing writes to the same target.
#[derive(Debug, Clone)]
pub struct ChunkWriter {
    base_path: PathBuf,
}

impl ChunkWriter {
    /// Creates a writer storing targets directly under `base_path`.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Resolves the storage target for `id`, rejecting ids that are not
    /// plain file names.
    pub fn target_path(&self, id: &str) -> Result<PathBuf, TransferError> {
        crate::validate_upload_id(id)?;
        Ok(self.base_path.join(id))
    }

    /// Creates the empty storage target for `id`.
    ///
    /// Fails with [`TransferError::TargetExists`] when the target is
    /// already present; the caller decides whether that matters.
    pub async fn create_target(&self, id: &str) -> Result<(), TransferError> {
        let path = self.target_path(id)?;
        let file = match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(TransferError::TargetExists(id.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        file.sync_all().await?;

        debug!(upload_id = %id, path = %path.display(), "storage target created");
        Ok(())
    }

    /// Writes an already verified chunk at `offset` and returns the number
    /// of bytes written.
    ///
    /// The target must already exist; it is never created here. Data is
    /// synced to disk before returning.
    pub async fn write_at(&self, id: &str, data: &[u8], offset: u64) -> Result<u64, TransferError> {
        let path = self.target_path(id)?;

        let mut file = match tokio::fs::OpenOptions::new().write(true).open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(TransferError::TargetMissing(id.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        file.seek(std::io::SeekFrom::Start(offset)).await?;
        file.write_all(data).await?;
        file.flush().await?;
        file.sync_data().await?;

        let written = data.len() as u64;
        debug!(upload_id = %id, offset, bytes = written, "chunk written");
        Ok(written)
    }

    /// Returns the current size of the storage target in bytes.
    pub async fn target_len(&self, id: &str) -> Result<u64, TransferError> {
        let path = self.target_path(id)?;
        match tokio::fs::metadata(&path).await {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(TransferError::TargetMissing(id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Collects a chunk body and verifies it against its declared length.
///
/// Fails with [`TransferError::SizeMismatch`] as soon as the stream overruns
/// `declared`, or at the end when it came up short. Stream item errors
/// surface as [`TransferError::Stream`]. Nothing touches storage here.
pub async fn drain_chunk(mut stream: ChunkStream, declared: u64) -> Result<Vec<u8>, TransferError> {
    let reserve = usize::try_from(declared)
        .unwrap_or(usize::MAX)
        .min(MAX_PREALLOC);
    let mut buf = Vec::with_capacity(reserve);
    let mut actual: u64 = 0;

    while let Some(part) = stream.next().await {
        let part = part.map_err(TransferError::Stream)?;
        actual += part.len() as u64;
        if actual > declared {
            return Err(TransferError::SizeMismatch { declared, actual });
        }
        buf.extend_from_slice(&part);
    }

    if actual != declared {
        return Err(TransferError::SizeMismatch { declared, actual });
    }
    Ok(buf)
}

// ---------------------------------------------------------------------------
// ChunkReader
// ---------------------------------------------------------------------------

/// A chunk of a local file, read for sending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChunk {
    /// Byte offset within the file.
    pub offset: u64,
    pub data: Vec<u8>,
}

/// Reads a local file in fixed-size chunks (client side).
pub struct ChunkReader {
    file: std::fs::File,
    chunk_size: usize,
    offset: u64,
    file_size: u64,
}

impl ChunkReader {
    /// Opens `path` for chunked reading.
    ///
    /// If `chunk_size` is 0, [`DEFAULT_CHUNK_SIZE`] is used.
    pub fn new(path: &Path, chunk_size: usize) -> Result<Self, TransferError> {
        let file = std::fs::File::open(path)?;
        let file_size = file.metadata()?.len();
        let chunk_size = if chunk_size == 0 {
            DEFAULT_CHUNK_SIZE
        } else {
            chunk_size
        };
        Ok(Self {
            file,
            chunk_size,
            offset: 0,
            file_size,
        })
    }

    /// Seeks to the given byte offset (for resume).
    pub fn seek_to(&mut self, offset: u64) -> Result<(), TransferError> {
        self.file.seek(SeekFrom::Start(offset))?;
        self.offset = offset;
        Ok(())
    }

    /// Reads the next chunk. Returns `None` at EOF.
    pub fn next_chunk(&mut self) -> Result<Option<FileChunk>, TransferError> {
        let remaining = self.remaining();
        if remaining == 0 {
            return Ok(None);
        }

        let read_size = remaining.min(self.chunk_size as u64) as usize;
        let mut buf = vec![0u8; read_size];
        let n = self.file.read(&mut buf)?;
        if n == 0 {
            return Ok(None);
        }
        buf.truncate(n);

        let chunk = FileChunk {
            offset: self.offset,
            data: buf,
        };
        self.offset += n as u64;
        Ok(Some(chunk))
    }

    /// Current byte offset.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Total file size in bytes.
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Bytes remaining to read.
    pub fn remaining(&self) -> u64 {
        self.file_size.saturating_sub(self.offset)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::{stream_from_bytes, stream_from_parts};
    use tempfile::TempDir;

    fn create_test_file(dir: &Path, name: &str, data: &[u8]) -> PathBuf {
        let path = dir.join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(data).unwrap();
        path
    }

    async fn write_chunk(
        writer: &ChunkWriter,
        id: &str,
        stream: ChunkStream,
        offset: u64,
        declared: u64,
    ) -> Result<u64, TransferError> {
        let data = drain_chunk(stream, declared).await?;
        writer.write_at(id, &data, offset).await
    }

    fn failing_stream() -> ChunkStream {
        Box::pin(futures_util::stream::iter(vec![
            Ok(b"abc".to_vec()),
            Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "client went away",
            )),
        ]))
    }

    #[tokio::test]
    async fn create_target_makes_empty_file() {
        let dir = TempDir::new().unwrap();
        let writer = ChunkWriter::new(dir.path());

        writer.create_target("u1").await.unwrap();
        assert_eq!(writer.target_len("u1").await.unwrap(), 0);
        assert!(dir.path().join("u1").exists());
    }

    #[tokio::test]
    async fn create_target_twice_fails() {
        let dir = TempDir::new().unwrap();
        let writer = ChunkWriter::new(dir.path());

        writer.create_target("u1").await.unwrap();
        let err = writer.create_target("u1").await.unwrap_err();
        assert!(matches!(err, TransferError::TargetExists(id) if id == "u1"));
    }

    #[tokio::test]
    async fn create_target_in_missing_directory_fails() {
        let dir = TempDir::new().unwrap();
        let writer = ChunkWriter::new(dir.path().join("does-not-exist"));

        let err = writer.create_target("u1").await.unwrap_err();
        assert!(matches!(err, TransferError::Io(_)));
    }

    #[tokio::test]
    async fn writes_chunks_at_offsets() {
        let dir = TempDir::new().unwrap();
        let writer = ChunkWriter::new(dir.path());
        writer.create_target("u1").await.unwrap();

        let n = write_chunk(&writer, "u1", stream_from_bytes(b"foo".to_vec()), 0, 3)
            .await
            .unwrap();
        assert_eq!(n, 3);

        let n = write_chunk(&writer, "u1", stream_from_parts(vec![b"b".to_vec(), b"az".to_vec()]), 3, 3)
            .await
            .unwrap();
        assert_eq!(n, 3);

        let content = std::fs::read(dir.path().join("u1")).unwrap();
        assert_eq!(&content, b"foobaz");
    }

    #[tokio::test]
    async fn short_body_rejected_without_writing() {
        let dir = TempDir::new().unwrap();
        let writer = ChunkWriter::new(dir.path());
        writer.create_target("u1").await.unwrap();
        write_chunk(&writer, "u1", stream_from_bytes(b"foo".to_vec()), 0, 3)
            .await
            .unwrap();

        let err = write_chunk(&writer, "u1", stream_from_bytes(b"bazbar".to_vec()), 3, 7)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TransferError::SizeMismatch {
                declared: 7,
                actual: 6
            }
        ));

        let content = std::fs::read(dir.path().join("u1")).unwrap();
        assert_eq!(&content, b"foo");
    }

    #[tokio::test]
    async fn long_body_rejected_without_writing() {
        let dir = TempDir::new().unwrap();
        let writer = ChunkWriter::new(dir.path());
        writer.create_target("u1").await.unwrap();

        let err = write_chunk(
            &writer,
            "u1",
            stream_from_parts(vec![b"ab".to_vec(), b"cd".to_vec(), b"ef".to_vec()]),
            0,
            3,
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            TransferError::SizeMismatch {
                declared: 3,
                actual: 4
            }
        ));
        assert_eq!(writer.target_len("u1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn stream_error_leaves_target_untouched() {
        let dir = TempDir::new().unwrap();
        let writer = ChunkWriter::new(dir.path());
        writer.create_target("u1").await.unwrap();

        let err = write_chunk(&writer, "u1", failing_stream(), 0, 6)
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::Stream(_)));
        assert_eq!(writer.target_len("u1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn missing_target_is_not_created() {
        let dir = TempDir::new().unwrap();
        let writer = ChunkWriter::new(dir.path());

        let err = write_chunk(&writer, "ghost", stream_from_bytes(b"abc".to_vec()), 0, 3)
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::TargetMissing(id) if id == "ghost"));
        assert!(!dir.path().join("ghost").exists());
    }

    #[tokio::test]
    async fn rewriting_an_offset_does_not_touch_other_bytes() {
        let dir = TempDir::new().unwrap();
        let writer = ChunkWriter::new(dir.path());
        writer.create_target("u1").await.unwrap();

        write_chunk(&writer, "u1", stream_from_bytes(b"foobaz".to_vec()), 0, 6)
            .await
            .unwrap();
        write_chunk(&writer, "u1", stream_from_bytes(b"BA".to_vec()), 3, 2)
            .await
            .unwrap();

        let content = std::fs::read(dir.path().join("u1")).unwrap();
        assert_eq!(&content, b"fooBAz");
    }

    #[tokio::test]
    async fn empty_chunk_is_accepted() {
        let dir = TempDir::new().unwrap();
        let writer = ChunkWriter::new(dir.path());
        writer.create_target("u1").await.unwrap();

        let n = write_chunk(&writer, "u1", stream_from_parts(Vec::new()), 0, 0)
            .await
            .unwrap();
        assert_eq!(n, 0);
    }

    #[tokio::test]
    async fn traversal_ids_rejected() {
        let dir = TempDir::new().unwrap();
        let writer = ChunkWriter::new(dir.path());

        let err = writer.create_target("../escape").await.unwrap_err();
        assert!(matches!(err, TransferError::InvalidId(_)));

        let err = write_chunk(&writer, "a/b", stream_from_bytes(b"x".to_vec()), 0, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::InvalidId(_)));
    }

    #[test]
    fn chunk_reader_reads_all() {
        let dir = TempDir::new().unwrap();
        let path = create_test_file(dir.path(), "test.bin", b"AABBCCDDEE");

        let mut reader = ChunkReader::new(&path, 4).unwrap();
        assert_eq!(reader.file_size(), 10);
        assert_eq!(reader.remaining(), 10);

        let c1 = reader.next_chunk().unwrap().unwrap();
        assert_eq!(c1.offset, 0);
        assert_eq!(&c1.data, b"AABB");
        assert_eq!(reader.remaining(), 6);

        let c2 = reader.next_chunk().unwrap().unwrap();
        assert_eq!(c2.offset, 4);
        assert_eq!(&c2.data, b"CCDD");

        let c3 = reader.next_chunk().unwrap().unwrap();
        assert_eq!(c3.offset, 8);
        assert_eq!(&c3.data, b"EE");

        assert!(reader.next_chunk().unwrap().is_none());
    }

    #[test]
    fn chunk_reader_seek_and_resume() {
        let dir = TempDir::new().unwrap();
        let path = create_test_file(dir.path(), "test.bin", b"0123456789");

        let mut reader = ChunkReader::new(&path, 4).unwrap();
        reader.seek_to(6).unwrap();
        assert_eq!(reader.offset(), 6);
        assert_eq!(reader.remaining(), 4);

        let c = reader.next_chunk().unwrap().unwrap();
        assert_eq!(c.offset, 6);
        assert_eq!(&c.data, b"6789");

        assert!(reader.next_chunk().unwrap().is_none());
    }

    #[tokio::test]
    async fn reader_writer_roundtrip() {
        let dir = TempDir::new().unwrap();
        let original = b"The quick brown fox jumps over the lazy dog";
        let src = create_test_file(dir.path(), "src.txt", original);

        let store_dir = dir.path().join("store");
        std::fs::create_dir_all(&store_dir).unwrap();
        let writer = ChunkWriter::new(&store_dir);
        writer.create_target("u1").await.unwrap();

        let mut reader = ChunkReader::new(&src, 10).unwrap();
        while let Some(chunk) = reader.next_chunk().unwrap() {
            let len = chunk.data.len() as u64;
            write_chunk(&writer, "u1", stream_from_bytes(chunk.data), chunk.offset, len)
                .await
                .unwrap();
        }

        let result = std::fs::read(store_dir.join("u1")).unwrap();
        assert_eq!(&result, original);
    }
}
