use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info, warn};
use tusk_protocol::constants::{METADATA_FILENAME, METADATA_FINGERPRINT, MISSING_FILENAME};
use tusk_protocol::{Capabilities, Page, UploadRecord, parse_metadata};
use tusk_store::UploadStore;
use tusk_transfer::{ChunkStream, ChunkWriter, drain_chunk, validate_upload_id};

use crate::config::EngineConfig;
use crate::error::UploadError;
use crate::locks::{UploadGuard, UploadLocks};

/// Orchestrates upload sessions over a record store and a chunk writer.
pub struct UploadManager {
    store: Arc<dyn UploadStore>,
    writer: ChunkWriter,
    config: EngineConfig,
    locks: UploadLocks,
}

impl UploadManager {
    pub fn new(store: Arc<dyn UploadStore>, writer: ChunkWriter, config: EngineConfig) -> Self {
        Self {
            store,
            writer,
            config,
            locks: UploadLocks::new(),
        }
    }

    pub fn writer(&self) -> &ChunkWriter {
        &self.writer
    }

    /// Starts a new upload session.
    ///
    /// The record is persisted first, then its storage target is created.
    /// If the target cannot be created the record is deleted again so no
    /// session exists without bytes to write into.
    pub async fn create_upload(
        &self,
        mime_type: &str,
        declared_length: u64,
        metadata: Option<&str>,
    ) -> Result<UploadRecord, UploadError> {
        let metadata = parse_metadata(metadata).inspect_err(|e| {
            warn!("rejecting upload with bad metadata: {e}");
        })?;

        match self.config.max_upload_size {
            Some(max) if declared_length > max => {
                warn!(declared_length, max, "rejecting upload over size limit");
                return Err(UploadError::TooLarge {
                    declared: declared_length,
                    max,
                });
            }
            _ => {}
        }

        let original_name = metadata
            .get(METADATA_FILENAME)
            .cloned()
            .unwrap_or_else(|| MISSING_FILENAME.to_string());
        let record = UploadRecord::new(
            uuid::Uuid::new_v4().to_string(),
            mime_type,
            declared_length,
            original_name,
            metadata.get(METADATA_FINGERPRINT).cloned(),
        );

        let record = self.store.create(record).await.inspect_err(|e| {
            error!("failed to persist new upload record: {e}");
        })?;

        if let Err(e) = self.writer.create_target(&record.id).await {
            error!(upload_id = %record.id, "storage target creation failed: {e}");
            match self.store.delete(&record.id).await {
                Ok(_) => debug!(upload_id = %record.id, "orphaned record removed"),
                Err(del) => {
                    error!(upload_id = %record.id, "could not remove orphaned record: {del}");
                }
            }
            return Err(e.into());
        }

        info!(
            upload_id = %record.id,
            name = %record.original_name,
            length = record.content_length,
            "upload created"
        );
        Ok(record)
    }

    /// Applies one chunk and returns the updated record.
    ///
    /// Chunks for the same upload are applied one at a time. The offset
    /// must equal the current `content_offset`, the body must match
    /// `declared_length`, and the verified chunk may not run past the
    /// upload's length. On any failure the record is unchanged.
    pub async fn apply_chunk(
        &self,
        id: &str,
        stream: ChunkStream,
        offset: u64,
        declared_length: u64,
    ) -> Result<UploadRecord, UploadError> {
        if validate_upload_id(id).is_err() {
            return Err(UploadError::NotFound(id.to_string()));
        }

        let _guard: UploadGuard = self.locks.acquire(id).await;

        let mut record = self
            .store
            .find_by_id(id)
            .await?
            .ok_or_else(|| UploadError::NotFound(id.to_string()))?;

        if offset != record.content_offset {
            warn!(
                upload_id = %id,
                expected = record.content_offset,
                offset,
                "chunk offset mismatch"
            );
            return Err(UploadError::OffsetMismatch {
                expected: record.content_offset,
                actual: offset,
            });
        }

        let written = self
            .write(id, stream, offset, declared_length, record.content_length)
            .await?;

        record.content_offset += written;
        record.last_chunk_number += 1;
        record.updated_at = Utc::now();

        // Bytes past the stored offset are overwritten by the next chunk, so
        // a failed save here is repaired when the client resends.
        let record = self.store.save(record).await.inspect_err(|e| {
            error!(upload_id = %id, offset, bytes = written, "chunk written but record not saved: {e}");
        })?;

        debug!(
            upload_id = %id,
            offset = record.content_offset,
            remaining = record.remaining(),
            chunk = record.last_chunk_number,
            "chunk applied"
        );
        if record.is_complete() {
            info!(upload_id = %id, length = record.content_length, "upload complete");
        }
        Ok(record)
    }

    /// Drains and verifies the chunk, checks it fits inside `length`, then
    /// writes it. The chunk timeout covers all three steps.
    async fn write(
        &self,
        id: &str,
        stream: ChunkStream,
        offset: u64,
        declared_length: u64,
        length: u64,
    ) -> Result<u64, UploadError> {
        let work = async {
            let data = drain_chunk(stream, declared_length).await?;

            let end = offset.saturating_add(data.len() as u64);
            if end > length {
                return Err(UploadError::ExceedsLength { end, length });
            }

            Ok::<u64, UploadError>(self.writer.write_at(id, &data, offset).await?)
        };

        let result = match self.config.chunk_timeout {
            Some(limit) => match tokio::time::timeout(limit, work).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(upload_id = %id, ?limit, "chunk timed out");
                    return Err(UploadError::Timeout(limit));
                }
            },
            None => work.await,
        };

        result.inspect_err(|err| match err {
            UploadError::Storage(_) => error!(upload_id = %id, offset, "chunk write failed: {err}"),
            _ => warn!(upload_id = %id, offset, "chunk rejected: {err}"),
        })
    }

    /// Current state of an upload, used by clients to find the resume point.
    pub async fn status_of(&self, id: &str) -> Result<Option<UploadRecord>, UploadError> {
        if validate_upload_id(id).is_err() {
            return Ok(None);
        }
        Ok(self.store.find_by_id(id).await?)
    }

    /// One page of uploads in creation order. A `page_size` of 0 uses the
    /// configured default.
    pub async fn list_uploads(
        &self,
        page: usize,
        page_size: usize,
    ) -> Result<Page<UploadRecord>, UploadError> {
        let page_size = if page_size == 0 {
            self.config.page_size
        } else {
            page_size
        };
        Ok(self.store.find_page(page, page_size).await?)
    }

    /// Static capability descriptor (OPTIONS).
    pub fn capabilities(&self) -> Capabilities {
        Capabilities::new(self.config.max_upload_size)
    }

    /// Number of uploads with a chunk currently in flight or queued.
    pub fn active_uploads(&self) -> usize {
        self.locks.active()
    }
}
