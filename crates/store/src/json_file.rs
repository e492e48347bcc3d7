//! Record store keeping one pretty-printed JSON document per upload.
//!
//! Layout: `<dir>/<id>.json`. Writes go to `<id>.json.tmp` first and are
//! synced, then renamed into place, so readers never observe a half-written
//! record. Ids follow the same rules as storage targets.

use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use tusk_protocol::{Page, UploadRecord};
use tusk_transfer::validate_upload_id;

use crate::{StoreError, StoreFuture, UploadStore};

const RECORD_EXT: &str = "json";

/// Durable record store backed by a directory of JSON files.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Opens (and creates if needed) the store directory.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        debug!(path = %dir.display(), "record store opened");
        Ok(Self { dir })
    }

    /// Returns the directory holding the records.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, id: &str) -> Result<PathBuf, StoreError> {
        validate_upload_id(id).map_err(|_| StoreError::InvalidId(id.to_string()))?;
        Ok(self.dir.join(format!("{id}.{RECORD_EXT}")))
    }

    async fn write_record(&self, path: &Path, record: &UploadRecord) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(record)?;
        let tmp = path.with_extension(format!("{RECORD_EXT}.tmp"));

        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(&json).await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    async fn read_record(path: &Path) -> Result<Option<UploadRecord>, StoreError> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn read_all(&self) -> Result<Vec<UploadRecord>, StoreError> {
        let mut records = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(RECORD_EXT) {
                continue;
            }
            match Self::read_record(&path).await {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {}
                Err(e) => {
                    warn!(path = %path.display(), "skipping unreadable upload record: {e}");
                }
            }
        }

        records.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(records)
    }
}

impl UploadStore for JsonFileStore {
    fn create(&self, record: UploadRecord) -> StoreFuture<'_, UploadRecord> {
        Box::pin(async move {
            let path = self.record_path(&record.id)?;
            if tokio::fs::try_exists(&path).await? {
                return Err(StoreError::Duplicate(record.id));
            }
            self.write_record(&path, &record).await?;
            Ok(record)
        })
    }

    fn save(&self, record: UploadRecord) -> StoreFuture<'_, UploadRecord> {
        Box::pin(async move {
            let path = self.record_path(&record.id)?;
            if !tokio::fs::try_exists(&path).await? {
                return Err(StoreError::NotFound(record.id));
            }
            self.write_record(&path, &record).await?;
            Ok(record)
        })
    }

    fn find_by_id<'a>(&'a self, id: &'a str) -> StoreFuture<'a, Option<UploadRecord>> {
        Box::pin(async move {
            let path = self.record_path(id)?;
            Self::read_record(&path).await
        })
    }

    fn find_page(&self, page: usize, page_size: usize) -> StoreFuture<'_, Page<UploadRecord>> {
        Box::pin(async move {
            let all = self.read_all().await?;
            Ok(Page::from_vec(all, page, page_size))
        })
    }

    fn delete<'a>(&'a self, id: &'a str) -> StoreFuture<'a, bool> {
        Box::pin(async move {
            let path = self.record_path(id)?;
            match tokio::fs::remove_file(&path).await {
                Ok(()) => Ok(true),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
                Err(e) => Err(e.into()),
            }
        })
    }
}
