use std::collections::HashMap;

use tokio::sync::RwLock;
use tusk_protocol::{Page, UploadRecord};

use crate::{StoreError, StoreFuture, UploadStore};

/// In-process record store (thread-safe, not durable).
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryInner>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    records: HashMap<String, UploadRecord>,
    /// Ids in insertion order, for stable paging.
    order: Vec<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.inner.read().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl UploadStore for MemoryStore {
    fn create(&self, record: UploadRecord) -> StoreFuture<'_, UploadRecord> {
        Box::pin(async move {
            let mut inner = self.inner.write().await;
            if inner.records.contains_key(&record.id) {
                return Err(StoreError::Duplicate(record.id));
            }
            inner.order.push(record.id.clone());
            inner.records.insert(record.id.clone(), record.clone());
            Ok(record)
        })
    }

    fn save(&self, record: UploadRecord) -> StoreFuture<'_, UploadRecord> {
        Box::pin(async move {
            let mut inner = self.inner.write().await;
            match inner.records.get_mut(&record.id) {
                Some(existing) => {
                    *existing = record.clone();
                    Ok(record)
                }
                None => Err(StoreError::NotFound(record.id)),
            }
        })
    }

    fn find_by_id<'a>(&'a self, id: &'a str) -> StoreFuture<'a, Option<UploadRecord>> {
        Box::pin(async move { Ok(self.inner.read().await.records.get(id).cloned()) })
    }

    fn find_page(&self, page: usize, page_size: usize) -> StoreFuture<'_, Page<UploadRecord>> {
        Box::pin(async move {
            let inner = self.inner.read().await;
            let all = inner
                .order
                .iter()
                .filter_map(|id| inner.records.get(id).cloned())
                .collect();
            Ok(Page::from_vec(all, page, page_size))
        })
    }

    fn delete<'a>(&'a self, id: &'a str) -> StoreFuture<'a, bool> {
        Box::pin(async move {
            let mut inner = self.inner.write().await;
            let existed = inner.records.remove(id).is_some();
            if existed {
                inner.order.retain(|o| o != id);
            }
            Ok(existed)
        })
    }
}
