//! Per-upload mutual exclusion.
//!
//! Each upload id maps to its own async mutex, created on first use and
//! dropped from the table once nobody holds or waits for it. The table
//! lock is only held for the lookup, never across an await.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Guard for one upload id; the lock is released when it is dropped.
pub(crate) type UploadGuard = OwnedMutexGuard<()>;

#[derive(Debug, Default)]
pub(crate) struct UploadLocks {
    table: Mutex<HashMap<String, Weak<AsyncMutex<()>>>>,
}

impl UploadLocks {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Waits until no other caller holds the lock for `id`.
    pub(crate) async fn acquire(&self, id: &str) -> UploadGuard {
        let lock = {
            let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
            table.retain(|_, weak| weak.strong_count() > 0);

            match table.get(id).and_then(Weak::upgrade) {
                Some(lock) => lock,
                None => {
                    let lock = Arc::new(AsyncMutex::new(()));
                    table.insert(id.to_string(), Arc::downgrade(&lock));
                    lock
                }
            }
        };
        lock.lock_owned().await
    }

    /// Number of ids currently held or awaited.
    pub(crate) fn active(&self) -> usize {
        let table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        table.values().filter(|weak| weak.strong_count() > 0).count()
    }
}
