//! Durable storage for upload records.
//!
//! The engine only talks to the [`UploadStore`] trait. Two implementations
//! ship with the crate: [`MemoryStore`] for tests and embedding, and
//! [`JsonFileStore`] which keeps one JSON document per upload on disk.

mod json_file;
mod memory;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

use std::future::Future;
use std::pin::Pin;

use tusk_protocol::{Page, UploadRecord};

/// A boxed future returned by store methods.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// Errors produced by record stores.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("record already exists: {0}")]
    Duplicate(String),

    #[error("record not found: {0}")]
    NotFound(String),

    #[error("invalid record id: {0}")]
    InvalidId(String),
}

/// Keyed storage of upload records.
///
/// Implementations only perform the I/O they are asked for; they know
/// nothing about offsets or chunk semantics.
pub trait UploadStore: Send + Sync {
    /// Inserts a new record. Fails with [`StoreError::Duplicate`] if the id
    /// is taken.
    fn create(&self, record: UploadRecord) -> StoreFuture<'_, UploadRecord>;

    /// Replaces an existing record. Fails with [`StoreError::NotFound`] if
    /// the id is unknown.
    fn save(&self, record: UploadRecord) -> StoreFuture<'_, UploadRecord>;

    /// Looks a record up by id.
    fn find_by_id<'a>(&'a self, id: &'a str) -> StoreFuture<'a, Option<UploadRecord>>;

    /// Returns one page of records in creation order.
    fn find_page(&self, page: usize, page_size: usize) -> StoreFuture<'_, Page<UploadRecord>>;

    /// Removes a record. Returns `true` if it existed.
    fn delete<'a>(&'a self, id: &'a str) -> StoreFuture<'a, bool>;
}
