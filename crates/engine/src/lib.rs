//! Resumable upload engine.
//!
//! [`UploadManager`] owns the transition from "chunk bytes accepted" to
//! "record updated". It drives the metadata codec, the chunk writer and the
//! record store, and guarantees at most one in-flight chunk per upload id
//! while leaving different uploads fully independent.
//!
//! # Chunk pipeline
//!
//! 1. **Lock**: acquire the per-upload lock
//! 2. **Load**: fetch the record, check the offset
//! 3. **Write**: drain and verify the body, check it fits the upload,
//!    write it positionally
//! 4. **Persist**: advance the offset and chunk counter, save the record

mod config;
mod error;
mod locks;
mod manager;

pub use config::EngineConfig;
pub use error::{ErrorKind, UploadError};
pub use manager::UploadManager;

// Re-export the collaborator types callers need to build a manager.
pub use tusk_protocol::{Capabilities, Page, UploadRecord};
pub use tusk_store::{JsonFileStore, MemoryStore, UploadStore};
pub use tusk_transfer::{ChunkStream, ChunkWriter, stream_from_bytes, stream_from_parts};
