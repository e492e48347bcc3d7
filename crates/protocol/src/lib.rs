//! Protocol types for the tusk resumable upload server.
//!
//! Holds everything both sides of the engine agree on: the durable
//! [`UploadRecord`], the `Upload-Metadata` codec, listing pages and the
//! static capability descriptor.

pub mod constants;
pub mod metadata;
pub mod types;

// Re-export primary types for convenience.
pub use metadata::{MetadataError, encode_metadata, parse_metadata};
pub use types::{Capabilities, Page, UploadRecord};
