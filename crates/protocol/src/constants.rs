//! Protocol constants shared by the engine and the adapter.

/// Protocol version spoken by this server (`Tus-Resumable`).
pub const TUS_RESUMABLE: &str = "1.0.0";

/// Every protocol version the server accepts, newest first (`Tus-Version`).
pub const TUS_VERSIONS: &[&str] = &["1.0.0", "0.2.2", "0.2.1"];

/// Supported protocol extensions (`Tus-Extension`).
pub const TUS_EXTENSIONS: &[&str] = &["creation", "expiration"];

/// Content type required on chunk (PATCH) requests.
pub const OFFSET_OCTET_STREAM: &str = "application/offset+octet-stream";

/// Default number of records per page when listing uploads.
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Metadata key carrying the client-side file name.
pub const METADATA_FILENAME: &str = "filename";

/// Metadata key carrying the client-side upload fingerprint.
pub const METADATA_FINGERPRINT: &str = "fingerprint";

/// Stored as `original_name` when the client sends no `filename` entry.
pub const MISSING_FILENAME: &str = "FILE NAME NOT EXISTS";

/// HTTP header names used by the adapter.
pub mod headers {
    pub const TUS_RESUMABLE: &str = "Tus-Resumable";
    pub const TUS_VERSION: &str = "Tus-Version";
    pub const TUS_EXTENSION: &str = "Tus-Extension";
    pub const TUS_MAX_SIZE: &str = "Tus-Max-Size";
    pub const UPLOAD_OFFSET: &str = "Upload-Offset";
    pub const UPLOAD_LENGTH: &str = "Upload-Length";
    pub const UPLOAD_METADATA: &str = "Upload-Metadata";
    pub const LOCATION: &str = "Location";
    pub const CACHE_CONTROL: &str = "Cache-Control";
    pub const EXPOSE_HEADERS: &str = "Access-Control-Expose-Headers";
    pub const ALLOW_METHODS: &str = "Access-Control-Allow-Methods";
    pub const TOKEN: &str = "X-Token";
}
