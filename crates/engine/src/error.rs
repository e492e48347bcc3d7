//! Engine error types.

use std::time::Duration;

use tusk_protocol::MetadataError;
use tusk_store::StoreError;
use tusk_transfer::TransferError;

/// Errors produced by the upload manager.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("invalid metadata: {0}")]
    Metadata(#[from] MetadataError),

    #[error("upload not found: {0}")]
    NotFound(String),

    #[error("chunk size mismatch: declared {declared} bytes, received {actual}")]
    SizeMismatch { declared: u64, actual: u64 },

    #[error("offset mismatch: upload is at {expected}, chunk starts at {actual}")]
    OffsetMismatch { expected: u64, actual: u64 },

    #[error("chunk ends at byte {end}, past the declared length {length}")]
    ExceedsLength { end: u64, length: u64 },

    #[error("declared length {declared} exceeds the maximum upload size {max}")]
    TooLarge { declared: u64, max: u64 },

    #[error("chunk stream failed: {0}")]
    Stream(std::io::Error),

    #[error("storage error: {0}")]
    Storage(TransferError),

    #[error("persistence error: {0}")]
    Persistence(#[from] StoreError),

    #[error("chunk not received within {0:?}")]
    Timeout(Duration),
}

/// Coarse classification used to pick a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad request data; never retried, never mutates state.
    ClientInput,
    NotFound,
    /// Byte storage failed; the chunk was not applied.
    Storage,
    /// Record store failed.
    Persistence,
    Timeout,
}

impl UploadError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            UploadError::Metadata(_)
            | UploadError::SizeMismatch { .. }
            | UploadError::OffsetMismatch { .. }
            | UploadError::ExceedsLength { .. }
            | UploadError::TooLarge { .. }
            | UploadError::Stream(_) => ErrorKind::ClientInput,
            UploadError::NotFound(_) => ErrorKind::NotFound,
            UploadError::Storage(_) => ErrorKind::Storage,
            UploadError::Persistence(_) => ErrorKind::Persistence,
            UploadError::Timeout(_) => ErrorKind::Timeout,
        }
    }
}

impl From<TransferError> for UploadError {
    fn from(err: TransferError) -> Self {
        match err {
            TransferError::SizeMismatch { declared, actual } => {
                UploadError::SizeMismatch { declared, actual }
            }
            TransferError::Stream(e) => UploadError::Stream(e),
            TransferError::InvalidId(id) => UploadError::NotFound(id),
            other => UploadError::Storage(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_mismatch_is_client_input() {
        let err: UploadError = TransferError::SizeMismatch {
            declared: 7,
            actual: 6,
        }
        .into();
        assert!(matches!(
            err,
            UploadError::SizeMismatch {
                declared: 7,
                actual: 6
            }
        ));
        assert_eq!(err.kind(), ErrorKind::ClientInput);
    }

    #[test]
    fn io_failure_is_storage() {
        let err: UploadError = TransferError::Io(std::io::Error::other("disk full")).into();
        assert_eq!(err.kind(), ErrorKind::Storage);

        let err: UploadError = TransferError::TargetMissing("u1".into()).into();
        assert_eq!(err.kind(), ErrorKind::Storage);
    }

    #[test]
    fn store_failure_is_persistence() {
        let err: UploadError = StoreError::Io(std::io::Error::other("db down")).into();
        assert_eq!(err.kind(), ErrorKind::Persistence);
    }

    #[test]
    fn metadata_failure_is_client_input() {
        let err: UploadError = MetadataError::Missing.into();
        assert_eq!(err.kind(), ErrorKind::ClientInput);
        assert_eq!(err.to_string(), "invalid metadata: metadata header is missing");
    }
}
