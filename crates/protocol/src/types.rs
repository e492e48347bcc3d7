use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{TUS_EXTENSIONS, TUS_RESUMABLE, TUS_VERSIONS};

/// Durable state of one upload session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRecord {
    pub id: String,
    #[serde(default)]
    pub mime_type: String,
    /// Total size declared by the client at creation.
    pub content_length: u64,
    /// Bytes durably written so far; the resume point.
    pub content_offset: u64,
    /// Number of accepted chunks.
    pub last_chunk_number: u64,
    pub original_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UploadRecord {
    /// Creates a fresh record with no bytes received.
    pub fn new(
        id: impl Into<String>,
        mime_type: impl Into<String>,
        content_length: u64,
        original_name: impl Into<String>,
        fingerprint: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            mime_type: mime_type.into(),
            content_length,
            content_offset: 0,
            last_chunk_number: 0,
            original_name: original_name.into(),
            fingerprint,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns `true` once every declared byte has been received.
    pub fn is_complete(&self) -> bool {
        self.content_offset >= self.content_length
    }

    /// Bytes still expected from the client.
    pub fn remaining(&self) -> u64 {
        self.content_length.saturating_sub(self.content_offset)
    }
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Zero-based page index.
    pub page: usize,
    pub page_size: usize,
    /// Total number of items across all pages.
    pub total: usize,
}

impl<T> Page<T> {
    /// Slices `all` into the requested page.
    pub fn from_vec(all: Vec<T>, page: usize, page_size: usize) -> Self {
        let total = all.len();
        let items = all
            .into_iter()
            .skip(page.saturating_mul(page_size))
            .take(page_size)
            .collect();
        Self {
            items,
            page,
            page_size,
            total,
        }
    }
}

/// Static capability descriptor answered on OPTIONS.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    pub resumable: String,
    pub versions: Vec<String>,
    pub extensions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_size: Option<u64>,
}

impl Capabilities {
    /// Descriptor for this server, optionally advertising a size limit.
    pub fn new(max_size: Option<u64>) -> Self {
        Self {
            resumable: TUS_RESUMABLE.to_string(),
            versions: TUS_VERSIONS.iter().map(|v| v.to_string()).collect(),
            extensions: TUS_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            max_size,
        }
    }
}
