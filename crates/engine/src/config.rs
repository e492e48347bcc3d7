use std::time::Duration;

use tusk_protocol::constants::DEFAULT_PAGE_SIZE;

/// Engine tuning knobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Records per page when the caller does not ask for a size.
    pub page_size: usize,

    /// Largest `Upload-Length` accepted at creation (`None` = unlimited).
    pub max_upload_size: Option<u64>,

    /// Upper bound for draining and writing one chunk (`None` = no limit).
    pub chunk_timeout: Option<Duration>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            max_upload_size: None,
            chunk_timeout: None,
        }
    }
}
