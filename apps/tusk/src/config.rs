//! Command line configuration.
//!
//! Stored as TOML, by default at `~/.config/tusk/tusk.toml`. A missing file
//! is created with defaults and a freshly generated token.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tusk_engine::EngineConfig;
use tusk_protocol::constants::DEFAULT_PAGE_SIZE;
use tusk_transfer::DEFAULT_CHUNK_SIZE;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding one storage target per upload.
    #[serde(default = "default_file_directory")]
    pub file_directory: PathBuf,

    /// Directory holding one JSON record per upload.
    #[serde(default = "default_records_directory")]
    pub records_directory: PathBuf,

    /// Shared secret sent as `X-Token`. Generated when empty.
    #[serde(default)]
    pub token: String,

    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Largest accepted upload in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_upload_size: Option<u64>,

    /// Seconds allowed for one chunk (0 = no limit).
    #[serde(default = "default_chunk_timeout_secs")]
    pub chunk_timeout_secs: u64,

    /// Bytes per chunk sent by `push` and `resume`.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

fn data_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
    PathBuf::from(home).join(".local").join("share").join("tusk")
}

fn default_file_directory() -> PathBuf {
    data_dir().join("files")
}

fn default_records_directory() -> PathBuf {
    data_dir().join("records")
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

fn default_chunk_timeout_secs() -> u64 {
    60
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

impl Default for Config {
    fn default() -> Self {
        Self {
            file_directory: default_file_directory(),
            records_directory: default_records_directory(),
            token: String::new(),
            page_size: default_page_size(),
            max_upload_size: None,
            chunk_timeout_secs: default_chunk_timeout_secs(),
            chunk_size: default_chunk_size(),
        }
    }
}

impl Config {
    /// Loads the configuration from `path` (or the default location),
    /// creating it when absent and filling in a token when none is set.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = Self::resolve_path(path);

        let existed = path.exists();
        let mut config = if existed {
            let content = std::fs::read_to_string(&path)?;
            toml::from_str::<Config>(&content)?
        } else {
            Config::default()
        };

        let mut dirty = !existed;
        if config.token.is_empty() {
            config.token = tusk_adapter::generate_token();
            tracing::info!("generated new access token");
            dirty = true;
        }
        if dirty {
            config.save(&path)?;
        }
        Ok(config)
    }

    /// Writes the configuration to `path`, readable by the owner only.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }

        tracing::debug!(path = %path.display(), "configuration saved");
        Ok(())
    }

    /// The explicit path if given, otherwise the default location.
    pub fn resolve_path(path: Option<&Path>) -> PathBuf {
        match path {
            Some(p) => p.to_path_buf(),
            None => config_path(),
        }
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            page_size: self.page_size,
            max_upload_size: self.max_upload_size,
            chunk_timeout: (self.chunk_timeout_secs > 0)
                .then(|| Duration::from_secs(self.chunk_timeout_secs)),
        }
    }
}

fn config_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
    PathBuf::from(home)
        .join(".config")
        .join("tusk")
        .join("tusk.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert!(config.file_directory.ends_with("tusk/files"));
        assert!(config.records_directory.ends_with("tusk/records"));
        assert!(config.token.is_empty());
        assert_eq!(config.page_size, 50);
        assert_eq!(config.chunk_size, 4 * 1024 * 1024);
        assert_eq!(config.chunk_timeout_secs, 60);
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let config: Config = toml::from_str(r#"file_directory = "/srv/uploads""#).unwrap();
        assert_eq!(config.file_directory, PathBuf::from("/srv/uploads"));
        assert_eq!(config.page_size, 50);
        assert!(config.max_upload_size.is_none());
    }

    #[test]
    fn engine_config_mapping() {
        let config = Config {
            max_upload_size: Some(1024),
            chunk_timeout_secs: 0,
            page_size: 10,
            ..Config::default()
        };
        let engine = config.engine_config();
        assert_eq!(engine.page_size, 10);
        assert_eq!(engine.max_upload_size, Some(1024));
        assert!(engine.chunk_timeout.is_none());

        let engine = Config::default().engine_config();
        assert_eq!(engine.chunk_timeout, Some(Duration::from_secs(60)));
    }

    #[test]
    fn load_creates_file_with_token() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("tusk.toml");

        let first = Config::load(Some(&path)).unwrap();
        assert!(path.exists());
        assert_eq!(first.token.len(), 32);

        let second = Config::load(Some(&path)).unwrap();
        assert_eq!(second, first);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[test]
    fn load_fills_missing_token() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("tusk.toml");
        std::fs::write(&path, "page_size = 5\nmax_upload_size = 99\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.page_size, 5);
        assert_eq!(config.max_upload_size, Some(99));
        assert!(!config.token.is_empty());

        let saved = std::fs::read_to_string(&path).unwrap();
        assert!(saved.contains(&config.token));
    }
}
