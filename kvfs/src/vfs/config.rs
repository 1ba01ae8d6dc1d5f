//! File store configuration
//!
//! Chunk size and backend selection, loadable from YAML:
//!
//! ```yaml
//! chunk_size: 1024
//! backend:
//!   type: localfs
//!   root: /var/lib/kvfs
//! ```

use crate::cadapter::client::KvStorage;
use crate::chuck::{ChunkLayout, DEFAULT_CHUNK_SIZE};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FsConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u64,

    #[serde(default)]
    pub backend: BackendConfig,
}

fn default_chunk_size() -> u64 {
    DEFAULT_CHUNK_SIZE
}

impl Default for FsConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            backend: BackendConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BackendConfig {
    #[default]
    #[serde(rename = "memory")]
    Memory,
    #[serde(rename = "localfs")]
    LocalFs { root: PathBuf },
}

impl BackendConfig {
    /// Name under which the opened storage is shared in a `BackendRegistry`.
    pub fn registry_key(&self) -> String {
        match self {
            BackendConfig::Memory => "memory".to_string(),
            BackendConfig::LocalFs { root } => format!("localfs:{}", root.display()),
        }
    }

    pub async fn connect(&self) -> anyhow::Result<KvStorage> {
        match self {
            BackendConfig::Memory => Ok(KvStorage::in_memory()),
            BackendConfig::LocalFs { root } => {
                tokio::fs::create_dir_all(root).await?;
                Ok(KvStorage::local_fs(root))
            }
        }
    }
}

impl FsConfig {
    /// Load configuration from YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::IoError)?;
        let config: FsConfig =
            serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::InvalidChunkSize(self.chunk_size));
        }
        Ok(())
    }

    pub fn layout(&self) -> Result<ChunkLayout, ConfigError> {
        self.validate()?;
        Ok(ChunkLayout::new(self.chunk_size))
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(std::io::Error),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid chunk size: {0}")]
    InvalidChunkSize(u64),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let cfg: FsConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(cfg, FsConfig::default());
        assert_eq!(cfg.layout().unwrap().chunk_size, 1024);
        assert_eq!(cfg.backend.registry_key(), "memory");
    }

    #[test]
    fn test_from_file_localfs() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "chunk_size: 7\nbackend:\n  type: localfs\n  root: /tmp/kvfs-test").unwrap();

        let cfg = FsConfig::from_file(file.path()).unwrap();
        assert_eq!(cfg.chunk_size, 7);
        assert_eq!(
            cfg.backend,
            BackendConfig::LocalFs {
                root: PathBuf::from("/tmp/kvfs-test")
            }
        );
        assert_eq!(cfg.backend.registry_key(), "localfs:/tmp/kvfs-test");
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "chunk_size: 0").unwrap();
        assert!(matches!(
            FsConfig::from_file(file.path()),
            Err(ConfigError::InvalidChunkSize(0))
        ));
    }

    #[test]
    fn test_unknown_backend_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "backend:\n  type: s3").unwrap();
        assert!(matches!(
            FsConfig::from_file(file.path()),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        assert!(matches!(
            FsConfig::from_file("/nonexistent/kvfs.yml"),
            Err(ConfigError::IoError(_))
        ));
    }
}
