//! TOML configuration for refshelf.
//!
//! Every field has a default, so a partial (or absent) file is valid. The
//! loaded value is passed explicitly to each component; nothing reads it from
//! process-wide state.

use std::path::Path;

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::references::chunker::ChunkConfig;
use crate::references::extract::ExtractorConfig;

/// Errors from configuration loading and saving.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config: {path}")]
    #[diagnostic(
        code(refshelf::config::read),
        help("Ensure the config file exists and is readable, or run `refshelf init-config`.")
    )]
    ConfigRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {path}: {message}")]
    #[diagnostic(
        code(refshelf::config::parse),
        help("Check the TOML syntax and field names in the config file.")
    )]
    ConfigParse { path: String, message: String },

    #[error("failed to write config: {path}")]
    #[diagnostic(
        code(refshelf::config::write),
        help("Ensure you have write permissions to the config directory.")
    )]
    ConfigWrite {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Where the reference store lives inside a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// File name under `<project>/.storage/`.
    #[serde(default = "default_store_file")]
    pub file_name: String,
}

fn default_store_file() -> String {
    "references.json".into()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            file_name: default_store_file(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefshelfConfig {
    /// Default tracing filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub extractor: ExtractorConfig,
    #[serde(default)]
    pub chunking: ChunkConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for RefshelfConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            extractor: ExtractorConfig::default(),
            chunking: ChunkConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl RefshelfConfig {
    /// Load from a TOML file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ConfigRead {
            path: path.display().to_string(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::ConfigParse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Load from a TOML file, or return defaults if it does not exist.
    pub fn load_or_default(path: &Path) -> ConfigResult<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Save to a TOML file.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::ConfigParse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::ConfigWrite {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        std::fs::write(path, content).map_err(|e| ConfigError::ConfigWrite {
            path: path.display().to_string(),
            source: e,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_roundtrip_toml() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("config.toml");

        let mut cfg = RefshelfConfig::default();
        cfg.extractor.command = "/opt/grobid/client".into();
        cfg.extractor.timeout_secs = Some(600);
        cfg.chunking.target_words = 200;
        cfg.save(&path).unwrap();

        assert_eq!(RefshelfConfig::load(&path).unwrap(), cfg);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let cfg: RefshelfConfig = toml::from_str(
            r#"
            log_level = "debug"

            [chunking]
            max_words = 800
            "#,
        )
        .unwrap();
        assert_eq!(cfg.log_level, "debug");
        assert_eq!(cfg.chunking.max_words, 800);
        assert_eq!(cfg.chunking.min_words, 50);
        assert_eq!(cfg.extractor, ExtractorConfig::default());
        assert_eq!(cfg.storage.file_name, "references.json");
    }

    #[test]
    fn missing_file_uses_defaults() {
        let tmp = tempfile::TempDir::new().unwrap();
        let cfg = RefshelfConfig::load_or_default(&tmp.path().join("absent.toml")).unwrap();
        assert_eq!(cfg, RefshelfConfig::default());
    }

    #[test]
    fn invalid_toml_is_parse_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "log_level = [").unwrap();
        assert!(matches!(
            RefshelfConfig::load(&path),
            Err(ConfigError::ConfigParse { .. })
        ));
    }
}
