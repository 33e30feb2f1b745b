use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MAX_CONCURRENCY: usize = 4;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    #[error("Configuration validation failed: {0}")]
    Validation(String),

    #[error("Failed to write configuration {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Last used anime root directory.
    pub anime_root: Option<PathBuf>,
    pub index: IndexConfig,
    pub metadata: MetadataConfig,
    pub download: DownloadConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub base_url: String,
    /// Appended to every search, e.g. `1080p`.
    pub search_suffix: String,
    /// Link text of the subtitle attachment to download.
    pub subtitle_label: String,
    /// Re-query `[group] title` after a group is picked to pick up
    /// episodes beyond the first result page.
    pub refine_release_search: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    pub endpoint: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub timeout_secs: u64,
    pub concurrency: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            base_url: "https://animetosho.org".to_string(),
            search_suffix: "1080p".to_string(),
            subtitle_label: "English subs [eng, ASS]".to_string(),
            refine_release_search: true,
        }
    }
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://graphql.anilist.co".to_string(),
        }
    }
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
            max_delay_ms: 4000,
            timeout_secs: 30,
            concurrency: 3,
        }
    }
}

impl DownloadConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// `<config dir>/subdl/config.toml`, or `./subdl.toml` when the platform has
/// no config directory.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("subdl").join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("subdl.toml"))
}

impl Config {
    /// Loads defaults, then `path` if it exists, then `SUBDL_*` environment
    /// overrides (`SUBDL_DOWNLOAD__CONCURRENCY=2`).
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let config: Config = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("SUBDL_").split("__"))
            .extract()
            .map_err(|e| ConfigError::Parse(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Parses a TOML document on top of the defaults, without environment overrides.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(toml_str).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let contents = toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))?;
        fs::write(path, contents).map_err(io_err)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let download = &self.download;
        if download.max_attempts == 0 {
            return Err(ConfigError::Validation(
                "download.max_attempts must be at least 1".to_string(),
            ));
        }
        if !(1..=MAX_CONCURRENCY).contains(&download.concurrency) {
            return Err(ConfigError::Validation(format!(
                "download.concurrency must be between 1 and {MAX_CONCURRENCY}"
            )));
        }
        if download.base_delay_ms > download.max_delay_ms {
            return Err(ConfigError::Validation(
                "download.base_delay_ms cannot exceed download.max_delay_ms".to_string(),
            ));
        }
        if self.index.base_url.trim().is_empty() || self.metadata.endpoint.trim().is_empty() {
            return Err(ConfigError::Validation(
                "index.base_url and metadata.endpoint cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// The saved anime root, if it still points at a directory.
    pub fn remembered_root(&self) -> Option<&Path> {
        let root = self.anime_root.as_deref()?;
        if root.is_dir() {
            Some(root)
        } else {
            tracing::warn!(path = %root.display(), "saved anime directory is no longer valid");
            None
        }
    }
}
