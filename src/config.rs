use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::http_client::{Fetcher, HttpConfig};
use crate::models::Source;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid config in {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },

    #[error("no [bucket] section configured and no credentials in the environment")]
    MissingBucket,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Seconds between background checks; 0 disables the scheduler.
    #[serde(default)]
    pub check_interval_secs: u64,

    #[serde(default)]
    pub http: HttpSection,

    pub bucket: Option<BucketConfig>,

    #[serde(default)]
    pub notify: NotifyConfig,

    #[serde(default)]
    pub sources: SourcesConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpSection {
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    #[serde(default = "default_initial_retry_delay")]
    pub initial_retry_delay_ms: u64,

    #[serde(default = "default_max_retry_delay")]
    pub max_retry_delay_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BucketConfig {
    pub endpoint: String,
    pub name: String,

    /// Object key holding the library snapshot.
    #[serde(default = "default_bucket_key")]
    pub key: String,

    pub region: String,

    #[serde(default)]
    pub access_key: String,

    #[serde(default)]
    pub secret_key: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct NotifyConfig {
    /// Absent means log-only: new chapters are reported but not pushed.
    pub webhook_url: Option<String>,
}

/// Slugs to track, grouped per source.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct SourcesConfig {
    #[serde(default)]
    pub neatmanga: Vec<String>,

    #[serde(default)]
    pub mangapill: Vec<String>,

    #[serde(default)]
    pub toonily: Vec<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_timeout() -> u64 {
    30
}
fn default_max_retries() -> usize {
    4
}
fn default_initial_retry_delay() -> u64 {
    500
}
fn default_max_retry_delay() -> u64 {
    8000
}
fn default_bucket_key() -> String {
    "mangas.json".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            check_interval_secs: 0,
            http: HttpSection::default(),
            bucket: None,
            notify: NotifyConfig::default(),
            sources: SourcesConfig::default(),
        }
    }
}

impl Default for HttpSection {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            max_retries: default_max_retries(),
            initial_retry_delay_ms: default_initial_retry_delay(),
            max_retry_delay_ms: default_max_retry_delay(),
        }
    }
}

impl Config {
    /// Load from a TOML file. A missing file yields the defaults; a file that
    /// fails to parse is an error rather than a silent fallback.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::info!("no config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

impl HttpSection {
    pub fn fetcher(&self) -> Result<Fetcher, reqwest::Error> {
        Fetcher::new(HttpConfig {
            timeout: Duration::from_secs(self.timeout_secs),
            max_retries: self.max_retries,
            initial_retry_delay_ms: self.initial_retry_delay_ms,
            max_retry_delay_ms: self.max_retry_delay_ms,
        })
    }
}

impl SourcesConfig {
    /// Every (source, slug) pair in a stable order: sources in declaration
    /// order, slugs in config order.
    pub fn tracked(&self) -> Vec<(Source, &str)> {
        let mut pairs = Vec::new();
        for source in Source::ALL {
            let slugs = match source {
                Source::Neatmanga => &self.neatmanga,
                Source::Mangapill => &self.mangapill,
                Source::Toonily => &self.toonily,
            };
            pairs.extend(slugs.iter().map(|s| (*source, s.as_str())));
        }
        pairs
    }

    pub fn is_empty(&self) -> bool {
        self.tracked().is_empty()
    }
}
