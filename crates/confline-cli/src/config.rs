//! Configuration loading from TOML files

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use confline_core::{HttpConfig, RetryPolicy};
use confline_enrich::Throttle;
use serde::Deserialize;

/// Global configuration for confline
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub output: OutputConfig,
    pub workers: WorkersConfig,
    pub http: HttpSettings,
    pub retry: RetrySettings,
    pub dblp: DblpConfig,
    pub openalex: OpenAlexConfig,
    pub s2: S2Config,
    pub throttle: ThrottleConfig,
    pub citations: CitationsConfig,
}

/// One document directory per stage
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub base_dir: PathBuf,
    pub extended_dir: PathBuf,
    pub citations_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("./data/base_crawler_data"),
            extended_dir: PathBuf::from("./data/extended_crawler_data"),
            citations_dir: PathBuf::from("./data/citations_crawler_data"),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct WorkersConfig {
    pub default: usize,
    pub max: usize,
}

impl Default for WorkersConfig {
    fn default() -> Self {
        Self { default: 1, max: 16 }
    }
}

/// Timeouts in seconds
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    pub connect_timeout: u64,
    pub request_timeout: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            connect_timeout: 10,
            request_timeout: 30,
        }
    }
}

impl HttpSettings {
    pub fn to_http_config(self) -> HttpConfig {
        HttpConfig {
            connect_timeout: Duration::from_secs(self.connect_timeout),
            request_timeout: Duration::from_secs(self.request_timeout),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub backoff_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay_ms: 2000,
            backoff_ms: 5000,
        }
    }
}

impl RetrySettings {
    pub fn policy(self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            backoff: Duration::from_millis(self.backoff_ms),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DblpConfig {
    pub base_url: String,
    /// Conference name → year-page file slug
    pub slug_overrides: BTreeMap<String, String>,
    /// Section header terms skipped in addition to the built-in vocabulary
    pub extra_skip_sections: Vec<String>,
}

impl Default for DblpConfig {
    fn default() -> Self {
        Self {
            base_url: confline_dblp::DEFAULT_BASE_URL.to_string(),
            slug_overrides: BTreeMap::from([("cloud".to_string(), "socc".to_string())]),
            extra_skip_sections: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OpenAlexConfig {
    pub api_url: String,
}

impl Default for OpenAlexConfig {
    fn default() -> Self {
        Self {
            api_url: confline_openalex::api::DEFAULT_API_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct S2Config {
    pub api_url: String,
    #[serde(deserialize_with = "deserialize_env_var")]
    pub api_key: Option<String>,
}

impl Default for S2Config {
    fn default() -> Self {
        Self {
            api_url: confline_semantic_scholar::api::DEFAULT_API_URL.to_string(),
            api_key: std::env::var("S2_API_KEY").ok().filter(|k| !k.is_empty()),
        }
    }
}

/// Fixed pauses in milliseconds
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct ThrottleConfig {
    pub s2_request_ms: u64,
    pub s2_batch_ms: u64,
    pub cited_paper_ms: u64,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            s2_request_ms: 1000,
            s2_batch_ms: 750,
            cited_paper_ms: 500,
        }
    }
}

impl ThrottleConfig {
    pub fn throttle(self) -> Throttle {
        Throttle {
            s2_request: Duration::from_millis(self.s2_request_ms),
            s2_batch: Duration::from_millis(self.s2_batch_ms),
            cited_paper: Duration::from_millis(self.cited_paper_ms),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct CitationsConfig {
    pub batch_workers: usize,
}

impl Default for CitationsConfig {
    fn default() -> Self {
        Self { batch_workers: 1 }
    }
}

/// Deserialize a string that may contain environment variable reference like ${VAR}
fn deserialize_env_var<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    Ok(opt.and_then(|s| expand_env_var(&s)).filter(|s| !s.is_empty()))
}

/// Expand ${VAR} to environment variable value
fn expand_env_var(s: &str) -> Option<String> {
    if let Some(var_name) = s.strip_prefix("${").and_then(|s| s.strip_suffix('}')) {
        std::env::var(var_name).ok()
    } else {
        Some(s.to_string())
    }
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Search order:
    /// 1. ./confline.toml (current directory)
    /// 2. ~/.config/confline/config.toml
    ///
    /// If no config file found, returns default config.
    pub fn load() -> Result<Self> {
        let local_config = PathBuf::from("confline.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = directories::ProjectDirs::from("", "", "confline") {
            let user_config = config_dir.config_dir().join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        log::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }
}
