use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable that overrides `webhook_url` from the config file.
pub const WEBHOOK_URL_ENV: &str = "CRMLINK_WEBHOOK_URL";

/// Method whose batch support is known to be broken on the remote side.
pub const PRODUCT_ROWS_METHOD: &str = "crm.item.productrow.list";

/// Retry policy parameters (optional section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts per call (including the first).
    pub max_attempts: u32,
    /// Delay in seconds before the second attempt; doubles each time.
    pub backoff_secs: f64,
    /// Maximum backoff delay in seconds.
    pub max_delay_secs: u64,
    /// HTTP statuses that may be retried (default 429, 500, 502, 503, 504).
    #[serde(default)]
    pub retryable_status_codes: Option<Vec<u16>>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_secs: 1.0,
            max_delay_secs: 30,
            retryable_status_codes: None,
        }
    }
}

/// Response cache parameters (optional section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub enabled: bool,
    /// Entry lifetime in seconds, measured from when it was stored.
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: 15 * 60,
        }
    }
}

/// Batch endpoint parameters (optional section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Commands per `batch` request; the remote side caps this at 50.
    pub max_commands: usize,
    /// Methods that return wrong results inside `batch` and must be called
    /// one item at a time.
    #[serde(default)]
    pub unsupported_methods: Vec<String>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_commands: 50,
            unsupported_methods: vec![PRODUCT_ROWS_METHOD.to_string()],
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    15
}

fn default_max_requests_per_second() -> f64 {
    2.0
}

fn default_max_interval_secs() -> f64 {
    2.0
}

/// Global configuration loaded from `~/.config/crmlink/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrmlinkConfig {
    /// Pre-authenticated webhook base URL, e.g. `https://example.bitrix24.ru/rest/1/token`.
    pub webhook_url: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Connect timeout in seconds.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Request quota enforced client-side.
    #[serde(default = "default_max_requests_per_second")]
    pub max_requests_per_second: f64,
    /// Ceiling for the adaptive interval after repeated throttling.
    #[serde(default = "default_max_interval_secs")]
    pub max_interval_secs: f64,
    /// Optional retry policy; if missing, built-in defaults are used.
    #[serde(default)]
    pub retry: Option<RetryConfig>,
    /// Optional cache settings; if missing, caching is on with a 15 minute TTL.
    #[serde(default)]
    pub cache: Option<CacheConfig>,
    /// Optional batch settings.
    #[serde(default)]
    pub batch: Option<BatchConfig>,
}

impl Default for CrmlinkConfig {
    fn default() -> Self {
        Self {
            webhook_url: String::new(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            max_requests_per_second: default_max_requests_per_second(),
            max_interval_secs: default_max_interval_secs(),
            retry: None,
            cache: None,
            batch: None,
        }
    }
}

impl CrmlinkConfig {
    /// Apply environment overrides (currently only the webhook URL).
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var(WEBHOOK_URL_ENV) {
            if !url.trim().is_empty() {
                self.webhook_url = url.trim().to_string();
            }
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("crmlink")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<CrmlinkConfig> {
    let path = config_path()?;
    let mut cfg = if path.exists() {
        load_from_path(&path)?
    } else {
        let default_cfg = CrmlinkConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        default_cfg
    };
    cfg.apply_env_overrides();
    Ok(cfg)
}

/// Load configuration from an explicit path.
pub fn load_from_path(path: &Path) -> Result<CrmlinkConfig> {
    let data =
        fs::read_to_string(path).with_context(|| format!("read config: {}", path.display()))?;
    let cfg: CrmlinkConfig =
        toml::from_str(&data).with_context(|| format!("parse config: {}", path.display()))?;
    Ok(cfg)
}
