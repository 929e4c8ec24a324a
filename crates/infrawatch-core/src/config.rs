use infrawatch_api::{RetryConfig, StoreSettings};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Prefix for environment overrides, e.g. `INFRAWATCH_STORE__API_KEY`
pub const ENV_PREFIX: &str = "INFRAWATCH";

/// Main configuration structure
///
/// This gets loaded from config file, env vars, and CLI args.
/// Priority: CLI > Env > File > Defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub cache: CacheConfig,
}

impl Config {
    /// Load config from the default location, falling back to defaults
    pub fn load() -> crate::Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load config from `path` (if it exists) layered under the environment
    pub fn load_from(path: &Path) -> crate::Result<Self> {
        let settings = config::Config::builder()
            .add_source(
                config::File::from(path)
                    .format(config::FileFormat::Toml)
                    .required(false),
            )
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| crate::Error::ConfigError(format!("Failed to load config: {}", e)))?;

        settings
            .try_deserialize()
            .map_err(|e| crate::Error::ConfigError(format!("Failed to parse config: {}", e)))
    }

    /// Save config to disk
    pub fn save(&self) -> crate::Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> crate::Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| crate::Error::ConfigError(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Get the config file path
    /// Uses XDG on Linux, Application Support on macOS, AppData on Windows
    pub fn config_path() -> crate::Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| crate::Error::ConfigError("Could not find config directory".into()))?
            .join("infrawatch");

        Ok(config_dir.join("config.toml"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// REST endpoint of the record store, e.g. `https://<project>.supabase.co/rest/v1`
    pub url: Option<String>,

    /// API key sent as both `apikey` and bearer token
    pub api_key: Option<String>,

    pub domains_table: String,
    pub servers_table: String,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    pub retry: RetrySettings,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            domains_table: infrawatch_api::store::DEFAULT_DOMAINS_TABLE.to_string(),
            servers_table: infrawatch_api::store::DEFAULT_SERVERS_TABLE.to_string(),
            timeout_secs: 30,
            retry: RetrySettings::default(),
        }
    }
}

impl StoreConfig {
    pub fn to_settings(&self) -> crate::Result<StoreSettings> {
        let url = self
            .url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| {
                crate::Error::ConfigError(format!(
                    "store.url is not set (config file or {}_STORE__URL)",
                    ENV_PREFIX
                ))
            })?;

        Ok(StoreSettings {
            base_url: url.to_string(),
            api_key: self.api_key.clone().filter(|key| !key.is_empty()),
            domains_table: self.domains_table.clone(),
            servers_table: self.servers_table.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
            retry: self.retry.to_retry_config(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        let defaults = RetryConfig::default();
        Self {
            max_retries: defaults.max_retries,
            initial_delay_ms: defaults.initial_delay_ms,
            max_delay_ms: defaults.max_delay_ms,
        }
    }
}

impl RetrySettings {
    pub fn to_retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_retries: self.max_retries,
            initial_delay_ms: self.initial_delay_ms,
            max_delay_ms: self.max_delay_ms,
            ..RetryConfig::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Serve recent feeds from the local cache
    pub enabled: bool,

    /// How long a cached feed stays fresh, in seconds
    pub ttl_seconds: u64,

    /// Where the cache database lives (default: user cache dir)
    pub path: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_seconds: 300, // five minutes is plenty for a dashboard
            path: None,
        }
    }
}

impl CacheConfig {
    pub fn resolved_path(&self) -> crate::Result<PathBuf> {
        if let Some(path) = &self.path {
            return Ok(path.clone());
        }

        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| crate::Error::ConfigError("Could not find cache directory".into()))?
            .join("infrawatch");

        Ok(cache_dir.join("feed.db"))
    }

    pub fn ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.ttl_seconds as i64)
    }
}
