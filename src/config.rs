//! Gateway configuration.
//!
//! Configuration is loaded from TOML with the following resolution order:
//! 1. Explicit path (e.g. `--config <path>`)
//! 2. `~/.vedetta/config.toml` (user)
//! 3. `/etc/vedetta/config.toml` (system)
//!
//! Every field has a default, so an empty file (or no file, via
//! [`GatewayConfig::load_or_default`]) is a working configuration.
//! The provider API key is never read from the file; it comes from the
//! environment variable named by `provider.api_key_env`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::CacheConfig;
use crate::classify::ClassifierConfig;
use crate::persona::BusinessProfile;
use crate::providers::{CompletionDefaults, RetryConfig};
use crate::{GatewayError, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub performance: PerformanceConfig,
    pub analytics: AnalyticsConfig,
    pub provider: ProviderConfig,
    pub primary: PrimaryConfig,
    pub conversation: ConversationConfig,
    pub escalation: EscalationConfig,
    pub business: BusinessProfile,
    pub classifier: ClassifierConfig,
}

/// Queue pacing, timeouts, retry and cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    /// Retries after the first secondary attempt.
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub max_retry_delay_ms: u64,
    /// Budget for the whole secondary stage, retries included.
    pub timeout_ms: u64,
    /// Pause between queued provider calls.
    pub rate_limit_delay_ms: u64,
    pub cache_enabled: bool,
    pub cache_ttl_ms: u64,
    pub cache_max_entries: u64,
    pub cleanup_interval_ms: u64,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay_ms: 1_000,
            max_retry_delay_ms: 10_000,
            timeout_ms: 15_000,
            rate_limit_delay_ms: 2_000,
            cache_enabled: true,
            cache_ttl_ms: 300_000,
            cache_max_entries: 1_000,
            cleanup_interval_ms: 300_000,
        }
    }
}

impl PerformanceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn rate_limit_delay(&self) -> Duration {
        Duration::from_millis(self.rate_limit_delay_ms)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_millis(self.cleanup_interval_ms)
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::new()
            .max_retries(self.max_retries)
            .initial_delay(Duration::from_millis(self.retry_delay_ms))
            .max_delay(Duration::from_millis(self.max_retry_delay_ms))
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig::new()
            .max_entries(self.cache_max_entries)
            .ttl(Duration::from_millis(self.cache_ttl_ms))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub enabled: bool,
    /// Absolute URL of the collector. Without one, batches go to the log.
    pub endpoint: Option<String>,
    pub batch_size: usize,
    pub flush_interval_ms: u64,
    /// Capacity of the in-memory performance log.
    pub metrics_capacity: usize,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: None,
            batch_size: 10,
            flush_interval_ms: 30_000,
            metrics_capacity: 100,
        }
    }
}

impl AnalyticsConfig {
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Override for OpenAI-compatible endpoints.
    pub base_url: Option<String>,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    #[serde(flatten)]
    pub defaults: CompletionDefaults,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key_env: "OPENAI_API_KEY".into(),
            defaults: CompletionDefaults::default(),
        }
    }
}

impl ProviderConfig {
    /// API key from the environment, if set and non-empty.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrimaryConfig {
    /// Primary answers must score strictly above this.
    pub confidence_threshold: f64,
}

impl Default for PrimaryConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.7,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationConfig {
    /// Past turns sent along with each new message.
    pub history_window: usize,
    /// Turns kept in memory.
    pub max_history: usize,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            history_window: 5,
            max_history: 50,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EscalationConfig {
    pub enabled: bool,
    /// Also POST signals here when set.
    pub webhook_url: Option<String>,
    /// How long shutdown waits for in-flight notifier deliveries.
    pub shutdown_timeout_ms: u64,
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            webhook_url: None,
            shutdown_timeout_ms: 5_000,
        }
    }
}

impl EscalationConfig {
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

impl GatewayConfig {
    /// Load configuration from the standard locations.
    ///
    /// Resolution order:
    /// 1. Explicit path (if provided)
    /// 2. `~/.vedetta/config.toml`
    /// 3. `/etc/vedetta/config.toml`
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let path = Self::resolve_config_path(explicit_path)?.ok_or_else(|| {
            GatewayError::Configuration(
                "No config file found. Create ~/.vedetta/config.toml or /etc/vedetta/config.toml"
                    .to_string(),
            )
        })?;
        Self::from_file(&path)
    }

    /// Like [`load`](Self::load), but missing files yield the defaults.
    ///
    /// An explicit path that does not exist is still an error.
    pub fn load_or_default(explicit_path: Option<&Path>) -> Result<Self> {
        match Self::resolve_config_path(explicit_path)? {
            Some(path) => Self::from_file(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            GatewayError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            GatewayError::Configuration(msg) => {
                GatewayError::Configuration(format!("{path:?}: {msg}"))
            }
            other => other,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| GatewayError::Configuration(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would stall the gateway.
    pub fn validate(&self) -> Result<()> {
        if self.performance.timeout_ms == 0 {
            return Err(GatewayError::Configuration(
                "performance.timeout_ms must be greater than zero".into(),
            ));
        }
        if self.analytics.batch_size == 0 {
            return Err(GatewayError::Configuration(
                "analytics.batch_size must be greater than zero".into(),
            ));
        }
        if self.analytics.enabled && self.analytics.flush_interval_ms == 0 {
            return Err(GatewayError::Configuration(
                "analytics.flush_interval_ms must be greater than zero".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.primary.confidence_threshold) {
            return Err(GatewayError::Configuration(
                "primary.confidence_threshold must be within 0.0..=1.0".into(),
            ));
        }
        Ok(())
    }

    fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(Some(path.to_path_buf()));
            }
            return Err(GatewayError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".vedetta").join("config.toml");
            if user_config.exists() {
                return Ok(Some(user_config));
            }
        }

        let system_config = PathBuf::from("/etc/vedetta/config.toml");
        if system_config.exists() {
            return Ok(Some(system_config));
        }
        Ok(None)
    }
}
