use std::time::Duration;

use serde::Deserialize;

use crate::domain::cache::{CacheKeyBuilder, DEFAULT_SEPARATOR};
use crate::domain::DomainError;
use crate::infrastructure::cache::{InMemoryQueryCache, InMemoryQueryCacheConfig};

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub cache: CacheSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Settings for the in-memory query cache
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// TTL used by `tag` when none is given
    pub default_ttl_secs: u64,
    /// Interval of the background purge; `0` disables it
    pub sweep_interval_secs: u64,
    /// Separator between key segments
    pub key_separator: char,
    pub eager_eviction: bool,
    pub initial_capacity: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            default_ttl_secs: 60,
            sweep_interval_secs: 0,
            key_separator: DEFAULT_SEPARATOR,
            eager_eviction: true,
            initial_capacity: 1_024,
        }
    }
}

impl CacheSettings {
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }

    pub fn sweep_interval(&self) -> Option<Duration> {
        (self.sweep_interval_secs > 0).then(|| Duration::from_secs(self.sweep_interval_secs))
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.default_ttl_secs == 0 {
            return Err(DomainError::configuration(
                "cache.default_ttl_secs must be greater than zero",
            ));
        }

        if self.key_separator.is_whitespace() || self.key_separator == '\\' {
            return Err(DomainError::configuration(format!(
                "cache.key_separator '{}' is not allowed",
                self.key_separator.escape_default()
            )));
        }

        Ok(())
    }

    /// Key builder using the configured separator
    pub fn key_builder(&self) -> CacheKeyBuilder {
        CacheKeyBuilder::with_separator(self.key_separator)
    }

    pub fn build_cache(&self) -> Result<InMemoryQueryCache, DomainError> {
        self.validate()?;

        Ok(InMemoryQueryCache::with_config(
            InMemoryQueryCacheConfig::default()
                .with_eager_eviction(self.eager_eviction)
                .with_initial_capacity(self.initial_capacity),
        ))
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
