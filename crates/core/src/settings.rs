//! Configuration types

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{ConfigError, ConfigResult};

/// Environment variable prefix, e.g. `TOKENAGG_PORT=8080`
pub const ENV_PREFIX: &str = "TOKENAGG";

pub const DEFAULT_QUERY: &str = "SOL";

/// Browser-like identification sent upstream to avoid bot blocking
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Complete service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub default_query: String,
    pub broadcast_query: String,
    pub broadcast_interval_secs: u64,
    pub cache_ttl_secs: u64,
    pub cache_cleanup_interval_secs: u64,
    pub upstream_timeout_secs: u64,
    pub dexscreener_url: String,
    pub jupiter_url: String,
    pub user_agent: String,
    pub enrich_merge: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            default_query: DEFAULT_QUERY.to_string(),
            broadcast_query: DEFAULT_QUERY.to_string(),
            broadcast_interval_secs: 10,
            cache_ttl_secs: 30,
            cache_cleanup_interval_secs: 60,
            upstream_timeout_secs: 5,
            dexscreener_url: "https://api.dexscreener.com/latest/dex/search".to_string(),
            jupiter_url: "https://lite-api.jup.ag/tokens/v2/search".to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            enrich_merge: false,
        }
    }
}

impl AppConfig {
    /// Load from `.env` and `TOKENAGG_*` environment variables
    pub fn load() -> ConfigResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_environment(config::Environment::with_prefix(ENV_PREFIX))
    }

    pub fn from_environment(env: config::Environment) -> ConfigResult<Self> {
        let config: AppConfig = config::Config::builder()
            .add_source(env.try_parsing(true))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.default_query.trim().is_empty() {
            return Err(ConfigError::Invalid("default_query must not be empty".into()));
        }
        if self.broadcast_query.trim().is_empty() {
            return Err(ConfigError::Invalid("broadcast_query must not be empty".into()));
        }
        if self.cache_ttl_secs == 0 {
            return Err(ConfigError::Invalid("cache_ttl_secs must be positive".into()));
        }
        if self.broadcast_interval_secs == 0 || self.cache_cleanup_interval_secs == 0 {
            return Err(ConfigError::Invalid("intervals must be positive".into()));
        }
        if self.upstream_timeout_secs == 0 {
            return Err(ConfigError::Invalid("upstream_timeout_secs must be positive".into()));
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn broadcast_interval(&self) -> Duration {
        Duration::from_secs(self.broadcast_interval_secs)
    }

    pub fn cache_cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cache_cleanup_interval_secs)
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(vars: &[(&str, &str)]) -> config::Environment {
        let map: config::Map<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        config::Environment::with_prefix(ENV_PREFIX).source(Some(map))
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_environment(env(&[])).unwrap();
        assert_eq!(config.default_query, "SOL");
        assert_eq!(config.cache_ttl(), Duration::from_secs(30));
        assert_eq!(config.broadcast_interval(), Duration::from_secs(10));
        assert!(!config.enrich_merge);
    }

    #[test]
    fn test_environment_overrides() {
        let config = AppConfig::from_environment(env(&[
            ("TOKENAGG_PORT", "8081"),
            ("TOKENAGG_CACHE_TTL_SECS", "5"),
            ("TOKENAGG_ENRICH_MERGE", "true"),
        ]))
        .unwrap();

        assert_eq!(config.port, 8081);
        assert_eq!(config.cache_ttl_secs, 5);
        assert!(config.enrich_merge);
        assert_eq!(config.bind_address(), "127.0.0.1:8081");
    }

    #[test]
    fn test_zero_ttl_rejected() {
        let result = AppConfig::from_environment(env(&[("TOKENAGG_CACHE_TTL_SECS", "0")]));
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }
}
