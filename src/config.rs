//! Environment-level configuration for the cache layer.
//!
//! Defaults suit local development (local store, no auth). Production
//! deployments override through the environment:
//!
//! | Variable | Default |
//! |---|---|
//! | `CACHE_REDIS_HOST` | `localhost` |
//! | `CACHE_REDIS_PORT` | `6379` |
//! | `CACHE_REDIS_PASSWORD` | unset |
//! | `CACHE_REDIS_DB` | `0` |
//! | `CACHE_CONNECT_TIMEOUT_SECS` | `5` |
//! | `CACHE_COMMAND_TIMEOUT_SECS` | `2` |
//! | `CACHE_MAX_RETRIES` | `3` |

use std::str::FromStr;
use std::time::Duration;

#[cfg(feature = "redis")]
use crate::backend::RedisConfig;
#[cfg(feature = "redis")]
use crate::error::Result;
#[cfg(feature = "redis")]
use crate::store::CacheStore;

/// Connection and reliability tuning for the cache store.
#[derive(Clone, Debug)]
pub struct CacheConfig {
    pub host: String,
    pub port: u16,
    pub password: Option<String>,
    pub database: u32,
    pub connect_timeout: Duration,
    pub command_timeout: Duration,
    pub max_retries: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            host: "localhost".to_string(),
            port: 6379,
            password: None,
            database: 0,
            connect_timeout: Duration::from_secs(5),
            command_timeout: Duration::from_secs(2),
            max_retries: 3,
        }
    }
}

impl CacheConfig {
    /// Build configuration from the environment, falling back to defaults
    /// for anything unset or unparseable.
    pub fn from_env() -> Self {
        let defaults = CacheConfig::default();

        CacheConfig {
            host: std::env::var("CACHE_REDIS_HOST").unwrap_or(defaults.host),
            port: env_parse("CACHE_REDIS_PORT", defaults.port),
            password: std::env::var("CACHE_REDIS_PASSWORD").ok(),
            database: env_parse("CACHE_REDIS_DB", defaults.database),
            connect_timeout: Duration::from_secs(env_parse(
                "CACHE_CONNECT_TIMEOUT_SECS",
                defaults.connect_timeout.as_secs(),
            )),
            command_timeout: Duration::from_secs(env_parse(
                "CACHE_COMMAND_TIMEOUT_SECS",
                defaults.command_timeout.as_secs(),
            )),
            max_retries: env_parse("CACHE_MAX_RETRIES", defaults.max_retries),
        }
    }

    /// Translate into the Redis backend configuration.
    #[cfg(feature = "redis")]
    pub fn redis_config(&self) -> RedisConfig {
        RedisConfig {
            host: self.host.clone(),
            port: self.port,
            username: None,
            password: self.password.clone(),
            database: self.database,
            connect_timeout: self.connect_timeout,
            command_timeout: self.command_timeout,
            ..RedisConfig::default()
        }
    }

    /// Build a [`CacheStore`] over a Redis backend with this configuration.
    ///
    /// The returned store has not been probed; call
    /// [`CacheStore::connect`] during startup.
    ///
    /// # Errors
    /// Returns `Err` if pool creation fails.
    #[cfg(feature = "redis")]
    pub fn build_store(&self) -> Result<CacheStore> {
        let backend = crate::backend::RedisBackend::new(self.redis_config())?;
        Ok(CacheStore::new(backend)
            .with_connect_timeout(self.connect_timeout)
            .with_command_timeout(self.command_timeout)
            .with_max_retries(self.max_retries))
    }
}

fn env_parse<T: FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse::<T>().ok())
        .unwrap_or(default)
}
