//! Environment-driven configuration for the Redis connection and the store.
//!
//! Both loaders read through a lookup function, so tests can feed them a map
//! instead of the process environment. Unset variables fall back to defaults;
//! set but malformed ones are errors.

use std::str::FromStr;
use std::time::Duration;

use crate::store::{DEFAULT_KEY_PREFIX, DEFAULT_MAX_AGE, StoreOptions};

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum Error {
    #[error("invalid value `{value}` for {var}")]
    Invalid { var: &'static str, value: String },

    #[error("{0}")]
    Unsupported(String),
}

type Result<T> = std::result::Result<T, Error>;

fn parse<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>> {
    match lookup(var).map(|value| value.trim().to_string()) {
        None => Ok(None),
        Some(value) if value.is_empty() => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| Error::Invalid { var, value }),
    }
}

fn non_empty(lookup: &impl Fn(&str) -> Option<String>, var: &str) -> Option<String> {
    lookup(var).filter(|value| !value.trim().is_empty())
}

fn env(var: &str) -> Option<String> {
    std::env::var(var).ok()
}

/// Connection settings for the Redis server holding the sessions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RedisConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub database: u8,
    pub tls: bool,
    /// Connections reserved for `WATCH`..`EXEC` transactions.
    pub watch_pool_size: usize,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 6379,
            username: None,
            password: None,
            database: 0,
            tls: false,
            watch_pool_size: 4,
        }
    }
}

impl RedisConfig {
    /// Reads `REDIS_HOST`, `REDIS_PORT`, `REDIS_USERNAME`, `REDIS_PASSWORD`,
    /// `REDIS_DATABASE`, `REDIS_SSL_ENABLE` and `REDIS_WATCH_POOL_SIZE`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(env)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        Ok(Self {
            host: non_empty(&lookup, "REDIS_HOST").unwrap_or(defaults.host),
            port: parse(&lookup, "REDIS_PORT")?.unwrap_or(defaults.port),
            username: non_empty(&lookup, "REDIS_USERNAME"),
            password: non_empty(&lookup, "REDIS_PASSWORD"),
            database: parse(&lookup, "REDIS_DATABASE")?.unwrap_or(defaults.database),
            tls: parse(&lookup, "REDIS_SSL_ENABLE")?.unwrap_or(defaults.tls),
            watch_pool_size: match parse(&lookup, "REDIS_WATCH_POOL_SIZE")? {
                Some(0) => {
                    return Err(Error::Invalid {
                        var: "REDIS_WATCH_POOL_SIZE",
                        value: "0".to_string(),
                    });
                }
                Some(size) => size,
                None => defaults.watch_pool_size,
            },
        })
    }
}

#[cfg(feature = "redis-store")]
impl RedisConfig {
    /// Builds the `fred` client configuration.
    pub fn to_fred(&self) -> Result<fred::types::config::Config> {
        use fred::types::config::{Config, ServerConfig};

        let mut config = Config {
            server: ServerConfig::new_centralized(self.host.as_str(), self.port),
            username: self.username.clone(),
            password: self.password.clone(),
            database: Some(self.database),
            ..Default::default()
        };

        if self.tls {
            enable_tls(&mut config)?;
        }

        Ok(config)
    }

    /// Connects a new client to the configured server.
    ///
    /// The returned client belongs to the caller, which is expected to
    /// `quit` it on shutdown.
    pub async fn connect(&self) -> std::result::Result<fred::clients::Client, crate::cache::Error> {
        use fred::interfaces::ClientLike;

        let config = self
            .to_fred()
            .map_err(|err| crate::cache::Error::Backend(err.to_string()))?;
        let client = fred::types::Builder::from_config(config).build()?;
        client.init().await?;

        tracing::debug!(host = %self.host, port = self.port, "connected to redis");

        Ok(client)
    }

    /// Connects a [`RedisCache`](crate::cache::redis::RedisCache): one client
    /// for plain commands plus `watch_pool_size` connections for transactions.
    pub async fn connect_cache(
        &self,
    ) -> std::result::Result<crate::cache::redis::RedisCache, crate::cache::Error> {

        let client = self.connect().await?;
        let config = self
            .to_fred()
            .map_err(|err| crate::cache::Error::Backend(err.to_string()))?;
        let watchers =
            fred::types::Builder::from_config(config).build_exclusive_pool(self.watch_pool_size)?;
        watchers.init().await?;

        tracing::debug!(size = self.watch_pool_size, "connected redis watch pool");

        Ok(crate::cache::redis::RedisCache::new(client, watchers))
    }
}

#[cfg(feature = "redis-tls")]
fn enable_tls(config: &mut fred::types::config::Config) -> Result<()> {
    let connector = fred::types::config::TlsConnector::default_rustls()
        .map_err(|err| Error::Unsupported(format!("failed to set up TLS: {err}")))?;
    config.tls = Some(connector.into());

    Ok(())
}

#[cfg(all(feature = "redis-store", not(feature = "redis-tls")))]
fn enable_tls(_config: &mut fred::types::config::Config) -> Result<()> {
    Err(Error::Unsupported(
        "REDIS_SSL_ENABLE requires the `redis-tls` feature".to_string(),
    ))
}

/// Reads `SESSION_KEY_PREFIX`, `SESSION_MAX_AGE_SECS` and `SESSION_TIMEOUT_MS`
/// into [`StoreOptions`].
pub fn store_options_from_env() -> Result<StoreOptions> {
    store_options_from_lookup(env)
}

pub fn store_options_from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<StoreOptions> {
    let mut options = StoreOptions::build()
        .key_prefix(
            non_empty(&lookup, "SESSION_KEY_PREFIX").unwrap_or_else(|| DEFAULT_KEY_PREFIX.to_string()),
        )
        .max_age(
            parse(&lookup, "SESSION_MAX_AGE_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_MAX_AGE),
        );

    // Redis expiries are whole milliseconds that must fit an i64.
    if options.max_age < Duration::from_millis(1)
        || options.max_age.as_millis() > i64::MAX as u128
    {
        return Err(Error::Invalid {
            var: "SESSION_MAX_AGE_SECS",
            value: options.max_age.as_secs().to_string(),
        });
    }

    if let Some(millis) = parse(&lookup, "SESSION_TIMEOUT_MS")? {
        options = options.timeout(Duration::from_millis(millis));
    }

    Ok(options)
}
