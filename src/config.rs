use std::{env, net::SocketAddr, time::Duration};

use dotenv::dotenv;
use thiserror::Error;

const DEFAULT_ACCESS_TTL_SECS: u64 = 15 * 60;
const DEFAULT_REFRESH_TTL_SECS: u64 = 7 * 24 * 60 * 60;
const DEFAULT_STORE_TIMEOUT_MS: u64 = 2_000;
const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";
const DEFAULT_DATABASE_URL: &str = "sqlite:users.db?mode=rwc";
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} has an invalid value: {value}")]
    Invalid { key: &'static str, value: String },

    #[error("ACCESS_SECRET and REFRESH_SECRET must differ")]
    SharedSecret,

    #[error("access token TTL must not exceed refresh token TTL")]
    TtlOrder,
}

/// Signing secrets and lifetimes consumed by the session subsystem.
/// Read-only once the server is up.
#[derive(Clone)]
pub struct AuthConfig {
    pub access_secret: String,
    pub refresh_secret: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

impl AuthConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.access_secret.is_empty() {
            return Err(ConfigError::Missing("ACCESS_SECRET"));
        }
        if self.refresh_secret.is_empty() {
            return Err(ConfigError::Missing("REFRESH_SECRET"));
        }
        if self.access_secret == self.refresh_secret {
            return Err(ConfigError::SharedSecret);
        }
        if self.access_ttl < Duration::from_secs(1) {
            return Err(ConfigError::Invalid {
                key: "ACCESS_TOKEN_TTL_SECS",
                value: self.access_ttl.as_secs().to_string(),
            });
        }
        if self.refresh_ttl < Duration::from_secs(1) {
            return Err(ConfigError::Invalid {
                key: "REFRESH_TOKEN_TTL_SECS",
                value: self.refresh_ttl.as_secs().to_string(),
            });
        }
        if self.access_ttl > self.refresh_ttl {
            return Err(ConfigError::TtlOrder);
        }
        Ok(())
    }
}

// Secrets stay out of logs.
impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Redis,
    Memory,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub auth: AuthConfig,
    pub store_backend: StoreBackend,
    pub redis_url: String,
    pub store_timeout: Duration,
    pub database_url: String,
    pub bind_addr: SocketAddr,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup, so tests don't have to
    /// mutate the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.is_empty());

        let auth = AuthConfig {
            access_secret: get("ACCESS_SECRET").ok_or(ConfigError::Missing("ACCESS_SECRET"))?,
            refresh_secret: get("REFRESH_SECRET").ok_or(ConfigError::Missing("REFRESH_SECRET"))?,
            access_ttl: Duration::from_secs(parse_or(
                "ACCESS_TOKEN_TTL_SECS",
                get("ACCESS_TOKEN_TTL_SECS"),
                DEFAULT_ACCESS_TTL_SECS,
            )?),
            refresh_ttl: Duration::from_secs(parse_or(
                "REFRESH_TOKEN_TTL_SECS",
                get("REFRESH_TOKEN_TTL_SECS"),
                DEFAULT_REFRESH_TTL_SECS,
            )?),
        };
        auth.validate()?;

        let store_backend = match get("SESSION_STORE").as_deref() {
            None | Some("redis") => StoreBackend::Redis,
            Some("memory") => StoreBackend::Memory,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: "SESSION_STORE",
                    value: other.to_string(),
                });
            }
        };

        let bind_addr = get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_addr.parse().map_err(|_| ConfigError::Invalid {
            key: "BIND_ADDR",
            value: bind_addr.clone(),
        })?;

        Ok(Self {
            auth,
            store_backend,
            redis_url: get("REDIS_URL").unwrap_or_else(|| DEFAULT_REDIS_URL.to_string()),
            store_timeout: Duration::from_millis(parse_or(
                "STORE_TIMEOUT_MS",
                get("STORE_TIMEOUT_MS"),
                DEFAULT_STORE_TIMEOUT_MS,
            )?),
            database_url: get("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            bind_addr,
        })
    }
}

fn parse_or(key: &'static str, value: Option<String>, default: u64) -> Result<u64, ConfigError> {
    match value {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
    }
}
