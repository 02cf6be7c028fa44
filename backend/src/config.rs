use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use tracing::{info, warn};

use crate::coordinator::TallySettings;

pub const REDIS_URL: &str = "REDIS_URL";
pub const CACHE_TTL_SECS: &str = "CACHE_TTL_SECS";
pub const WRITE_BACK_TIMEOUT_SECS: &str = "WRITE_BACK_TIMEOUT_SECS";
pub const CACHE_OP_TIMEOUT_MS: &str = "CACHE_OP_TIMEOUT_MS";
pub const ALLOWED_ORIGIN: &str = "ALLOWED_ORIGIN";

const DEFAULT_CACHE_TTL_SECS: u64 = 5 * 60;
const DEFAULT_WRITE_BACK_TIMEOUT_SECS: u64 = 60;
const DEFAULT_CACHE_OP_TIMEOUT_MS: u64 = 250;
const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:8080";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
    #[error("{key} must be greater than zero")]
    Zero { key: &'static str },
}

/// Settings built once at startup and handed to the constructors that need them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub redis_url: Option<String>,
    pub cache_ttl: Duration,
    pub write_back_timeout: Duration,
    pub cache_op_timeout: Duration,
    pub allowed_origin: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            redis_url: None,
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            write_back_timeout: Duration::from_secs(DEFAULT_WRITE_BACK_TIMEOUT_SECS),
            cache_op_timeout: Duration::from_millis(DEFAULT_CACHE_OP_TIMEOUT_MS),
            allowed_origin: DEFAULT_ALLOWED_ORIGIN.into(),
        }
    }
}

impl AppConfig {
    /// Reads settings through `lookup`, normally `SecretStore::get`.
    /// Missing keys fall back to defaults; malformed ones are an error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let redis_url = lookup(REDIS_URL).filter(|url| !url.trim().is_empty());
        if redis_url.is_none() {
            warn!("{} not found - tallies will be cached in process memory", REDIS_URL);
        }

        let config = Self {
            redis_url,
            cache_ttl: Duration::from_secs(positive(&lookup, CACHE_TTL_SECS, DEFAULT_CACHE_TTL_SECS)?),
            write_back_timeout: Duration::from_secs(positive(
                &lookup,
                WRITE_BACK_TIMEOUT_SECS,
                DEFAULT_WRITE_BACK_TIMEOUT_SECS,
            )?),
            cache_op_timeout: Duration::from_millis(positive(
                &lookup,
                CACHE_OP_TIMEOUT_MS,
                DEFAULT_CACHE_OP_TIMEOUT_MS,
            )?),
            allowed_origin: lookup(ALLOWED_ORIGIN).unwrap_or_else(|| DEFAULT_ALLOWED_ORIGIN.into()),
        };

        info!(
            "Cache TTL {:?}, write-back timeout {:?}",
            config.cache_ttl, config.write_back_timeout
        );
        Ok(config)
    }

    pub fn tally_settings(&self) -> TallySettings {
        TallySettings {
            cache_ttl: self.cache_ttl,
            write_back_timeout: self.write_back_timeout,
        }
    }
}

fn parsed<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue { key, value: raw }),
        None => Ok(default),
    }
}

fn positive<F>(lookup: &F, key: &'static str, default: u64) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match parsed(lookup, key, default)? {
        0 => Err(ConfigError::Zero { key }),
        value => Ok(value),
    }
}
