//! Runtime settings, read from environment variables with defaults.
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | `POUR_FACADE_BUFFER` | `32` | Queued requests before callers wait |
//! | `POUR_FETCH_TIMEOUT_MS` | `10000` | Limit on each fetch and subscribe call |
//! | `POUR_STORAGE_URL` | `http://localhost:54321` | Base URL for public media |

use std::{env, fmt::Display, str::FromStr, time::Duration};
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

const BUFFER_KEY: &str = "POUR_FACADE_BUFFER";
const TIMEOUT_KEY: &str = "POUR_FETCH_TIMEOUT_MS";
const STORAGE_KEY: &str = "POUR_STORAGE_URL";

const DEFAULT_BUFFER: &str = "32";
const DEFAULT_TIMEOUT_MS: &str = "10000";
const DEFAULT_STORAGE_URL: &str = "http://localhost:54321";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid {key} value {value:?}: {reason}")]
pub struct ConfigError {
    pub key: &'static str,
    pub value: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FacadeConfig {
    /// Capacity of the request queue in front of the cache task.
    pub buffer_size: usize,
    /// Upper bound on a single fetch or subscribe call.
    pub call_timeout: Duration,
    /// Where stored drink images and avatars are served from.
    pub storage_url: Url,
}

impl Default for FacadeConfig {
    fn default() -> Self {
        Self {
            buffer_size: 32,
            call_timeout: Duration::from_secs(10),
            storage_url: Url::parse(DEFAULT_STORAGE_URL).expect("default storage url is valid"),
        }
    }
}

impl FacadeConfig {
    /// Reads the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Reads settings through `lookup`, falling back to defaults for unset keys.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let buffer_size: usize = try_load(&lookup, BUFFER_KEY, DEFAULT_BUFFER)?;
        if buffer_size == 0 {
            return Err(ConfigError {
                key: BUFFER_KEY,
                value: buffer_size.to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        let timeout_ms: u64 = try_load(&lookup, TIMEOUT_KEY, DEFAULT_TIMEOUT_MS)?;

        Ok(Self {
            buffer_size,
            call_timeout: Duration::from_millis(timeout_ms),
            storage_url: try_load(&lookup, STORAGE_KEY, DEFAULT_STORAGE_URL)?,
        })
    }
}

fn try_load<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: &str,
) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    let value = lookup(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });
    value.parse().map_err(|e: T::Err| {
        warn!("Invalid {key} value: {e}");
        ConfigError {
            key,
            reason: e.to_string(),
            value,
        }
    })
}
