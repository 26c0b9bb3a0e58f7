//! Process configuration read from `HOLIDAYS_*` environment variables.
//!
//! | Variable                          | Default                         |
//! |-----------------------------------|---------------------------------|
//! | `HOLIDAYS_BIND_ADDR`              | `127.0.0.1:8080`                |
//! | `HOLIDAYS_UPSTREAM_URL`           | `https://date.nager.at/api/v3`  |
//! | `HOLIDAYS_MAX_CACHE_SIZE`         | `100`                           |
//! | `HOLIDAYS_UPSTREAM_TIMEOUT_SECS`  | `10`                            |
//!
//! Log filtering is not configured here; the binary honours `RUST_LOG`.

use std::num::NonZeroUsize;
use std::time::Duration;

use thiserror::Error;

use crate::cache::DEFAULT_CAPACITY;
use crate::provider::nager::DEFAULT_BASE_URL;

pub const BIND_ADDR_VAR: &str = "HOLIDAYS_BIND_ADDR";
pub const UPSTREAM_URL_VAR: &str = "HOLIDAYS_UPSTREAM_URL";
pub const MAX_CACHE_SIZE_VAR: &str = "HOLIDAYS_MAX_CACHE_SIZE";
pub const UPSTREAM_TIMEOUT_VAR: &str = "HOLIDAYS_UPSTREAM_TIMEOUT_SECS";

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";
const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {var}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: &'static str,
    },
}

/// Runtime settings for the holiday service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Address the HTTP server binds to.
    pub bind_addr: String,
    /// Base URL of the Nager.Date API, without a trailing slash.
    pub upstream_url: String,
    /// Most (year, country) entries the holiday cache keeps.
    pub max_cache_size: NonZeroUsize,
    /// Per-request timeout for upstream calls.
    pub upstream_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_owned(),
            upstream_url: DEFAULT_BASE_URL.to_owned(),
            max_cache_size: DEFAULT_CAPACITY,
            upstream_timeout: DEFAULT_UPSTREAM_TIMEOUT,
        }
    }
}

impl Config {
    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for a value that cannot be used.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Reads the configuration through `lookup`, falling back to defaults for
    /// unset or blank variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for a value that cannot be used.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| {
            lookup(var)
                .map(|v| v.trim().to_owned())
                .filter(|v| !v.is_empty())
        };
        let mut config = Self::default();

        if let Some(addr) = get(BIND_ADDR_VAR) {
            config.bind_addr = addr;
        }

        if let Some(url) = get(UPSTREAM_URL_VAR) {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::Invalid {
                    var: UPSTREAM_URL_VAR,
                    value: url,
                    reason: "expected an http:// or https:// URL",
                });
            }
            config.upstream_url = url.trim_end_matches('/').to_owned();
        }

        if let Some(raw) = get(MAX_CACHE_SIZE_VAR) {
            config.max_cache_size = parse_positive(MAX_CACHE_SIZE_VAR, raw)?;
        }

        if let Some(raw) = get(UPSTREAM_TIMEOUT_VAR) {
            let secs = parse_positive(UPSTREAM_TIMEOUT_VAR, raw)?;
            config.upstream_timeout = Duration::from_secs(secs.get() as u64);
        }

        Ok(config)
    }
}

fn parse_positive(var: &'static str, raw: String) -> Result<NonZeroUsize, ConfigError> {
    raw.parse::<NonZeroUsize>().map_err(|_| ConfigError::Invalid {
        var,
        value: raw,
        reason: "expected a positive integer",
    })
}
