//! Gateway configuration.
//!
//! [`GatewayConfig`] carries the tunables shared by every deployment. It can
//! be deserialized (the daemon reads it from the `[gateway]` table of its
//! TOML file) and overridden from the environment with `DATAGATE_<KEY>`
//! variables:
//!
//! | key                         | env                                   | default |
//! |-----------------------------|---------------------------------------|---------|
//! | `rate_limit_max_requests`   | `DATAGATE_RATE_LIMIT_MAX_REQUESTS`    | 10      |
//! | `rate_limit_window_seconds` | `DATAGATE_RATE_LIMIT_WINDOW_SECONDS`  | 60      |
//! | `cache_enable`              | `DATAGATE_CACHE_ENABLE`               | true    |
//! | `cache_maxsize`             | `DATAGATE_CACHE_MAXSIZE`              | 128     |
//! | `cache_ttl_seconds`         | `DATAGATE_CACHE_TTL_SECONDS`          | 3600    |
//! | `random_delay_enable`       | `DATAGATE_RANDOM_DELAY_ENABLE`        | true    |
//! | `http_proxy`                | `DATAGATE_HTTP_PROXY`, `HTTP_PROXY`   | unset   |
//! | `https_proxy`               | `DATAGATE_HTTPS_PROXY`, `HTTPS_PROXY` | unset   |

use std::time::Duration;

use serde::Deserialize;

use crate::admission::AdmissionConfig;
use crate::cache::CacheConfig;
use crate::shaper::ProxyConfig;
use crate::{GatewayError, Result};

/// Gateway tunables.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub rate_limit_max_requests: usize,
    pub rate_limit_window_seconds: u64,
    pub cache_enable: bool,
    pub cache_maxsize: u64,
    pub cache_ttl_seconds: u64,
    pub random_delay_enable: bool,
    pub http_proxy: Option<String>,
    pub https_proxy: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            rate_limit_max_requests: 10,
            rate_limit_window_seconds: 60,
            cache_enable: true,
            cache_maxsize: 128,
            cache_ttl_seconds: 3600,
            random_delay_enable: true,
            http_proxy: None,
            https_proxy: None,
        }
    }
}

impl GatewayConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults with environment overrides applied.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Apply `DATAGATE_*` overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_lookup(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    ///
    /// Proxies already set on `self` are kept; unset ones are resolved with
    /// the [`ProxyConfig`] lookup order.
    pub fn apply_lookup(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(v) = lookup("DATAGATE_RATE_LIMIT_MAX_REQUESTS") {
            self.rate_limit_max_requests = parse_number("DATAGATE_RATE_LIMIT_MAX_REQUESTS", &v)?;
        }
        if let Some(v) = lookup("DATAGATE_RATE_LIMIT_WINDOW_SECONDS") {
            self.rate_limit_window_seconds =
                parse_number("DATAGATE_RATE_LIMIT_WINDOW_SECONDS", &v)?;
        }
        if let Some(v) = lookup("DATAGATE_CACHE_ENABLE") {
            self.cache_enable = parse_bool("DATAGATE_CACHE_ENABLE", &v)?;
        }
        if let Some(v) = lookup("DATAGATE_CACHE_MAXSIZE") {
            self.cache_maxsize = parse_number("DATAGATE_CACHE_MAXSIZE", &v)?;
        }
        if let Some(v) = lookup("DATAGATE_CACHE_TTL_SECONDS") {
            self.cache_ttl_seconds = parse_number("DATAGATE_CACHE_TTL_SECONDS", &v)?;
        }
        if let Some(v) = lookup("DATAGATE_RANDOM_DELAY_ENABLE") {
            self.random_delay_enable = parse_bool("DATAGATE_RANDOM_DELAY_ENABLE", &v)?;
        }

        let env_proxy = ProxyConfig::from_lookup(&lookup);
        if self.http_proxy.is_none() {
            self.http_proxy = env_proxy.http;
        }
        if self.https_proxy.is_none() {
            self.https_proxy = env_proxy.https;
        }
        Ok(())
    }

    /// Reject values the gateway cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.rate_limit_max_requests == 0 {
            return Err(GatewayError::Configuration(
                "rate_limit_max_requests must be at least 1".to_string(),
            ));
        }
        if self.rate_limit_window_seconds == 0 {
            return Err(GatewayError::Configuration(
                "rate_limit_window_seconds must be at least 1".to_string(),
            ));
        }
        if self.cache_enable && self.cache_maxsize == 0 {
            return Err(GatewayError::Configuration(
                "cache_maxsize must be at least 1 when caching is enabled".to_string(),
            ));
        }
        if self.cache_enable && self.cache_ttl_seconds == 0 {
            return Err(GatewayError::Configuration(
                "cache_ttl_seconds must be at least 1 when caching is enabled".to_string(),
            ));
        }
        Ok(())
    }

    pub fn admission(&self) -> AdmissionConfig {
        AdmissionConfig::new()
            .max_requests(self.rate_limit_max_requests)
            .window(Duration::from_secs(self.rate_limit_window_seconds))
    }

    /// Cache settings, or `None` when caching is disabled.
    pub fn cache(&self) -> Option<CacheConfig> {
        self.cache_enable.then(|| {
            CacheConfig::new()
                .max_entries(self.cache_maxsize)
                .ttl(Duration::from_secs(self.cache_ttl_seconds))
        })
    }

    pub fn proxy(&self) -> ProxyConfig {
        ProxyConfig {
            http: self.http_proxy.clone(),
            https: self.https_proxy.clone(),
        }
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| GatewayError::Configuration(format!("{name}: expected a number, got {raw:?}")))
}

fn parse_bool(name: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(GatewayError::Configuration(format!(
            "{name}: expected a boolean, got {raw:?}"
        ))),
    }
}
