//! Configuration loading for datagated.
//!
//! Configuration is loaded from TOML files with the following resolution order:
//! 1. `--config <path>` (CLI flag)
//! 2. `~/.datagate/config.toml` (user)
//! 3. `/etc/datagate/config.toml` (system)
//!
//! With no file at all the daemon starts on defaults with an empty
//! capability set. `DATAGATE_*` environment variables override the
//! `[gateway]` table after loading.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::GatewayConfig;
use crate::provider::{HttpJsonOperation, OperationRegistry};
use crate::{GatewayError, Result};

/// Server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    /// Operations served by the daemon, keyed by identifier.
    #[serde(default)]
    pub operations: BTreeMap<String, OperationConfig>,
}

/// Server network configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address to bind to (default: 127.0.0.1:8080).
    #[serde(default = "default_address")]
    pub address: String,
    /// Deadline for one invocation in seconds, admission wait included
    /// (default: 300).
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            request_timeout_secs: default_timeout(),
        }
    }
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn default_address() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_timeout() -> u64 {
    300
}

/// An upstream JSON endpoint exposed as an operation.
#[derive(Debug, Clone, Deserialize)]
pub struct OperationConfig {
    pub url: String,
    /// Accepted argument names. Unset accepts anything.
    #[serde(default)]
    pub params: Option<Vec<String>>,
    #[serde(default)]
    pub description: Option<String>,
}

impl OperationConfig {
    fn to_operation(&self) -> HttpJsonOperation {
        let mut op = HttpJsonOperation::new(&self.url);
        if let Some(params) = &self.params {
            op = op.params(params.iter().cloned());
        }
        if let Some(description) = &self.description {
            op = op.description(description);
        }
        op
    }
}

impl Config {
    /// Load configuration from the standard locations.
    ///
    /// Resolution order:
    /// 1. Explicit path (if provided, must exist)
    /// 2. `~/.datagate/config.toml`
    /// 3. `/etc/datagate/config.toml`
    /// 4. Built-in defaults
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        match Self::resolve_config_path(explicit_path)? {
            Some(path) => Self::load_from_file(&path),
            None => Ok(Self::default()),
        }
    }

    /// Parse a specific file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            GatewayError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            GatewayError::Configuration(format!("Failed to parse config file {path:?}: {e}"))
        })
    }

    /// Resolve the config file path.
    fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(Some(path.to_path_buf()));
            }
            return Err(GatewayError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        // User config
        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".datagate").join("config.toml");
            if user_config.exists() {
                return Ok(Some(user_config));
            }
        }

        // System config
        let system_config = PathBuf::from("/etc/datagate/config.toml");
        if system_config.exists() {
            return Ok(Some(system_config));
        }

        Ok(None)
    }

    /// Registry holding one [`HttpJsonOperation`] per `[operations.*]` table.
    pub fn registry(&self) -> OperationRegistry {
        let registry = OperationRegistry::new("config");
        for (id, op) in &self.operations {
            registry.register(id.clone(), op.to_operation());
        }
        registry
    }
}
