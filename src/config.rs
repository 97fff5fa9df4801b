//! Configuration
//!
//! Read from `$MSGRAPH_MCP_CONFIG` or `~/.config/msgraph-mcp/config.toml`:
//!
//! ```toml
//! [graph]
//! endpoint = "https://graph.microsoft.com/v1.0"
//! max_retries = 3
//! retry_delay_ms = 1000
//! timeout_secs = 60
//!
//! [auth]
//! token_path = "~/.msgraph-mcp-token.json"
//! ```
//!
//! Every field is optional. `MS_GRAPH_ENDPOINT` and `MS_GRAPH_TOKEN_PATH`
//! override the file.

use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const CONFIG_ENV: &str = "MSGRAPH_MCP_CONFIG";
pub const ENDPOINT_ENV: &str = "MS_GRAPH_ENDPOINT";
pub const TOKEN_PATH_ENV: &str = "MS_GRAPH_TOKEN_PATH";

const DEFAULT_ENDPOINT: &str = "https://graph.microsoft.com/v1.0";
const DEFAULT_TOKEN_FILE: &str = ".msgraph-mcp-token.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// `[graph]` section
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GraphSection {
    pub endpoint: String,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub timeout_secs: u64,
}

impl Default for GraphSection {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            max_retries: 3,
            retry_delay_ms: 1000,
            timeout_secs: 60,
        }
    }
}

/// `[auth]` section
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AuthSection {
    /// Token file written by the sign-in tool
    pub token_path: Option<String>,
}

/// Configuration file contents
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub graph: GraphSection,
    pub auth: AuthSection,
}

/// Validated settings used to build the server
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub endpoint: String,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub timeout: Duration,
    pub token_path: PathBuf,
}

impl Config {
    /// `~/.config/msgraph-mcp/config.toml` (platform config dir)
    pub fn default_config_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from(".config"));
        path.push("msgraph-mcp");
        path.push("config.toml");
        path
    }

    /// Load from `$MSGRAPH_MCP_CONFIG` or the default path, then apply
    /// environment overrides. A missing default file yields defaults.
    pub fn load_default() -> Result<Self, ConfigError> {
        let mut config = match env::var(CONFIG_ENV) {
            Ok(path) if !path.trim().is_empty() => Self::from_file(Path::new(path.trim()))?,
            _ => {
                let path = Self::default_config_path();
                if path.exists() {
                    Self::from_file(&path)?
                } else {
                    tracing::debug!(
                        "Config file not found at {}, using defaults",
                        path.display()
                    );
                    Self::default()
                }
            }
        };

        config.apply_env_overrides(|name| env::var(name).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        tracing::info!("Loading config from {}", path.display());
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Apply `MS_GRAPH_ENDPOINT` / `MS_GRAPH_TOKEN_PATH` as returned by `lookup`.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(endpoint) = lookup(ENDPOINT_ENV).filter(|v| !v.trim().is_empty()) {
            self.graph.endpoint = endpoint.trim().to_string();
        }
        if let Some(path) = lookup(TOKEN_PATH_ENV).filter(|v| !v.trim().is_empty()) {
            self.auth.token_path = Some(path.trim().to_string());
        }
    }

    /// Validate and resolve into [`RuntimeConfig`]
    pub fn to_runtime(&self) -> Result<RuntimeConfig, ConfigError> {
        let endpoint = self.graph.endpoint.trim().trim_end_matches('/');
        let url = reqwest::Url::parse(endpoint).map_err(|e| {
            ConfigError::Validation(format!("graph.endpoint '{}' is not a URL: {}", endpoint, e))
        })?;
        if url.scheme() != "https" && url.scheme() != "http" {
            return Err(ConfigError::Validation(format!(
                "graph.endpoint must use http or https, got '{}'",
                url.scheme()
            )));
        }

        if self.graph.max_retries < 1 {
            return Err(ConfigError::Validation(
                "graph.max_retries must be at least 1".to_string(),
            ));
        }
        if self.graph.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "graph.timeout_secs must be positive".to_string(),
            ));
        }

        let home = dirs::home_dir();
        let token_path = match self.auth.token_path.as_deref() {
            Some(path) => expand_home(path, home.as_deref()),
            None => home
                .map(|h| h.join(DEFAULT_TOKEN_FILE))
                .ok_or_else(|| {
                    ConfigError::Validation(
                        "auth.token_path is not set and no home directory was found".to_string(),
                    )
                })?,
        };

        Ok(RuntimeConfig {
            endpoint: endpoint.to_string(),
            max_retries: self.graph.max_retries,
            retry_delay_ms: self.graph.retry_delay_ms,
            timeout: Duration::from_secs(self.graph.timeout_secs),
            token_path,
        })
    }
}

fn expand_home(path: &str, home: Option<&Path>) -> PathBuf {
    match (path.strip_prefix("~/"), home) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
