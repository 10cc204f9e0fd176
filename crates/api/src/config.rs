//! Process configuration, read from the environment once at startup.
//!
//! | Variable | Default |
//! |---|---|
//! | `PORT` | `8888` |
//! | `FUNCTIONS_PREFIX` | `/.netlify/functions` |
//! | `DATABASE_URL` | unset: in-memory store |
//! | `WORKFLOW_URL` | `http://localhost:<PORT><prefix>/workflow` |
//! | `WORKFLOW_TIMEOUT_MS` | `10000` |
//! | `HUBSPOT_CLIENT_SECRET` | unset: webhook answers 503 |
//! | `APP_VERSION` | crate version |
//! | `APP_ENV` | `development` |
//! | `MAX_BODY_BYTES` | `1048576` |

use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_PORT: u16 = 8888;
pub const DEFAULT_PREFIX: &str = "/.netlify/functions";
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;
pub const DEFAULT_WORKFLOW_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be a number, got {value:?}")]
    NotANumber { name: &'static str, value: String },

    #[error("FUNCTIONS_PREFIX must start with '/' and not end with one, got {0:?}")]
    InvalidPrefix(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub port: u16,
    /// Routing prefix without a trailing slash, e.g. `/.netlify/functions`.
    pub functions_prefix: String,
    pub database_url: Option<String>,
    pub workflow_url: String,
    pub workflow_timeout: Duration,
    pub hubspot_client_secret: Option<String>,
    pub app_version: String,
    pub app_env: String,
    pub max_body_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            functions_prefix: DEFAULT_PREFIX.to_string(),
            database_url: None,
            workflow_url: default_workflow_url(DEFAULT_PORT, DEFAULT_PREFIX),
            workflow_timeout: Duration::from_millis(DEFAULT_WORKFLOW_TIMEOUT_MS),
            hubspot_client_secret: None,
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            app_env: "development".to_string(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

fn default_workflow_url(port: u16, prefix: &str) -> String {
    format!("http://localhost:{port}{prefix}/workflow")
}

fn number<T: std::str::FromStr>(name: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::NotANumber { name, value }),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let port = number("PORT", get("PORT"), defaults.port)?;
        let max_body_bytes = number("MAX_BODY_BYTES", get("MAX_BODY_BYTES"), defaults.max_body_bytes)?;
        let timeout_ms = number("WORKFLOW_TIMEOUT_MS", get("WORKFLOW_TIMEOUT_MS"), DEFAULT_WORKFLOW_TIMEOUT_MS)?;

        let functions_prefix = get("FUNCTIONS_PREFIX").unwrap_or(defaults.functions_prefix);
        if !functions_prefix.starts_with('/') || functions_prefix.ends_with('/') {
            return Err(ConfigError::InvalidPrefix(functions_prefix));
        }

        let workflow_url = get("WORKFLOW_URL").unwrap_or_else(|| default_workflow_url(port, &functions_prefix));

        Ok(Self {
            port,
            workflow_url,
            functions_prefix,
            database_url: get("DATABASE_URL"),
            workflow_timeout: Duration::from_millis(timeout_ms),
            hubspot_client_secret: get("HUBSPOT_CLIENT_SECRET"),
            app_version: get("APP_VERSION").unwrap_or(defaults.app_version),
            app_env: get("APP_ENV").unwrap_or(defaults.app_env),
            max_body_bytes,
        })
    }
}
