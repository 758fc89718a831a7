//! HTTP adapter configuration.
//!
//! Every field has a default, so an empty document (or no environment at all)
//! yields a working configuration for the public Wikimedia wikis.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const ENV_SCHEME: &str = "MWFETCH_SCHEME";
const ENV_API_PATH: &str = "MWFETCH_API_PATH";
const ENV_USER_AGENT: &str = "MWFETCH_USER_AGENT";
const ENV_TIMEOUT_SECS: &str = "MWFETCH_TIMEOUT_SECS";
const ENV_CONNECT_TIMEOUT_SECS: &str = "MWFETCH_CONNECT_TIMEOUT_SECS";

/// Settings for [`ReqwestTransport`](crate::ReqwestTransport) and
/// [`MediaWikiEndpoints`](crate::MediaWikiEndpoints).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// URL scheme, `https` or `http`.
    pub scheme: String,
    /// Path of the API entry point on every host.
    pub api_path: String,
    /// `User-Agent` header sent with every request.
    pub user_agent: String,
    /// Whole-request deadline in seconds.
    pub timeout_secs: u64,
    /// Connection establishment deadline in seconds.
    pub connect_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            scheme: "https".to_string(),
            api_path: "/w/api.php".to_string(),
            user_agent: concat!("mwfetch/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout_secs: 30,
            connect_timeout_secs: 10,
        }
    }
}

/// A configuration value could not be used.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be a whole number of seconds, got '{value}'")]
    InvalidSeconds { name: &'static str, value: String },

    #[error("{name} must be 'http' or 'https', got '{value}'")]
    InvalidScheme { name: &'static str, value: String },
}

impl HttpConfig {
    /// Defaults overlaid with any `MWFETCH_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults overlaid with the values `lookup` returns for each variable name.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(scheme) = lookup(ENV_SCHEME) {
            config.scheme = scheme;
        }
        if let Some(path) = lookup(ENV_API_PATH) {
            config.api_path = path;
        }
        if let Some(agent) = lookup(ENV_USER_AGENT) {
            config.user_agent = agent;
        }
        if let Some(value) = lookup(ENV_TIMEOUT_SECS) {
            config.timeout_secs = parse_seconds(ENV_TIMEOUT_SECS, value)?;
        }
        if let Some(value) = lookup(ENV_CONNECT_TIMEOUT_SECS) {
            config.connect_timeout_secs = parse_seconds(ENV_CONNECT_TIMEOUT_SECS, value)?;
        }
        config.validate()?;
        Ok(config)
    }

    /// Checks the values a deserialised or hand-built config may get wrong.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scheme != "https" && self.scheme != "http" {
            return Err(ConfigError::InvalidScheme {
                name: ENV_SCHEME,
                value: self.scheme.clone(),
            });
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

fn parse_seconds(name: &'static str, value: String) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidSeconds { name, value })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let config = HttpConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, HttpConfig::default());
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert!(config.user_agent.starts_with("mwfetch/"));
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = HttpConfig::from_lookup(lookup_from(&[
            ("MWFETCH_SCHEME", "http"),
            ("MWFETCH_API_PATH", "/api.php"),
            ("MWFETCH_TIMEOUT_SECS", " 5 "),
        ]))
        .unwrap();
        assert_eq!(config.scheme, "http");
        assert_eq!(config.api_path, "/api.php");
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.connect_timeout_secs, 10);
    }

    #[test]
    fn bad_numbers_are_reported() {
        let err = HttpConfig::from_lookup(lookup_from(&[("MWFETCH_CONNECT_TIMEOUT_SECS", "soon")]))
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidSeconds {
                name: "MWFETCH_CONNECT_TIMEOUT_SECS",
                value: "soon".to_string()
            }
        );
    }

    #[test]
    fn unknown_scheme_is_rejected() {
        let err = HttpConfig::from_lookup(lookup_from(&[("MWFETCH_SCHEME", "ftp")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidScheme { .. }));
    }

    #[test]
    fn partial_json_document_keeps_defaults() {
        let config: HttpConfig = serde_json::from_str(r#"{"timeout_secs": 3}"#).unwrap();
        assert_eq!(config.timeout_secs, 3);
        assert_eq!(config.api_path, "/w/api.php");
    }
}
