//! Client configuration for reaching the sync server.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::util::{is_http_url, normalize_text_option};

pub const API_URL_ENV: &str = "QUIRE_API_URL";
pub const REQUEST_TIMEOUT_ENV: &str = "QUIRE_REQUEST_TIMEOUT_SECS";

const DEFAULT_API_BASE_URL: &str = "http://localhost:3000";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Endpoint and transport settings. Secrets never live here; the session
/// key is kept in the local bookmark.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl ClientConfig {
    /// Load from `QUIRE_API_URL` and `QUIRE_REQUEST_TIMEOUT_SECS`, falling
    /// back to defaults for unset variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(url) = normalize_text_option(lookup(API_URL_ENV)) {
            config.api_base_url = url;
        }
        if let Some(raw) = normalize_text_option(lookup(REQUEST_TIMEOUT_ENV)) {
            config.request_timeout_secs = raw.parse().map_err(|_| {
                Error::InvalidInput(format!(
                    "{REQUEST_TIMEOUT_ENV} must be a whole number of seconds, got '{raw}'"
                ))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Parse a JSON config document
    pub fn from_json(payload: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(payload)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.normalized_api_base_url()?;
        if self.request_timeout_secs == 0 {
            return Err(Error::InvalidInput(
                "request timeout must be at least one second".to_string(),
            ));
        }
        Ok(())
    }

    /// API base URL without surrounding whitespace or trailing slashes
    pub fn normalized_api_base_url(&self) -> Result<String> {
        let url = normalize_text_option(Some(self.api_base_url.clone()))
            .ok_or_else(|| Error::InvalidInput("api_base_url is required".to_string()))?;
        if !is_http_url(&url) {
            return Err(Error::InvalidInput(
                "api_base_url must include http:// or https://".to_string(),
            ));
        }
        Ok(url.trim_end_matches('/').to_string())
    }
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

const fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn from_lookup_uses_defaults() {
        let config = ClientConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn from_lookup_reads_overrides() {
        let config = ClientConfig::from_lookup(lookup(&[
            (API_URL_ENV, " https://sync.example.com/ "),
            (REQUEST_TIMEOUT_ENV, "7"),
        ]))
        .unwrap();

        assert_eq!(config.api_base_url, "https://sync.example.com/");
        assert_eq!(config.request_timeout_secs, 7);
        assert_eq!(
            config.normalized_api_base_url().unwrap(),
            "https://sync.example.com"
        );
    }

    #[test]
    fn from_lookup_rejects_bad_values() {
        assert!(ClientConfig::from_lookup(lookup(&[(API_URL_ENV, "sync.example.com")])).is_err());
        assert!(ClientConfig::from_lookup(lookup(&[(REQUEST_TIMEOUT_ENV, "soon")])).is_err());
        assert!(ClientConfig::from_lookup(lookup(&[(REQUEST_TIMEOUT_ENV, "0")])).is_err());
    }

    #[test]
    fn from_json_rejects_unknown_fields() {
        let error = ClientConfig::from_json(r#"{"api_base_url": "https://a.example", "extra": 1}"#)
            .unwrap_err();
        assert!(error.to_string().contains("unknown field"));
    }

    #[test]
    fn from_json_fills_defaults() {
        let config = ClientConfig::from_json(r#"{"api_base_url": "https://a.example"}"#).unwrap();
        assert_eq!(config.request_timeout_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
    }
}
