//! HTTP transport for the sync API.

use std::time::Duration;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::{SessionTransport, SyncFragment, SyncState, SyncTransport};
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::util::{compact_text, normalize_text_option};

/// Sync client authenticated with a session key
#[derive(Clone)]
pub struct HttpSyncClient {
    base_url: String,
    session_key: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for HttpSyncClient {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("HttpSyncClient")
            .field("base_url", &self.base_url)
            .field("session_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl HttpSyncClient {
    pub fn new(config: &ClientConfig, session_key: impl Into<String>) -> Result<Self> {
        let session_key = normalize_text_option(Some(session_key.into())).ok_or_else(|| {
            Error::InvalidInput("session key must not be empty; log in first".to_string())
        })?;
        let base_url = config.normalized_api_base_url()?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            base_url,
            session_key,
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let response = self
            .client
            .get(self.url(path))
            .query(query)
            .bearer_auth(&self.session_key)
            .header("Accept", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Transport(parse_api_error(status, &body)));
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|error| {
            Error::Transport(format!(
                "invalid response from {path}: {error}: {}",
                compact_text(&body)
            ))
        })
    }
}

#[derive(Debug, Deserialize)]
struct FragmentResponse {
    fragment: SyncFragment,
}

impl SyncTransport for HttpSyncClient {
    async fn sync_state(&self) -> Result<SyncState> {
        self.get("/v1/sync/state", &[]).await
    }

    async fn sync_fragment(&self, after_usn: i64) -> Result<SyncFragment> {
        let response: FragmentResponse = self
            .get("/v1/sync/fragment", &[("after_usn", after_usn.to_string())])
            .await?;
        Ok(response.fragment)
    }
}

impl SessionTransport for HttpSyncClient {
    async fn signout(&self) -> Result<()> {
        let response = self
            .client
            .post(self.url(SIGNOUT_PATH))
            .bearer_auth(&self.session_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Transport(parse_api_error(status, &body)));
        }
        Ok(())
    }
}

const SIGNOUT_PATH: &str = "/v1/signout";

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    message: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(message) = payload.message.or(payload.error) {
            return format!("{} ({})", message.trim(), status.as_u16());
        }
    }

    let trimmed = compact_text(body);
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", trimmed, status.as_u16())
    }
}
