//! Dynamic Content management API client.
//!
//! Authenticates with the OAuth2 client-credentials grant and caches the
//! access token until shortly before it expires. The client is cheap to clone
//! and is shared across requests.

use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{info, warn};
use url::Url;

use super::{ContentError, ContentItem, ContentSource};
use crate::webhook::Snapshot;

/// Refresh the token this long before the server says it expires.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(30);

/// Lifetime assumed when the token response omits `expires_in`.
const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(300);

/// How a snapshot is turned into a content item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResolutionStrategy {
    /// Fetch the root content item by id.
    #[default]
    Direct,
    /// Look the snapshot up first, then fetch the content item version
    /// captured by that snapshot.
    Snapshot,
}

impl FromStr for ResolutionStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "direct" => Ok(Self::Direct),
            "snapshot" => Ok(Self::Snapshot),
            other => Err(format!("unknown content resolution strategy '{other}'")),
        }
    }
}

/// Connection settings for the Dynamic Content API.
#[derive(Debug, Clone)]
pub struct DynamicContentSettings {
    pub client_id: String,
    pub client_secret: String,
    /// OAuth server base, e.g. `https://auth.amplience.net`
    pub auth_url: Url,
    /// Content API base, e.g. `https://api.amplience.net/v2/content`
    pub api_url: Url,
    pub strategy: ResolutionStrategy,
    pub request_timeout: Duration,
}

/// Dynamic Content API client with token caching.
#[derive(Clone)]
pub struct DynamicContentClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http: Client,
    settings: DynamicContentSettings,
    token: RwLock<Option<AccessToken>>,
}

#[derive(Clone)]
struct AccessToken {
    value: String,
    expires_at: Instant,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

impl DynamicContentClient {
    /// Create a client; no network traffic happens until the first request.
    pub fn new(settings: DynamicContentSettings) -> Result<Self, ContentError> {
        let http = Client::builder()
            .timeout(settings.request_timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(ClientInner {
                http,
                settings,
                token: RwLock::new(None),
            }),
        })
    }

    /// Return a valid access token, fetching a new one if needed.
    async fn access_token(&self) -> Result<String, ContentError> {
        {
            let token = self.inner.token.read().await;
            if let Some(t) = token.as_ref() {
                if t.expires_at > Instant::now() {
                    return Ok(t.value.clone());
                }
            }
        }

        let mut token = self.inner.token.write().await;

        // Another request may have refreshed it while we waited
        if let Some(t) = token.as_ref() {
            if t.expires_at > Instant::now() {
                return Ok(t.value.clone());
            }
        }

        info!("dc_token_requesting");

        let url = endpoint(&self.inner.settings.auth_url, &["oauth", "token"])?;
        let response = self
            .inner
            .http
            .post(url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.inner.settings.client_id.as_str()),
                ("client_secret", self.inner.settings.client_secret.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            warn!(status = status, "dc_token_rejected");
            return Err(ContentError::Auth(format!(
                "Request failed with status code {status}: {body}"
            )));
        }

        let parsed: TokenResponse = response.json().await?;
        let lifetime = parsed
            .expires_in
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TOKEN_LIFETIME)
            .saturating_sub(TOKEN_EXPIRY_MARGIN);

        info!(expires_in_seconds = lifetime.as_secs(), "dc_token_acquired");

        *token = Some(AccessToken {
            value: parsed.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });

        Ok(parsed.access_token)
    }

    async fn forget_token(&self) {
        *self.inner.token.write().await = None;
    }

    /// Authenticated GET against the content API.
    async fn get_json<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, &str)],
    ) -> Result<T, ContentError> {
        let token = self.access_token().await?;
        let url = endpoint(&self.inner.settings.api_url, segments)?;

        let response = self
            .inner
            .http
            .get(url.clone())
            .query(query)
            .bearer_auth(token)
            .send()
            .await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            // Force a fresh token on the next call; this one is not retried
            self.forget_token().await;
        }

        read_json(response, &url).await
    }

    /// Fetch the current version of a content item.
    pub async fn fetch_content_item(&self, content_item_id: &str) -> Result<ContentItem, ContentError> {
        self.get_json(&["content-items", content_item_id], &[]).await
    }

    /// Fetch a snapshot by id.
    pub async fn fetch_snapshot(&self, snapshot_id: &str) -> Result<Snapshot, ContentError> {
        self.get_json(&["snapshots", snapshot_id], &[]).await
    }

    /// Fetch a content item as captured by a snapshot.
    pub async fn fetch_snapshot_content_item(
        &self,
        snapshot_id: &str,
        content_item_id: &str,
    ) -> Result<ContentItem, ContentError> {
        self.get_json(&["snapshots", snapshot_id, "content-items", content_item_id], &[])
            .await
    }

    /// Confirm the credentials can obtain a token and read hubs.
    pub async fn verify_credentials(&self) -> Result<(), ContentError> {
        let _: serde_json::Value = self
            .get_json(&["hubs"], &[("page", "0"), ("size", "1")])
            .await?;
        info!("dc_credentials_verified");
        Ok(())
    }
}

#[async_trait]
impl ContentSource for DynamicContentClient {
    async fn resolve_content_item(&self, snapshot: &Snapshot) -> Result<ContentItem, ContentError> {
        match self.inner.settings.strategy {
            ResolutionStrategy::Direct => {
                self.fetch_content_item(snapshot.root_content_item_id()).await
            }
            ResolutionStrategy::Snapshot => {
                let resolved = self.fetch_snapshot(snapshot.snapshot_id()).await?;

                let root_id = match resolved.root_content_item_id() {
                    "" => snapshot.root_content_item_id(),
                    id => id,
                };

                self.fetch_snapshot_content_item(snapshot.snapshot_id(), root_id)
                    .await
            }
        }
    }
}

/// Append path segments to a base URL, percent-encoding each one.
fn endpoint(base: &Url, segments: &[&str]) -> Result<Url, ContentError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| ContentError::InvalidUrl(base.to_string()))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

async fn read_json<T: DeserializeOwned>(response: Response, url: &Url) -> Result<T, ContentError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        warn!(url = %url, status = status.as_u16(), "dc_request_failed");
        return Err(ContentError::Status {
            status: status.as_u16(),
            body,
        });
    }

    Ok(response.json().await?)
}
