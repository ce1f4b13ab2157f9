//! Algolia REST client.
//!
//! Only the two calls this relay needs: save an object by id, and read back
//! the permissions of the configured API key at startup.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

use super::{IndexDocument, IndexError, SearchIndex};

const APPLICATION_ID_HEADER: &str = "X-Algolia-Application-Id";
const API_KEY_HEADER: &str = "X-Algolia-API-Key";

/// ACL entry required to write objects.
const ADD_OBJECT_ACL: &str = "addObject";

/// Startup credential check failures.
#[derive(Debug, Error)]
pub enum CredentialsError {
    #[error("Invalid Algolia credentials: {0}")]
    Request(#[from] IndexError),
    #[error("API key does not have the addObject permission")]
    MissingAddObject,
    #[error("API key does not have permission for index {0}")]
    IndexNotPermitted(String),
}

/// Connection settings for Algolia.
#[derive(Debug, Clone)]
pub struct AlgoliaSettings {
    pub application_id: String,
    pub api_key: String,
    /// API host, normally `https://{application_id}.algolia.net`
    pub host: Url,
    pub request_timeout: Duration,
}

impl AlgoliaSettings {
    /// Default write host for an application.
    pub fn default_host(application_id: &str) -> Result<Url, url::ParseError> {
        Url::parse(&format!("https://{}.algolia.net", application_id.to_lowercase()))
    }
}

/// Permissions attached to an API key.
#[derive(Debug, Deserialize)]
struct KeyPermissions {
    #[serde(default)]
    acl: Vec<String>,
    /// Index name patterns; absent means every index
    #[serde(default)]
    indexes: Option<Vec<String>>,
}

/// Algolia client.
#[derive(Clone)]
pub struct AlgoliaClient {
    http: Client,
    settings: AlgoliaSettings,
}

impl AlgoliaClient {
    pub fn new(settings: AlgoliaSettings) -> Result<Self, IndexError> {
        let http = Client::builder()
            .timeout(settings.request_timeout)
            .build()?;
        Ok(Self { http, settings })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, IndexError> {
        let mut url = self.settings.host.clone();
        url.path_segments_mut()
            .map_err(|_| IndexError::InvalidUrl(self.settings.host.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Check that the API key may write to `index_name`.
    pub async fn verify_credentials(&self, index_name: &str) -> Result<(), CredentialsError> {
        let url = self.endpoint(&["1", "keys", &self.settings.api_key])?;

        let response = self
            .http
            .get(url)
            .header(APPLICATION_ID_HEADER, &self.settings.application_id)
            .header(API_KEY_HEADER, &self.settings.api_key)
            .send()
            .await
            .map_err(IndexError::from)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IndexError::Status {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let permissions: KeyPermissions = response.json().await.map_err(IndexError::from)?;

        if !permissions.acl.iter().any(|acl| acl == ADD_OBJECT_ACL) {
            warn!(acl = ?permissions.acl, "algolia_key_missing_add_object");
            return Err(CredentialsError::MissingAddObject);
        }

        if let Some(patterns) = &permissions.indexes {
            if !patterns.iter().any(|p| index_pattern_matches(p, index_name)) {
                warn!(
                    index_name = %index_name,
                    indexes = ?patterns,
                    "algolia_key_index_not_permitted"
                );
                return Err(CredentialsError::IndexNotPermitted(index_name.to_string()));
            }
        }

        info!(index_name = %index_name, "algolia_credentials_verified");
        Ok(())
    }
}

#[async_trait]
impl SearchIndex for AlgoliaClient {
    async fn upsert(&self, index_name: &str, document: &IndexDocument) -> Result<(), IndexError> {
        let object_id = document.object_id().ok_or(IndexError::MissingObjectId)?;
        let url = self.endpoint(&["1", "indexes", index_name, object_id])?;

        let response = self
            .http
            .put(url)
            .header(APPLICATION_ID_HEADER, &self.settings.application_id)
            .header(API_KEY_HEADER, &self.settings.api_key)
            .json(document)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(
                index_name = %index_name,
                object_id = %object_id,
                status = status.as_u16(),
                "algolia_upsert_failed"
            );
            return Err(IndexError::Status {
                status: status.as_u16(),
                body,
            });
        }

        info!(index_name = %index_name, object_id = %object_id, "algolia_upsert_complete");
        Ok(())
    }
}

/// Match an index name against a key's index pattern.
///
/// Case-insensitive; a `*` at the start and/or end of the pattern matches any
/// run of characters.
fn index_pattern_matches(pattern: &str, index_name: &str) -> bool {
    let pattern = pattern.to_lowercase();
    let name = index_name.to_lowercase();

    let (leading, rest) = match pattern.strip_prefix('*') {
        Some(rest) => (true, rest),
        None => (false, pattern.as_str()),
    };
    let (trailing, core) = match rest.strip_suffix('*') {
        Some(core) => (true, core),
        None => (false, rest),
    };

    match (leading, trailing) {
        (false, false) => name == core,
        (true, false) => name.ends_with(core),
        (false, true) => name.starts_with(core),
        (true, true) => name.contains(core),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::extract::{Path, State};
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::{get, put};
    use axum::{Json, Router};
    use serde_json::{json, Map, Value};

    use super::*;
    use crate::testing::spawn_server;

    type Saved = Arc<Mutex<Vec<(String, String, Value)>>>;

    #[derive(Clone, Default)]
    struct FakeAlgolia {
        saved: Saved,
    }

    fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
        headers.get(name).and_then(|v| v.to_str().ok())
    }

    async fn save_object(
        State(fake): State<FakeAlgolia>,
        headers: HeaderMap,
        Path((index, object_id)): Path<(String, String)>,
        Json(body): Json<Value>,
    ) -> (StatusCode, Json<Value>) {
        if header(&headers, APPLICATION_ID_HEADER) != Some("APP")
            || header(&headers, API_KEY_HEADER) != Some("write-key")
        {
            return (StatusCode::FORBIDDEN, Json(json!({"message": "Invalid Application-ID or API key"})));
        }
        fake.saved.lock().unwrap().push((index, object_id.clone(), body));
        (StatusCode::OK, Json(json!({"objectID": object_id, "taskID": 1})))
    }

    async fn get_key(Path(key): Path<String>) -> (StatusCode, Json<Value>) {
        match key.as_str() {
            "write-key" => (StatusCode::OK, Json(json!({"acl": ["addObject", "browse"], "indexes": ["prod_*"]}))),
            "global-key" => (StatusCode::OK, Json(json!({"acl": ["addObject"]}))),
            "read-key" => (StatusCode::OK, Json(json!({"acl": ["search", "browse"]}))),
            _ => (StatusCode::FORBIDDEN, Json(json!({"message": "Invalid Application-ID or API key"}))),
        }
    }

    async fn start(fake: FakeAlgolia) -> Url {
        let app = Router::new()
            .route("/1/indexes/:index/:object_id", put(save_object))
            .route("/1/keys/:key", get(get_key))
            .with_state(fake);
        spawn_server(app).await
    }

    fn client(host: Url, api_key: &str) -> AlgoliaClient {
        AlgoliaClient::new(AlgoliaSettings {
            application_id: "APP".to_string(),
            api_key: api_key.to_string(),
            host,
            request_timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    fn document(object_id: &str) -> IndexDocument {
        let mut fields = Map::new();
        fields.insert("text1".to_string(), json!("hello"));
        fields.insert("objectID".to_string(), json!(object_id));
        IndexDocument::new(fields)
    }

    #[test]
    fn test_index_pattern_matches() {
        assert!(index_pattern_matches("MY_INDEX", "my_index"));
        assert!(index_pattern_matches("prod_*", "prod_content"));
        assert!(index_pattern_matches("*_content", "prod_content"));
        assert!(index_pattern_matches("*content*", "prod_content_v2"));
        assert!(index_pattern_matches("*", "anything"));
        assert!(!index_pattern_matches("ANOTHER_INDEX", "MY_INDEX"));
        assert!(!index_pattern_matches("prod_*", "dev_content"));
    }

    #[test]
    fn test_default_host() {
        let host = AlgoliaSettings::default_host("ABC123").unwrap();
        assert_eq!(host.as_str(), "https://abc123.algolia.net/");
    }

    #[tokio::test]
    async fn test_upsert_puts_document_by_object_id() {
        let fake = FakeAlgolia::default();
        let host = start(fake.clone()).await;

        client(host, "write-key")
            .upsert("prod_content", &document("c1"))
            .await
            .unwrap();

        let saved = fake.saved.lock().unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].0, "prod_content");
        assert_eq!(saved[0].1, "c1");
        assert_eq!(saved[0].2, json!({"text1": "hello", "objectID": "c1"}));
    }

    #[tokio::test]
    async fn test_upsert_failure_preserves_message() {
        let fake = FakeAlgolia::default();
        let host = start(fake.clone()).await;

        let err = client(host, "bad-key")
            .upsert("prod_content", &document("c1"))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("403"));
        assert!(err.to_string().contains("Invalid Application-ID or API key"));
        assert!(fake.saved.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upsert_requires_object_id() {
        let host = Url::parse("http://127.0.0.1:9").unwrap();
        let err = client(host, "write-key")
            .upsert("prod_content", &IndexDocument::default())
            .await
            .unwrap_err();
        assert!(matches!(err, IndexError::MissingObjectId));
    }

    #[tokio::test]
    async fn test_verify_credentials() {
        let host = start(FakeAlgolia::default()).await;

        assert!(client(host.clone(), "write-key")
            .verify_credentials("PROD_CONTENT")
            .await
            .is_ok());
        assert!(client(host.clone(), "global-key")
            .verify_credentials("anything")
            .await
            .is_ok());
        assert!(matches!(
            client(host.clone(), "write-key")
                .verify_credentials("dev_content")
                .await,
            Err(CredentialsError::IndexNotPermitted(_))
        ));
        assert!(matches!(
            client(host.clone(), "read-key")
                .verify_credentials("prod_content")
                .await,
            Err(CredentialsError::MissingAddObject)
        ));
        assert!(matches!(
            client(host, "unknown").verify_credentials("prod_content").await,
            Err(CredentialsError::Request(_))
        ));
    }
}
