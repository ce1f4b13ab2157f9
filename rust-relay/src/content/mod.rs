//! Content source collaborator.
//!
//! The processor only needs one capability from Dynamic Content: turn a
//! published snapshot into the content item it references. How that lookup
//! happens (direct fetch or via the snapshot endpoint) is up to the
//! implementation.

pub mod client;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::webhook::Snapshot;

pub use client::{DynamicContentClient, DynamicContentSettings, ResolutionStrategy};

/// Errors raised while talking to the content source.
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Request failed with status code {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Authentication failed: {0}")]
    Auth(String),
    #[error("Invalid endpoint url: {0}")]
    InvalidUrl(String),
}

/// A content item as stored in Dynamic Content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    pub id: String,
    /// Arbitrary content body, always carrying `_meta.schema`
    #[serde(default)]
    pub body: Map<String, Value>,
    #[serde(
        default,
        deserialize_with = "crate::util::date::lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_date: Option<DateTime<Utc>>,
    #[serde(
        default,
        deserialize_with = "crate::util::date::lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_modified_date: Option<DateTime<Utc>>,
}

impl ContentItem {
    /// Content type schema URI from `body._meta.schema`.
    pub fn schema(&self) -> Option<&str> {
        self.body
            .get("_meta")
            .and_then(|meta| meta.get("schema"))
            .and_then(Value::as_str)
    }

    /// Body property names in the order they were received.
    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.body.keys().map(String::as_str)
    }
}

/// Resolves published snapshots into content items.
#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn resolve_content_item(&self, snapshot: &Snapshot) -> Result<ContentItem, ContentError>;
}
