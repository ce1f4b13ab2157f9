//! Search index collaborator.
//!
//! Documents are upserted by `objectID`; writing the same document twice
//! leaves the index unchanged, and concurrent writers resolve as
//! last-write-wins.

pub mod client;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

pub use client::{AlgoliaClient, AlgoliaSettings, CredentialsError};

/// Errors raised while writing to the search index.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Request failed with status code {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Invalid endpoint url: {0}")]
    InvalidUrl(String),
    #[error("Document has no objectID")]
    MissingObjectId,
}

/// Document written to the search index.
///
/// A flat JSON object holding `objectID`, `publishedDate` and the selected
/// content item properties.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IndexDocument(Map<String, Value>);

impl IndexDocument {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn object_id(&self) -> Option<&str> {
        self.0.get("objectID").and_then(Value::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }
}

/// Writes documents into a named index.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    async fn upsert(&self, index_name: &str, document: &IndexDocument) -> Result<(), IndexError>;
}
