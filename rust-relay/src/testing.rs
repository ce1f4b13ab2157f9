//! In-process fakes shared by the unit tests.

use std::sync::Mutex;

use async_trait::async_trait;
use axum::Router;
use chrono::{TimeZone, Utc};
use serde_json::Value;
use tokio::net::TcpListener;
use url::Url;

use crate::content::{ContentError, ContentItem, ContentSource};
use crate::index::{IndexDocument, IndexError, SearchIndex};
use crate::util::FixedClock;
use crate::webhook::Snapshot;

/// Serve `app` on an ephemeral local port and return its base URL.
///
/// The returned URL always ends with `/` so it can be joined onto.
pub async fn spawn_server(app: Router) -> Url {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    Url::parse(&format!("http://{addr}/")).unwrap()
}

/// Clock pinned to 2019-07-15T00:00:00Z.
pub fn fixed_clock() -> FixedClock {
    FixedClock(Utc.with_ymd_and_hms(2019, 7, 15, 0, 0, 0).unwrap())
}

enum ContentReply {
    Item(ContentItem),
    Status(u16, String),
}

/// Content source answering every lookup the same way.
pub struct FakeContentSource {
    reply: ContentReply,
    requested: Mutex<Vec<String>>,
}

impl FakeContentSource {
    /// Answer with the content item described by `item`.
    pub fn returning(item: Value) -> Self {
        Self {
            reply: ContentReply::Item(serde_json::from_value(item).unwrap()),
            requested: Mutex::new(Vec::new()),
        }
    }

    /// Fail every lookup with an HTTP status error.
    pub fn failing(status: u16, body: &str) -> Self {
        Self {
            reply: ContentReply::Status(status, body.to_string()),
            requested: Mutex::new(Vec::new()),
        }
    }

    /// Root content item ids looked up so far.
    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContentSource for FakeContentSource {
    async fn resolve_content_item(&self, snapshot: &Snapshot) -> Result<ContentItem, ContentError> {
        self.requested
            .lock()
            .unwrap()
            .push(snapshot.root_content_item_id().to_string());

        match &self.reply {
            ContentReply::Item(item) => Ok(item.clone()),
            ContentReply::Status(status, body) => Err(ContentError::Status {
                status: *status,
                body: body.clone(),
            }),
        }
    }
}

/// Search index recording every write.
#[derive(Default)]
pub struct FakeSearchIndex {
    failure: Option<(u16, String)>,
    writes: Mutex<Vec<(String, IndexDocument)>>,
}

impl FakeSearchIndex {
    /// Reject every write with an HTTP status error.
    pub fn failing(status: u16, body: &str) -> Self {
        Self {
            failure: Some((status, body.to_string())),
            writes: Mutex::new(Vec::new()),
        }
    }

    /// Successful writes as `(index_name, document)`.
    pub fn writes(&self) -> Vec<(String, IndexDocument)> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchIndex for FakeSearchIndex {
    async fn upsert(&self, index_name: &str, document: &IndexDocument) -> Result<(), IndexError> {
        if let Some((status, body)) = &self.failure {
            return Err(IndexError::Status {
                status: *status,
                body: body.clone(),
            });
        }
        self.writes
            .lock()
            .unwrap()
            .push((index_name.to_string(), document.clone()));
        Ok(())
    }
}
