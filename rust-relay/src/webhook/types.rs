//! Webhook envelope and snapshot types with structural validation.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The only event name this relay acts on.
pub const SNAPSHOT_PUBLISHED: &str = "dynamic-content.snapshot.published";

/// Top-level webhook notification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebhookEnvelope {
    /// Event name, e.g. `dynamic-content.snapshot.published`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Snapshot that was published
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Snapshot>,
}

/// Point-in-time published version of a content entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Unreadable dates decode as `None`
    #[serde(
        default,
        deserialize_with = "crate::util::date::lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_content_item: Option<RootContentItem>,
}

/// Reference to the content item a snapshot was taken of.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RootContentItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// A single structural validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// Dotted path of the offending field
    pub field: String,
    pub message: String,
}

impl Violation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, self.message)
    }
}

impl WebhookEnvelope {
    /// Check the envelope's structure.
    ///
    /// Returns every violation found; an empty list means the envelope is
    /// usable. `name` must be a non-empty string and `payload` must be present
    /// and valid itself.
    pub fn validate(&self) -> Vec<Violation> {
        let mut violations = Vec::new();

        check_non_empty(&mut violations, "name", self.name.as_deref());

        match &self.payload {
            Some(snapshot) => snapshot.collect_violations("payload", &mut violations),
            None => violations.push(Violation::new("payload", "should not be empty")),
        }

        violations
    }

    /// Validate and split into the event name and snapshot.
    ///
    /// On failure the envelope is handed back with its violations so the
    /// caller can report exactly what was received.
    pub fn into_validated(self) -> Result<(String, Snapshot), (WebhookEnvelope, Vec<Violation>)> {
        let violations = self.validate();
        match (self.name, self.payload) {
            (Some(name), Some(payload)) if violations.is_empty() => Ok((name, payload)),
            (name, payload) => Err((WebhookEnvelope { name, payload }, violations)),
        }
    }

}

impl Snapshot {
    /// Build a snapshot referencing a root content item.
    pub fn new(id: impl Into<String>, root_content_item_id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            created_date: None,
            root_content_item: Some(RootContentItem {
                id: Some(root_content_item_id.into()),
            }),
        }
    }

    /// Snapshot id, empty when absent.
    pub fn snapshot_id(&self) -> &str {
        self.id.as_deref().unwrap_or_default()
    }

    /// Root content item id, empty when absent.
    pub fn root_content_item_id(&self) -> &str {
        self.root_content_item
            .as_ref()
            .and_then(|root| root.id.as_deref())
            .unwrap_or_default()
    }

    fn collect_violations(&self, prefix: &str, violations: &mut Vec<Violation>) {
        check_non_empty(violations, &format!("{prefix}.id"), self.id.as_deref());

        match &self.root_content_item {
            Some(root) => check_non_empty(
                violations,
                &format!("{prefix}.rootContentItem.id"),
                root.id.as_deref(),
            ),
            None => violations.push(Violation::new(
                format!("{prefix}.rootContentItem"),
                "should not be empty",
            )),
        }
    }
}

fn check_non_empty(violations: &mut Vec<Violation>, field: &str, value: Option<&str>) {
    match value {
        None => violations.push(Violation::new(field, "must be a string")),
        Some(v) if v.is_empty() => violations.push(Violation::new(field, "should not be empty")),
        Some(_) => {}
    }
}
