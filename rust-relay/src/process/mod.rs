//! Webhook processing pipeline.
//!
//! Turns a snapshot-published webhook into an index write.
//!
//! ## Processing Flow
//!
//! ```text
//! WebhookEnvelope → validate → check event → fetch content → filter schema
//!     → filter properties → build document → upsert → ProcessingOutcome
//! ```
//!
//! Every step either hands over to the next one or ends the run with a
//! [`ProcessingOutcome`]. Collaborator failures are converted into outcomes
//! where they happen; nothing is retried.

pub mod document;
pub mod filter;

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::{error, info, warn};

use crate::content::{ContentError, ContentSource};
use crate::index::{IndexDocument, IndexError, SearchIndex};
use crate::util::Clock;
use crate::webhook::{Violation, WebhookEnvelope, SNAPSHOT_PUBLISHED};

pub use document::build_document;
pub use filter::{is_schema_allowed, select_properties, DuplicateEntry, Whitelist, WhitelistConfig};

/// How a single webhook run ended.
#[derive(Debug)]
pub enum ProcessingOutcome {
    /// The envelope failed structural validation
    InvalidRequest {
        envelope: Value,
        violations: Vec<Violation>,
    },
    /// The event is not `dynamic-content.snapshot.published`
    UnsupportedEventName { name: String },
    /// The content item could not be fetched
    ContentSourceError {
        content_item_id: String,
        error: ContentError,
    },
    /// The content type schema is not whitelisted
    SchemaNotWhitelisted {
        schema: Option<String>,
        whitelist: Whitelist,
    },
    /// None of the body properties are whitelisted
    NoPropertiesMatched {
        properties: Vec<String>,
        whitelist: Whitelist,
    },
    /// The index write failed
    IndexWriteError {
        index_name: String,
        error: IndexError,
    },
    /// The document was written
    Success {
        index_name: String,
        document: IndexDocument,
    },
}

impl ProcessingOutcome {
    /// Short machine-readable name, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidRequest { .. } => "invalid_request",
            Self::UnsupportedEventName { .. } => "unsupported_event_name",
            Self::ContentSourceError { .. } => "content_source_error",
            Self::SchemaNotWhitelisted { .. } => "schema_not_whitelisted",
            Self::NoPropertiesMatched { .. } => "no_properties_matched",
            Self::IndexWriteError { .. } => "index_write_error",
            Self::Success { .. } => "success",
        }
    }
}

impl fmt::Display for ProcessingOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRequest { envelope, .. } => write!(f, "Invalid Webhook: {envelope}"),
            Self::UnsupportedEventName { name } => write!(f, "Unsupported webhook \"{name}\""),
            Self::ContentSourceError { error, .. } => write!(f, "{error}"),
            Self::SchemaNotWhitelisted { schema, whitelist } => write!(
                f,
                "The content type schema '{}' does not match any in the whitelist: [{}]",
                schema.as_deref().unwrap_or_default(),
                whitelist.join("; ")
            ),
            Self::NoPropertiesMatched {
                properties,
                whitelist,
            } => write!(
                f,
                "None of the content type properties [{}] are listed in the whitelist: [{}]",
                properties.join(";"),
                whitelist.join(";")
            ),
            Self::IndexWriteError { error, .. } => write!(f, "{error}"),
            Self::Success { index_name, .. } => {
                write!(f, "Successfully added to index \"{index_name}\"")
            }
        }
    }
}

/// Processor settings taken from configuration.
#[derive(Debug, Clone)]
pub struct ProcessorSettings {
    /// Search index the documents are written to
    pub index_name: String,
    pub whitelists: WhitelistConfig,
    /// Add the `_...Date` epoch-second fields to each document
    pub stamp_timestamps: bool,
}

/// Runs the webhook pipeline against the two collaborators.
///
/// Holds no per-request state; one instance serves every request.
#[derive(Clone)]
pub struct WebhookProcessor {
    content: Arc<dyn ContentSource>,
    index: Arc<dyn SearchIndex>,
    clock: Arc<dyn Clock>,
    settings: Arc<ProcessorSettings>,
}

impl WebhookProcessor {
    pub fn new(
        content: Arc<dyn ContentSource>,
        index: Arc<dyn SearchIndex>,
        clock: Arc<dyn Clock>,
        settings: ProcessorSettings,
    ) -> Self {
        Self {
            content,
            index,
            clock,
            settings: Arc::new(settings),
        }
    }

    /// Process one webhook body.
    ///
    /// This function:
    /// 1. Decodes and validates the envelope structure
    /// 2. Rejects any event other than snapshot-published
    /// 3. Resolves the snapshot into its content item
    /// 4. Checks the content type schema whitelist
    /// 5. Selects the whitelisted body properties
    /// 6. Builds the index document
    /// 7. Upserts it into the configured index
    ///
    /// `body` is the already-parsed request JSON; it is echoed back verbatim
    /// when the envelope is invalid.
    pub async fn process(&self, body: Value) -> ProcessingOutcome {
        let envelope: WebhookEnvelope = match serde_json::from_value(body.clone()) {
            Ok(envelope) => envelope,
            Err(e) => {
                let violations = vec![Violation::new("body", e.to_string())];
                return invalid_request(body, violations);
            }
        };

        let (name, snapshot) = match envelope.into_validated() {
            Ok(parts) => parts,
            Err((_, violations)) => return invalid_request(body, violations),
        };

        if name != SNAPSHOT_PUBLISHED {
            info!(name = %name, "webhook_unsupported_event");
            return ProcessingOutcome::UnsupportedEventName { name };
        }

        let content_item_id = snapshot.root_content_item_id().to_string();

        info!(
            snapshot_id = %snapshot.snapshot_id(),
            content_item_id = %content_item_id,
            "webhook_process_start"
        );

        let item = match self.content.resolve_content_item(&snapshot).await {
            Ok(item) => item,
            Err(e) => {
                error!(
                    content_item_id = %content_item_id,
                    error = %e,
                    "content_item_fetch_failed"
                );
                return ProcessingOutcome::ContentSourceError {
                    content_item_id,
                    error: e,
                };
            }
        };

        info!(
            content_item_id = %item.id,
            schema = ?item.schema(),
            property_count = item.body.len(),
            "content_item_fetched"
        );

        let whitelists = &self.settings.whitelists;

        // An item without a schema only gets through an empty whitelist
        let schema_allowed = match item.schema() {
            Some(schema) => is_schema_allowed(schema, &whitelists.content_types),
            None => whitelists.content_types.is_empty(),
        };
        if !schema_allowed {
            info!(
                content_item_id = %item.id,
                schema = ?item.schema(),
                whitelist = %whitelists.content_types,
                "content_type_schema_not_whitelisted"
            );
            return ProcessingOutcome::SchemaNotWhitelisted {
                schema: item.schema().map(str::to_string),
                whitelist: whitelists.content_types.clone(),
            };
        }

        let selected = select_properties(item.property_names(), &whitelists.properties);
        if selected.is_empty() {
            let properties: Vec<String> = item.property_names().map(str::to_string).collect();
            info!(
                content_item_id = %item.id,
                properties = ?properties,
                whitelist = %whitelists.properties,
                "content_type_properties_not_whitelisted"
            );
            return ProcessingOutcome::NoPropertiesMatched {
                properties,
                whitelist: whitelists.properties.clone(),
            };
        }

        let document = build_document(
            &item,
            &selected,
            &snapshot,
            self.clock.now(),
            self.settings.stamp_timestamps,
        );

        let index_name = self.settings.index_name.clone();

        if let Err(e) = self.index.upsert(&index_name, &document).await {
            error!(
                index_name = %index_name,
                object_id = %item.id,
                error = %e,
                "index_upsert_failed"
            );
            return ProcessingOutcome::IndexWriteError {
                index_name,
                error: e,
            };
        }

        info!(
            index_name = %index_name,
            object_id = %item.id,
            property_count = selected.len(),
            "index_upsert_complete"
        );

        ProcessingOutcome::Success {
            index_name,
            document,
        }
    }
}

fn invalid_request(envelope: Value, violations: Vec<Violation>) -> ProcessingOutcome {
    warn!(
        envelope = %envelope,
        violations = ?violations,
        "webhook_invalid_request"
    );
    ProcessingOutcome::InvalidRequest {
        envelope,
        violations,
    }
}
