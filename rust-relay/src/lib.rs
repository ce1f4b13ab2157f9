//! Dynamic Content to Algolia relay.
//!
//! Receives Dynamic Content `snapshot.published` webhooks, fetches the
//! published content item, filters it through the configured whitelists and
//! upserts the result into an Algolia index.
//!
//! ## Architecture
//!
//! ```text
//! Webhook → web (content type, signature) → process → Dynamic Content
//!                                                   → Algolia
//! ```

pub mod config;
pub mod content;
pub mod index;
pub mod process;
pub mod util;
pub mod web;
pub mod webhook;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use config::{Config, ConfigError};
pub use content::{ContentError, ContentItem, ContentSource, DynamicContentClient};
pub use index::{AlgoliaClient, IndexDocument, IndexError, SearchIndex};
pub use process::{ProcessingOutcome, ProcessorSettings, WebhookProcessor};
pub use web::{router, AppState};
pub use webhook::{Snapshot, WebhookEnvelope, SNAPSHOT_PUBLISHED};
