//! Inbound webhook model.
//!
//! Dynamic Content posts a JSON envelope naming the event and carrying the
//! published snapshot. Decoding is lenient: every field is optional so that a
//! missing `name` or `payload` is reported by [`WebhookEnvelope::validate`]
//! instead of failing deserialization.

pub mod types;

pub use types::{RootContentItem, Snapshot, Violation, WebhookEnvelope, SNAPSHOT_PUBLISHED};
