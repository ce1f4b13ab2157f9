//! Web server module for handling inbound webhooks.
//!
//! This module provides the HTTP surface of the relay:
//! - `POST /webhook` receives Dynamic Content snapshot-published events
//! - `GET /health` answers liveness probes
//!
//! Requests are verified here; everything after that is the processor's job.

pub mod handlers;
pub mod presenter;
pub mod signature;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

pub use handlers::{health, webhook, AppState, HealthResponse};
pub use presenter::{present, status_for, WebhookResponse};
pub use signature::{compute_signature, verify_request, verify_signature, SIGNATURE_HEADER};

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/webhook", post(webhook))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
