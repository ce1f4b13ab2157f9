//! Webhook endpoint handlers.
//!
//! The webhook handler:
//! 1. Rejects non-JSON requests and bad signatures
//! 2. Parses the body
//! 3. Hands it to the processor
//! 4. Presents the outcome

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::process::WebhookProcessor;
use crate::web::presenter::{present, WebhookResponse};
use crate::web::signature::verify_request;
use crate::Config;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub processor: WebhookProcessor,
}

impl AppState {
    pub fn new(config: Config, processor: WebhookProcessor) -> Self {
        Self {
            config: Arc::new(config),
            processor,
        }
    }
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// =============================================================================
// Dynamic Content Webhook
// =============================================================================

/// Snapshot-published webhook endpoint.
///
/// Takes the raw body so the signature is checked against the exact bytes
/// that were sent.
pub async fn webhook(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    info!(body_length = body.len(), "webhook_received");

    if let Err(rejection) = verify_request(&headers, &body, &state.config.webhook_secret) {
        warn!(status = rejection.status().as_u16(), "webhook_rejected");
        return (
            rejection.status(),
            Json(WebhookResponse::error(rejection.message())),
        )
            .into_response();
    }

    let value: Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "webhook_body_malformed");
            return (
                StatusCode::BAD_REQUEST,
                Json(WebhookResponse::error("Bad Request")),
            )
                .into_response();
        }
    };

    let outcome = state.processor.process(value).await;

    info!(outcome = outcome.kind(), "webhook_processed");

    present(outcome).into_response()
}
