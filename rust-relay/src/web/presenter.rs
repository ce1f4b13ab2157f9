//! Maps processing outcomes onto HTTP responses.
//!
//! Every outcome is answered with `202 Accepted`, including collaborator
//! failures. Requests rejected before processing (content type, signature,
//! malformed JSON) are answered by the handler instead.

use axum::{http::StatusCode, Json};
use serde::Serialize;

use crate::index::IndexDocument;
use crate::process::ProcessingOutcome;

/// Body of a webhook response.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum WebhookResponse {
    Added {
        message: String,
        #[serde(rename = "addedObject")]
        added_object: IndexDocument,
    },
    Error {
        error: String,
    },
}

impl WebhookResponse {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            error: message.into(),
        }
    }
}

/// HTTP status for an outcome.
pub fn status_for(_outcome: &ProcessingOutcome) -> StatusCode {
    StatusCode::ACCEPTED
}

/// Turn an outcome into the status and body sent back to the caller.
pub fn present(outcome: ProcessingOutcome) -> (StatusCode, Json<WebhookResponse>) {
    let status = status_for(&outcome);
    let message = outcome.to_string();

    let body = match outcome {
        ProcessingOutcome::Success { document, .. } => WebhookResponse::Added {
            message,
            added_object: document,
        },
        _ => WebhookResponse::error(message),
    };

    (status, Json(body))
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Map};

    use super::*;
    use crate::content::ContentError;
    use crate::index::IndexError;
    use crate::process::Whitelist;

    fn render(outcome: ProcessingOutcome) -> (StatusCode, serde_json::Value) {
        let (status, Json(body)) = present(outcome);
        (status, serde_json::to_value(body).unwrap())
    }

    #[test]
    fn test_success_body() {
        let mut fields = Map::new();
        fields.insert("objectID".to_string(), json!("c1"));
        let (status, body) = render(ProcessingOutcome::Success {
            index_name: "prod".to_string(),
            document: IndexDocument::new(fields),
        });

        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(
            body,
            json!({
                "message": "Successfully added to index \"prod\"",
                "addedObject": {"objectID": "c1"}
            })
        );
    }

    #[test]
    fn test_rejections_are_accepted_with_error_body() {
        let (status, body) = render(ProcessingOutcome::SchemaNotWhitelisted {
            schema: Some("http://x.json".to_string()),
            whitelist: Whitelist::new(["a", "b"]).unwrap(),
        });

        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(
            body,
            json!({"error": "The content type schema 'http://x.json' does not match any in the whitelist: [a; b]"})
        );
    }

    #[test]
    fn test_collaborator_failures_are_accepted() {
        let (status, body) = render(ProcessingOutcome::ContentSourceError {
            content_item_id: "c1".to_string(),
            error: ContentError::Status {
                status: 404,
                body: "NOT_FOUND".to_string(),
            },
        });
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(
            body,
            json!({"error": "Request failed with status code 404: NOT_FOUND"})
        );

        let (status, body) = render(ProcessingOutcome::IndexWriteError {
            index_name: "prod".to_string(),
            error: IndexError::Status {
                status: 403,
                body: "forbidden".to_string(),
            },
        });
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(
            body,
            json!({"error": "Request failed with status code 403: forbidden"})
        );
    }

    #[test]
    fn test_unsupported_event_body() {
        let (_, body) = render(ProcessingOutcome::UnsupportedEventName {
            name: "unsupported".to_string(),
        });
        assert_eq!(body, json!({"error": "Unsupported webhook \"unsupported\""}));
    }
}
