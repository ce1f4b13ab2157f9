//! Dynamic Content webhook signature verification.
//!
//! Dynamic Content signs each webhook body with the shared webhook secret:
//! the `X-Amplience-Webhook-Signature` header carries
//! `base64(HMAC-SHA256(secret, raw_body))`.
//!
//! Verification runs on the exact bytes received, before any JSON parsing.

use axum::http::{header::CONTENT_TYPE, HeaderMap, StatusCode};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::warn;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the body signature.
pub const SIGNATURE_HEADER: &str = "X-Amplience-Webhook-Signature";

/// Why a request was turned away before processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestRejection {
    /// Content-Type is missing or not JSON
    NotJson,
    /// Signature is missing or does not match the body
    BadSignature,
}

impl RequestRejection {
    pub fn status(self) -> StatusCode {
        match self {
            Self::NotJson => StatusCode::BAD_REQUEST,
            Self::BadSignature => StatusCode::UNAUTHORIZED,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Self::NotJson => "Bad Request",
            Self::BadSignature => "Webhook verification failed.",
        }
    }
}

/// Compute the base64 HMAC-SHA256 signature of `body`.
pub fn compute_signature(secret: &str, body: &[u8]) -> String {
    // HMAC accepts keys of any length
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(m) => m,
        Err(_) => return String::new(),
    };
    mac.update(body);
    STANDARD.encode(mac.finalize().into_bytes())
}

/// Verify a webhook signature.
///
/// # Arguments
///
/// * `secret` - The shared webhook secret
/// * `body` - The raw request body
/// * `signature` - The signature header value, if any
///
/// # Returns
///
/// `true` only if a signature was supplied and it matches.
pub fn verify_signature(secret: &str, body: &[u8], signature: Option<&str>) -> bool {
    let signature = match signature {
        Some(s) if !s.is_empty() => s,
        _ => {
            warn!(body_length = body.len(), "webhook_signature_missing");
            return false;
        }
    };

    let expected = compute_signature(secret, body);

    // Constant-time comparison to prevent timing attacks
    let valid = constant_time_compare(&expected, signature);

    if !valid {
        warn!(
            expected_length = expected.len(),
            actual_length = signature.len(),
            "webhook_signature_mismatch"
        );
    }

    valid
}

/// Whether a Content-Type header value declares JSON.
///
/// The media type is compared case-insensitively; parameters such as
/// `charset` are ignored.
pub fn is_json_content_type(value: &str) -> bool {
    value
        .split(';')
        .next()
        .map(|media| media.trim().eq_ignore_ascii_case("application/json"))
        .unwrap_or(false)
}

/// Run the transport-level checks on an inbound webhook.
///
/// Content-Type is checked first, so a non-JSON request is rejected without
/// computing a signature.
pub fn verify_request(headers: &HeaderMap, body: &[u8], secret: &str) -> Result<(), RequestRejection> {
    let content_type = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok());
    if !content_type.map(is_json_content_type).unwrap_or(false) {
        warn!(content_type = ?content_type, "webhook_content_type_invalid");
        return Err(RequestRejection::NotJson);
    }

    let signature = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok());
    if !verify_signature(secret, body, signature) {
        return Err(RequestRejection::BadSignature);
    }

    Ok(())
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    const BODY: &[u8] = br#"{"name":"dynamic-content.snapshot.published"}"#;

    fn headers(content_type: Option<&str>, signature: Option<&str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(ct) = content_type {
            headers.insert(CONTENT_TYPE, HeaderValue::from_str(ct).unwrap());
        }
        if let Some(sig) = signature {
            headers.insert(SIGNATURE_HEADER, HeaderValue::from_str(sig).unwrap());
        }
        headers
    }

    #[test]
    fn test_compute_signature_known_value() {
        // RFC 4231 test case 2
        assert_eq!(
            compute_signature("Jefe", b"what do ya want for nothing?"),
            "W9zBRr9gdU5qBCQmCJV1x1oAPwidJzmDnexYuWTsOEM="
        );
    }

    #[test]
    fn test_verify_signature_valid() {
        let signature = compute_signature("secret", BODY);
        assert!(verify_signature("secret", BODY, Some(&signature)));
    }

    #[test]
    fn test_verify_signature_rejects_mismatch() {
        let signature = compute_signature("other-secret", BODY);
        assert!(!verify_signature("secret", BODY, Some(&signature)));
        assert!(!verify_signature("secret", b"{}", Some(&compute_signature("secret", BODY))));
    }

    #[test]
    fn test_verify_signature_missing() {
        assert!(!verify_signature("secret", BODY, None));
        assert!(!verify_signature("secret", BODY, Some("")));
    }

    #[test]
    fn test_is_json_content_type() {
        assert!(is_json_content_type("application/json"));
        assert!(is_json_content_type("Application/JSON"));
        assert!(is_json_content_type("application/json; charset=utf-8"));
        assert!(!is_json_content_type("text/plain"));
        assert!(!is_json_content_type("application/jsonx"));
        assert!(!is_json_content_type(""));
    }

    #[test]
    fn test_verify_request_checks_content_type_first() {
        let result = verify_request(&headers(Some("text/plain"), None), BODY, "secret");
        assert_eq!(result, Err(RequestRejection::NotJson));
        assert_eq!(RequestRejection::NotJson.status(), StatusCode::BAD_REQUEST);

        let result = verify_request(&headers(None, None), BODY, "secret");
        assert_eq!(result, Err(RequestRejection::NotJson));
    }

    #[test]
    fn test_verify_request_signature() {
        let good = compute_signature("secret", BODY);
        assert_eq!(
            verify_request(&headers(Some("application/json"), Some(&good)), BODY, "secret"),
            Ok(())
        );

        let result = verify_request(&headers(Some("application/json"), Some("bogus")), BODY, "secret");
        assert_eq!(result, Err(RequestRejection::BadSignature));
        assert_eq!(RequestRejection::BadSignature.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("abc", "abc"));
        assert!(!constant_time_compare("abc", "abd"));
        assert!(!constant_time_compare("abc", "abcd"));
    }
}
