//! Translation of raw transport and HTTP failures into [`KbError`].

use bytes::Bytes;
use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use serde_json::Value;

use crate::error::{ErrorDetail, ErrorKind, KbError};

/// Header carrying the correlation id when the body has none
pub const HDR_REQUEST_ID: &str = "x-request-id";

/// A failure observed during one attempt, before classification
#[derive(Debug)]
pub enum RawFailure {
    /// Already classified; passes through unchanged
    Domain(KbError),
    /// No response was received
    Transport {
        /// Transport library message
        message: String,
        /// Whether the attempt was aborted by a timeout
        timed_out: bool,
    },
    /// A non-success HTTP response
    Http {
        /// Response status
        status: StatusCode,
        /// Response headers
        headers: HeaderMap,
        /// Raw response body
        body: Bytes,
    },
    /// Any other failure
    Other(String),
}

impl From<reqwest::Error> for RawFailure {
    fn from(e: reqwest::Error) -> Self {
        if e.is_builder() || e.is_decode() {
            return Self::Other(e.to_string());
        }
        Self::Transport {
            message: e.to_string(),
            timed_out: e.is_timeout(),
        }
    }
}

impl From<KbError> for RawFailure {
    fn from(e: KbError) -> Self {
        Self::Domain(e)
    }
}

/// Maps an HTTP status onto an error kind
#[must_use]
pub const fn kind_for_status(status: u16) -> ErrorKind {
    match status {
        401 => ErrorKind::InvalidApiKey,
        403 => ErrorKind::InsufficientPermissions,
        404 => ErrorKind::KnowledgeBaseNotFound,
        422 => ErrorKind::ValidationError,
        429 => ErrorKind::RateLimitExceeded,
        500 => ErrorKind::InternalServerError,
        503 => ErrorKind::ServiceUnavailable,
        _ => ErrorKind::NetworkError,
    }
}

/// Classifies one failure
#[must_use]
pub fn classify(failure: RawFailure) -> KbError {
    match failure {
        RawFailure::Domain(e) => e,
        RawFailure::Transport { message, timed_out } => {
            let kind = if timed_out {
                ErrorKind::RequestTimeout
            } else {
                ErrorKind::NetworkError
            };
            KbError::new(kind).with_message(message)
        }
        RawFailure::Http {
            status,
            headers,
            body,
        } => classify_response(status, &headers, &body),
        RawFailure::Other(message) => {
            KbError::new(ErrorKind::InternalServerError).with_message(message)
        }
    }
}

fn non_blank_str(value: Option<&Value>) -> Option<&str> {
    value
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}

/// Classifies a non-success HTTP response
///
/// Each body field is read on its own, so a malformed field never hides
/// the others.
#[must_use]
pub fn classify_response(status: StatusCode, headers: &HeaderMap, body: &[u8]) -> KbError {
    let envelope: Value = serde_json::from_slice(body).unwrap_or(Value::Null);
    let nested = envelope.get("error");

    // `error` may itself be the message
    let message = non_blank_str(nested.and_then(|e| e.get("message")))
        .or_else(|| non_blank_str(nested))
        .or_else(|| non_blank_str(envelope.get("message")))
        .map_or_else(
            || format!("Request failed with status code {}", status.as_u16()),
            str::to_string,
        );

    let details = nested
        .and_then(|e| e.get("details"))
        .cloned()
        .map(ErrorDetail::normalize)
        .unwrap_or_default();

    let request_id = non_blank_str(envelope.get("meta").and_then(|m| m.get("requestId")))
        .map(str::to_string)
        .or_else(|| {
            headers
                .get(HDR_REQUEST_ID)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        });

    let mut err = KbError::new(kind_for_status(status.as_u16()))
        .with_message(message)
        .with_status(status.as_u16())
        .with_details(details);
    if let Some(id) = request_id {
        err = err.with_request_id(id);
    }
    err
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use reqwest::header::HeaderValue;
    use serde_json::json;

    fn http(status: u16, body: &Value) -> RawFailure {
        RawFailure::Http {
            status: StatusCode::from_u16(status).unwrap(),
            headers: HeaderMap::new(),
            body: Bytes::from(serde_json::to_vec(body).unwrap()),
        }
    }

    #[test]
    fn status_table() {
        let table = [
            (401, ErrorKind::InvalidApiKey),
            (403, ErrorKind::InsufficientPermissions),
            (404, ErrorKind::KnowledgeBaseNotFound),
            (422, ErrorKind::ValidationError),
            (429, ErrorKind::RateLimitExceeded),
            (500, ErrorKind::InternalServerError),
            (503, ErrorKind::ServiceUnavailable),
        ];
        for (status, kind) in table {
            let err = classify(http(status, &json!({})));
            assert_eq!(err.kind(), kind, "status {status}");
            assert_eq!(err.status(), status);
        }
    }

    #[test]
    fn domain_errors_pass_through() {
        let original = KbError::new(ErrorKind::QueryTooLong).with_request_id("r1");
        let out = classify(RawFailure::Domain(original.clone()));
        assert_eq!(out.kind(), ErrorKind::QueryTooLong);
        assert_eq!(out.request_id(), Some("r1"));
        assert_eq!(out.timestamp(), original.timestamp());
    }

    #[test]
    fn transport_failures() {
        let err = classify(RawFailure::Transport {
            message: "connection refused".into(),
            timed_out: false,
        });
        assert_eq!(err.kind(), ErrorKind::NetworkError);
        assert_eq!(err.message(), "connection refused");

        let err = classify(RawFailure::Transport {
            message: "operation timed out".into(),
            timed_out: true,
        });
        assert_eq!(err.kind(), ErrorKind::RequestTimeout);
        assert_eq!(err.status(), 408);
    }

    #[test]
    fn other_failures_are_internal() {
        let err = classify(RawFailure::Other("boom".into()));
        assert_eq!(err.kind(), ErrorKind::InternalServerError);
        assert_eq!(err.message(), "boom");
    }

    #[test]
    fn nested_message_wins_over_top_level() {
        let err = classify(http(
            422,
            &json!({
                "message": "outer",
                "error": {"message": "inner", "details": [{"field": "query"}]}
            }),
        ));
        assert_eq!(err.message(), "inner");
        assert_eq!(err.details().len(), 1);
        assert_eq!(err.details()[0].get("field"), Some(&json!("query")));
    }

    #[test]
    fn top_level_message_then_status_fallback() {
        let err = classify(http(429, &json!({"message": "slow down"})));
        assert_eq!(err.message(), "slow down");

        let err = classify(RawFailure::Http {
            status: StatusCode::BAD_GATEWAY,
            headers: HeaderMap::new(),
            body: Bytes::from_static(b"<html>bad gateway</html>"),
        });
        assert_eq!(err.kind(), ErrorKind::NetworkError);
        assert_eq!(err.status(), 502);
        assert_eq!(err.message(), "Request failed with status code 502");
    }

    #[test]
    fn single_detail_object_is_normalized() {
        let err = classify(http(
            500,
            &json!({"error": {"message": "x", "details": {"hint": "retry"}}}),
        ));
        assert_eq!(err.details().len(), 1);
        assert_eq!(err.details()[0].get("hint"), Some(&json!("retry")));
    }

    #[test]
    fn request_id_from_meta_then_header() {
        let mut headers = HeaderMap::new();
        headers.insert(HDR_REQUEST_ID, HeaderValue::from_static("hdr-id"));

        let err = classify(RawFailure::Http {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            headers: headers.clone(),
            body: Bytes::from(
                serde_json::to_vec(&json!({"meta": {"requestId": "meta-id"}})).unwrap(),
            ),
        });
        assert_eq!(err.request_id(), Some("meta-id"));

        let err = classify(RawFailure::Http {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            headers,
            body: Bytes::new(),
        });
        assert_eq!(err.request_id(), Some("hdr-id"));
    }

    #[test]
    fn mistyped_fields_do_not_hide_the_others() {
        let mut headers = HeaderMap::new();
        headers.insert(HDR_REQUEST_ID, HeaderValue::from_static("hdr-id"));
        let err = classify(RawFailure::Http {
            status: StatusCode::TOO_MANY_REQUESTS,
            headers,
            body: Bytes::from(
                serde_json::to_vec(&json!({
                    "error": {"message": "quota hit", "details": {"limit": 10}},
                    "meta": {"requestId": 42}
                }))
                .unwrap(),
            ),
        });
        assert_eq!(err.kind(), ErrorKind::RateLimitExceeded);
        assert_eq!(err.message(), "quota hit");
        assert_eq!(err.details()[0].get("limit"), Some(&json!(10)));
        assert_eq!(err.request_id(), Some("hdr-id"));

        let err = classify(http(500, &json!({"error": 42, "message": "outer"})));
        assert_eq!(err.message(), "outer");

        let err = classify(http(
            500,
            &json!({"error": {"message": 5, "details": [{"field": "x"}]}, "message": "outer"}),
        ));
        assert_eq!(err.message(), "outer");
        assert_eq!(err.details().len(), 1);

        let err = classify(http(503, &json!({"error": "index offline"})));
        assert_eq!(err.message(), "index offline");
    }

    proptest! {
        #[test]
        fn unmapped_statuses_are_network_errors(status in 400u16..600) {
            prop_assume!(![401, 403, 404, 422, 429, 500, 503].contains(&status));
            let err = classify(http(status, &json!({})));
            prop_assert_eq!(err.kind(), ErrorKind::NetworkError);
            prop_assert_eq!(err.status(), status);
        }

        #[test]
        fn transport_kind_follows_timeout_flag(timed_out in any::<bool>(), message in ".{0,40}") {
            let err = classify(RawFailure::Transport { message, timed_out });
            let expected = if timed_out { ErrorKind::RequestTimeout } else { ErrorKind::NetworkError };
            prop_assert_eq!(err.kind(), expected);
        }
    }
}
