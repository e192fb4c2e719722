//! Wire envelopes shared by every JSON response.

use crate::context::RequestId;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// RFC3339 UTC timestamp with nanosecond precision.
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorEnvelope {
    pub error: String,
    pub request_id: String,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub details: BTreeMap<String, String>,
}

impl ErrorEnvelope {
    pub fn new(error: impl Into<String>, request_id: &RequestId) -> Self {
        Self {
            error: error.into(),
            request_id: request_id.to_string(),
            timestamp: timestamp_now(),
            details: BTreeMap::new(),
        }
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    pub fn into_response_with(self, status: StatusCode) -> Response {
        json_response(status, &self)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SuccessEnvelope {
    pub status: String,
    pub request_id: String,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub details: BTreeMap<String, String>,
}

impl SuccessEnvelope {
    pub fn new(status: impl Into<String>, request_id: &RequestId) -> Self {
        Self {
            status: status.into(),
            request_id: request_id.to_string(),
            timestamp: timestamp_now(),
            details: BTreeMap::new(),
        }
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    pub fn into_response_with(self, status: StatusCode) -> Response {
        json_response(status, &self)
    }
}

/// Serialize `payload` as the response body with the envelope content type.
///
/// Encoding failures degrade to a fixed 500 body rather than an empty reply.
pub fn json_response<T: Serialize>(status: StatusCode, payload: &T) -> Response {
    let (status, body) = match serde_json::to_vec(payload) {
        Ok(body) => (status, body),
        Err(e) => {
            tracing::error!(error = %e, "Response encoding failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                br#"{"error":"response encoding failed"}"#.to_vec(),
            )
        }
    };
    (
        status,
        [(
            header::CONTENT_TYPE,
            HeaderValue::from_static(JSON_CONTENT_TYPE),
        )],
        body,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_error_envelope_omits_empty_details() {
        let env = ErrorEnvelope::new("boom", &RequestId::unknown());
        let value = serde_json::to_value(&env).unwrap();
        assert_eq!(value["error"], "boom");
        assert_eq!(value["request_id"], "unknown");
        assert!(value.get("details").is_none());
    }

    #[test]
    fn test_success_envelope_details() {
        let env = SuccessEnvelope::new("queued", &RequestId::unknown())
            .with_detail("note", "later");
        let value = serde_json::to_value(&env).unwrap();
        assert_eq!(value["status"], "queued");
        assert_eq!(value["details"]["note"], "later");
    }

    #[test]
    fn test_timestamp_is_utc_nanos() {
        let ts = timestamp_now();
        assert!(ts.ends_with('Z'), "timestamp {ts} is not UTC");
        let fraction = ts.rsplit('.').next().unwrap().trim_end_matches('Z');
        assert_eq!(fraction.len(), 9);
        assert!(chrono::DateTime::parse_from_rfc3339(&ts).is_ok());
    }

    #[tokio::test]
    async fn test_json_response_sets_content_type() {
        let resp = ErrorEnvelope::new("bad", &RequestId::unknown())
            .into_response_with(StatusCode::BAD_REQUEST);
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            resp.headers().get(header::CONTENT_TYPE).unwrap(),
            JSON_CONTENT_TYPE
        );
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["error"], "bad");
    }
}
