use crate::context::RequestId;
use crate::envelope::ErrorEnvelope;
use axum::http::StatusCode;
use axum::response::Response;
use std::error::Error as StdError;
use std::time::Duration;

/// Failure of a simulated data-store query.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("db timeout after {}ms", .latency.as_millis())]
    DeadlineExceeded {
        latency: Duration,
        #[source]
        source: tokio::time::error::Elapsed,
    },
}

/// Handled application errors. Each variant maps to exactly one status code
/// and envelope summary.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{action} failed")]
    Database {
        operation: String,
        action: String,
        #[source]
        source: QueryError,
    },

    #[error("calling {dependency} failed")]
    Upstream {
        dependency: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("decoding request payload failed")]
    InvalidPayload(#[from] serde_json::Error),

    #[error("rendering index page failed")]
    Render(#[from] minijinja::Error),

    #[error("no route for {0}")]
    NotFound(String),

    #[error("{method} not allowed on {path}")]
    MethodNotAllowed { method: String, path: String },
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Database { .. } | Self::Render(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Upstream { .. } => StatusCode::BAD_GATEWAY,
            Self::InvalidPayload(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
        }
    }

    /// Human-readable summary placed in the envelope `error` field.
    pub fn summary(&self) -> &'static str {
        match self {
            Self::Database { .. } => "database operation failed",
            Self::Upstream { .. } => "upstream dependency unavailable",
            Self::InvalidPayload(_) => "request payload invalid",
            Self::Render(_) => "index render failed",
            Self::NotFound(_) => "route not found",
            Self::MethodNotAllowed { .. } => "method not allowed",
        }
    }

    /// Whether the failure is worth sending to the monitoring sink.
    pub fn is_reportable(&self) -> bool {
        !matches!(self, Self::NotFound(_) | Self::MethodNotAllowed { .. })
    }

    /// The whole `source()` chain, outermost first, joined with `": "`.
    pub fn root_cause(&self) -> String {
        error_chain(self)
    }

    pub fn to_envelope(&self, request_id: &RequestId) -> ErrorEnvelope {
        let envelope = ErrorEnvelope::new(self.summary(), request_id);
        match self {
            Self::Database { operation, .. } => envelope
                .with_detail("operation", operation.as_str())
                .with_detail("root_cause", self.root_cause()),
            Self::Upstream { dependency, .. } => envelope
                .with_detail("dependency", dependency.as_str())
                .with_detail("root_cause", self.root_cause()),
            Self::NotFound(path) => envelope.with_detail("path", path.as_str()),
            Self::MethodNotAllowed { method, path } => envelope
                .with_detail("method", method.as_str())
                .with_detail("path", path.as_str()),
            Self::InvalidPayload(_) | Self::Render(_) => {
                envelope.with_detail("root_cause", self.root_cause())
            }
        }
    }

    pub fn into_response_for(self, request_id: &RequestId) -> Response {
        self.to_envelope(request_id)
            .into_response_with(self.status_code())
    }
}

/// Render an error and all of its sources as one line.
pub fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}
