use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{Extensions, Method};
use std::convert::Infallible;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Sentinel used wherever a request identifier is expected but none was issued.
pub const UNKNOWN_REQUEST_ID: &str = "unknown";

/// Response header carrying the correlation identifier.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Correlation identifier of a single request (`req-<n>`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestId(String);

impl RequestId {
    pub fn unknown() -> Self {
        Self(UNKNOWN_REQUEST_ID.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_unknown(&self) -> bool {
        self.0 == UNKNOWN_REQUEST_ID
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<RequestId> for String {
    fn from(id: RequestId) -> Self {
        id.0
    }
}

/// Issues process-unique, monotonically increasing request identifiers.
///
/// The counter starts at zero and is never reset; the first identifier handed
/// out is `req-1`. The raw counter is private so nothing else can rewind or
/// skip it.
#[derive(Debug, Default)]
pub struct CorrelationAssigner {
    counter: AtomicU64,
}

impl CorrelationAssigner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next identifier. Safe to call from any number of tasks.
    pub fn issue(&self) -> RequestId {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        RequestId(format!("req-{n}"))
    }
}

/// Per-request context, injected as a request extension by the correlation
/// middleware and read-only afterwards.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: RequestId,
    pub method: Method,
    pub path: String,
    /// When the request entered the middleware chain.
    pub start_time: Instant,
}

impl RequestContext {
    pub fn new(request_id: RequestId, method: Method, path: impl Into<String>) -> Self {
        Self {
            request_id,
            method,
            path: path.into(),
            start_time: Instant::now(),
        }
    }

    /// Context for a request that never passed the correlation middleware.
    pub fn unknown(method: Method, path: impl Into<String>) -> Self {
        Self::new(RequestId::unknown(), method, path)
    }

    /// Typed accessor: the stored context, or an `unknown` one built from the
    /// request line when none was attached.
    pub fn from_parts(parts: &Parts) -> Self {
        Self::lookup(&parts.extensions)
            .cloned()
            .unwrap_or_else(|| Self::unknown(parts.method.clone(), parts.uri.path()))
    }

    pub fn lookup(extensions: &Extensions) -> Option<&Self> {
        extensions.get::<Self>()
    }

    pub fn elapsed_ms(&self) -> u128 {
        self.start_time.elapsed().as_millis()
    }

    /// By-value snapshot used to annotate reports and background tasks.
    pub fn request_info(&self) -> RequestInfo {
        RequestInfo {
            method: self.method.clone(),
            path: self.path.clone(),
            request_id: self.request_id.clone(),
        }
    }
}

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_parts(parts))
    }
}

/// Minimal description of the request a report originated from.
///
/// Owns its data so it can travel into tasks that outlive the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestInfo {
    pub method: Method,
    pub path: String,
    pub request_id: RequestId,
}

impl RequestInfo {
    /// Rebuild a request description from its parts, e.g. inside a detached task.
    pub fn synthetic(method: Method, path: impl Into<String>, request_id: RequestId) -> Self {
        Self {
            method,
            path: path.into(),
            request_id,
        }
    }
}
