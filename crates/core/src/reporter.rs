//! Error reporting capability consumed by the request pipeline.
//!
//! The pipeline only ever holds an `Arc<dyn ErrorReporter>`. Delivery,
//! batching and transport belong to the implementation behind it.

use crate::context::RequestInfo;
use crate::panic::panic_message;
use async_trait::async_trait;
use std::any::Any;
use std::error::Error as StdError;
use std::sync::Arc;
use std::time::Duration;

/// Sink for handled errors and recovered panics.
///
/// Capture methods must return promptly and never fail; `flush` is
/// best-effort and bounded by `timeout`.
#[async_trait]
pub trait ErrorReporter: Send + Sync {
    /// Record a handled error with no request context.
    fn capture_error(&self, err: &(dyn StdError + 'static));

    /// Record a handled error annotated with the request it came from.
    fn capture_error_with_request(&self, err: &(dyn StdError + 'static), request: &RequestInfo);

    /// Record a recovered panic payload.
    fn capture_panic(&self, payload: &(dyn Any + Send));

    /// Record a recovered panic payload annotated with its request.
    fn capture_panic_with_request(&self, payload: &(dyn Any + Send), request: &RequestInfo);

    /// Deliver anything still buffered, giving up after `timeout`.
    async fn flush(&self, timeout: Duration);
}

/// Message sent to sinks for a recovered panic: `panic: <value>`.
pub fn panic_report_message(payload: &(dyn Any + Send)) -> String {
    format!("panic: {}", panic_message(payload))
}

/// Reporter used when no sink is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

#[async_trait]
impl ErrorReporter for NoopReporter {
    fn capture_error(&self, _err: &(dyn StdError + 'static)) {}

    fn capture_error_with_request(&self, _err: &(dyn StdError + 'static), _request: &RequestInfo) {}

    fn capture_panic(&self, _payload: &(dyn Any + Send)) {}

    fn capture_panic_with_request(&self, _payload: &(dyn Any + Send), _request: &RequestInfo) {}

    async fn flush(&self, _timeout: Duration) {}
}

/// Resolve an optional reporter to one that can always be called.
pub fn reporter_or_noop(reporter: Option<Arc<dyn ErrorReporter>>) -> Arc<dyn ErrorReporter> {
    reporter.unwrap_or_else(|| Arc::new(NoopReporter))
}
