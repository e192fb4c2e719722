use axum::extract::{ConnectInfo, Request};
use axum::middleware::Next;
use axum::response::Response;
use bugboy_core::context::{RequestContext, RequestId};
use std::net::SocketAddr;
use std::time::Instant;

/// Access log: one line per completed request, including requests whose
/// handler panicked and was recovered further in.
pub async fn request_logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let remote_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_else(|| "-".to_string());
    let request_id = RequestContext::lookup(request.extensions())
        .map(|ctx| ctx.request_id.clone())
        .unwrap_or_else(RequestId::unknown);

    let started = Instant::now();
    let response = next.run(request).await;
    let duration_ms = started.elapsed().as_millis();

    tracing::info!(
        request_id = %request_id,
        method = %method,
        path = %path,
        remote_addr = %remote_addr,
        status = response.status().as_u16(),
        duration_ms = duration_ms as u64,
        "Request completed"
    );

    response
}
