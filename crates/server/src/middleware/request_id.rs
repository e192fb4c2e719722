use crate::AppState;
use axum::extract::{Request, State};
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use bugboy_core::context::{RequestContext, X_REQUEST_ID};
use tracing::Instrument;

/// Outermost middleware: issues the correlation id, stores the request
/// context as an extension, and echoes the id in `X-Request-ID`.
///
/// Everything downstream runs inside a `request` span carrying the id.
pub async fn request_id_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let request_id = state.correlation.issue();
    let ctx = RequestContext::new(
        request_id.clone(),
        request.method().clone(),
        request.uri().path(),
    );
    request.extensions_mut().insert(ctx);

    let span = tracing::info_span!("request", request_id = %request_id);
    let mut response = next.run(request).instrument(span).await;

    if let Ok(value) = HeaderValue::from_str(request_id.as_str()) {
        response.headers_mut().insert(X_REQUEST_ID, value);
    }
    response
}
