pub mod background;
pub mod error;
pub mod health;
pub mod index;
pub mod panic;

use crate::AppState;
use axum::http::{Method, StatusCode};
use axum::response::Response;
use bugboy_core::context::RequestContext;
use bugboy_core::envelope::SuccessEnvelope;
use bugboy_core::error::AppError;

/// Report, log and render a handled application error. Every failure is
/// surfaced exactly once, here.
pub(crate) fn handled_error(state: &AppState, ctx: &RequestContext, err: AppError) -> Response {
    let status = err.status_code();
    if err.is_reportable() {
        state
            .reporter
            .capture_error_with_request(&err, &ctx.request_info());
        tracing::warn!(
            request_id = %ctx.request_id,
            route = %ctx.path,
            status = status.as_u16(),
            error = %err.root_cause(),
            "Application error"
        );
    } else {
        tracing::debug!(
            request_id = %ctx.request_id,
            route = %ctx.path,
            status = status.as_u16(),
            "Request rejected"
        );
    }
    err.into_response_for(&ctx.request_id)
}

/// Response for a demo route whose failure did not trigger.
pub(crate) fn unexpected_success(ctx: &RequestContext) -> Response {
    SuccessEnvelope::new("unexpected-success", &ctx.request_id).into_response_with(StatusCode::OK)
}

pub async fn not_found(ctx: RequestContext) -> Response {
    AppError::NotFound(ctx.path.clone()).into_response_for(&ctx.request_id)
}

pub async fn method_not_allowed(ctx: RequestContext, method: Method) -> Response {
    AppError::MethodNotAllowed {
        method: method.to_string(),
        path: ctx.path.clone(),
    }
    .into_response_for(&ctx.request_id)
}
