use axum::http::StatusCode;
use axum::response::Response;
use bugboy_core::context::RequestContext;
use bugboy_core::envelope::SuccessEnvelope;

pub async fn healthz(ctx: RequestContext) -> Response {
    SuccessEnvelope::new("ok", &ctx.request_id).into_response_with(StatusCode::OK)
}
