use crate::AppState;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::Response;
use bugboy_core::context::RequestContext;
use bugboy_core::envelope::ErrorEnvelope;
use bugboy_core::panic::{catch_panic, panic_message, take_stack_trace};
use std::any::Any;

pub const PANIC_RECOVERED: &str = "panic recovered in request handler";

/// Panic recovery boundary around route dispatch.
///
/// A panic raised while the downstream future is polled is reported, logged
/// with the panic-site stack trace, and turned into a 500 error envelope.
/// With `recover-panics` off the panic is logged and resumed so it unwinds
/// into the connection task; nothing is reported and no response is written.
pub async fn recover_panic_middleware(
    State(state): State<AppState>,
    ctx: RequestContext,
    request: Request,
    next: Next,
) -> Response {
    let enabled = state.config.load().recover_panics;

    match catch_panic(next.run(request)).await {
        Ok(response) => response,
        Err(payload) if enabled => recovered(&state, &ctx, payload),
        Err(payload) => {
            tracing::error!(
                request_id = %ctx.request_id,
                method = %ctx.method,
                path = %ctx.path,
                panic = %panic_message(&*payload),
                stack = %take_stack_trace(),
                "Panic escaped handler; recovery disabled"
            );
            std::panic::resume_unwind(payload)
        }
    }
}

fn recovered(state: &AppState, ctx: &RequestContext, payload: Box<dyn Any + Send>) -> Response {
    let stack = take_stack_trace();
    let message = panic_message(&*payload);

    state.reporter.capture_panic(&*payload);
    tracing::error!(
        request_id = %ctx.request_id,
        method = %ctx.method,
        path = %ctx.path,
        elapsed_ms = ctx.elapsed_ms() as u64,
        panic = %message,
        stack = %stack,
        "Panic recovered"
    );

    ErrorEnvelope::new(PANIC_RECOVERED, &ctx.request_id)
        .with_detail("panic", message)
        .into_response_with(StatusCode::INTERNAL_SERVER_ERROR)
}
