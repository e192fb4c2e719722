//! Routes that respond immediately and fail later on a detached task.

use crate::AppState;
use crate::background::{spawn_captured, spawn_fatal};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;
use bugboy_core::context::RequestContext;
use bugboy_core::envelope::SuccessEnvelope;
use std::hint::black_box;
use std::time::Duration;

/// Delay before a background task reaches its fault.
pub const BACKGROUND_DELAY: Duration = Duration::from_millis(25);

async fn read_missing_job() {
    tokio::time::sleep(BACKGROUND_DELAY).await;
    let jobs: Vec<String> = Vec::new();
    let job = &jobs[black_box(3)];
    tracing::debug!(job = %job, "Job loaded");
}

pub async fn background_panic(State(state): State<AppState>, ctx: RequestContext) -> Response {
    spawn_captured(state.reporter.clone(), ctx.request_info(), read_missing_job());

    SuccessEnvelope::new("queued", &ctx.request_id)
        .with_detail("note", "background panic will be logged after response")
        .into_response_with(StatusCode::ACCEPTED)
}

pub async fn fatal_background_panic(ctx: RequestContext) -> Response {
    tracing::warn!(
        request_id = %ctx.request_id,
        "Fatal background task scheduled; process will terminate"
    );
    spawn_fatal(ctx.request_info(), read_missing_job());

    SuccessEnvelope::new("queued", &ctx.request_id)
        .with_detail(
            "note",
            "process should terminate once background task panic triggers",
        )
        .into_response_with(StatusCode::ACCEPTED)
}
