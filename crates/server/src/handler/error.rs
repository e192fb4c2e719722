//! Routes that fail with handled application errors.

use super::{handled_error, unexpected_success};
use crate::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;
use bugboy_core::context::RequestContext;
use bugboy_core::envelope::SuccessEnvelope;
use bugboy_core::error::{AppError, QueryError};
use serde::Deserialize;
use std::time::Duration;

/// Deadline given to the simulated release lookup.
pub const QUERY_DEADLINE: Duration = Duration::from_millis(40);
/// How long the simulated release lookup actually takes.
pub const QUERY_LATENCY: Duration = Duration::from_millis(120);
/// Address nothing listens on.
pub const UNREACHABLE_UPSTREAM: &str = "http://127.0.0.1:1/internal-api";

/// Race a query of `latency` against `deadline`; the loser is dropped.
async fn simulate_db_query(latency: Duration, deadline: Duration) -> Result<(), QueryError> {
    tokio::time::timeout(deadline, tokio::time::sleep(latency))
        .await
        .map_err(|source| QueryError::DeadlineExceeded { latency, source })
}

pub async fn db_timeout(State(state): State<AppState>, ctx: RequestContext) -> Response {
    match simulate_db_query(QUERY_LATENCY, QUERY_DEADLINE).await {
        Ok(()) => unexpected_success(&ctx),
        Err(source) => handled_error(
            &state,
            &ctx,
            AppError::Database {
                operation: "GetLatestRelease".to_string(),
                action: "fetching release metadata".to_string(),
                source,
            },
        ),
    }
}

pub async fn external_api(State(state): State<AppState>, ctx: RequestContext) -> Response {
    match state.upstream.get(UNREACHABLE_UPSTREAM).send().await {
        Ok(_) => unexpected_success(&ctx),
        Err(source) => handled_error(
            &state,
            &ctx,
            AppError::Upstream {
                dependency: "internal-api".to_string(),
                source,
            },
        ),
    }
}

#[derive(Debug, Deserialize)]
struct SignupPayload {
    user_id: i64,
    email: String,
}

const SIGNUP_BODY: &str = r#"{"user_id":"not-an-int","email":"demo@example.com"}"#;

pub async fn json_parse(State(state): State<AppState>, ctx: RequestContext) -> Response {
    match serde_json::from_str::<SignupPayload>(SIGNUP_BODY) {
        Ok(payload) => SuccessEnvelope::new("unexpected-success", &ctx.request_id)
            .with_detail("user_id", payload.user_id.to_string())
            .with_detail("email", payload.email)
            .into_response_with(StatusCode::OK),
        Err(e) => handled_error(&state, &ctx, AppError::from(e)),
    }
}
