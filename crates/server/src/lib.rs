pub mod background;
pub mod handler;
pub mod middleware;
pub mod routes;

use arc_swap::ArcSwap;
use axum::{Router, middleware as axum_mw, routing::get};
use bugboy_core::config::Config;
use bugboy_core::context::CorrelationAssigner;
use bugboy_core::reporter::ErrorReporter;
use handler::index::IndexPage;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;

/// Timeout applied to calls made to other services from request handlers.
pub const UPSTREAM_TIMEOUT: Duration = Duration::from_millis(200);

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("index template is invalid: {0}")]
    Template(#[from] minijinja::Error),

    #[error("failed to build upstream HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ArcSwap<Config>>,
    pub reporter: Arc<dyn ErrorReporter>,
    pub correlation: Arc<CorrelationAssigner>,
    pub upstream: reqwest::Client,
    pub index: Arc<IndexPage>,
}

impl AppState {
    pub fn new(
        config: Arc<ArcSwap<Config>>,
        reporter: Arc<dyn ErrorReporter>,
    ) -> Result<Self, StateError> {
        let upstream = reqwest::Client::builder()
            .timeout(UPSTREAM_TIMEOUT)
            .no_proxy()
            .build()?;
        Ok(Self {
            config,
            reporter,
            correlation: Arc::new(CorrelationAssigner::new()),
            upstream,
            index: Arc::new(IndexPage::new()?),
        })
    }
}

pub fn build_router(state: AppState) -> Router {
    let bug_routes = Router::new()
        .route("/bugs/panic/nil-pointer", get(handler::panic::nil_pointer))
        .route(
            "/bugs/panic/index-out-of-range",
            get(handler::panic::index_out_of_range),
        )
        .route("/bugs/panic/divide-by-zero", get(handler::panic::divide_by_zero))
        .route("/bugs/panic/nil-map-write", get(handler::panic::nil_map_write))
        .route("/bugs/error/db-timeout", get(handler::error::db_timeout))
        .route("/bugs/error/external-api", get(handler::error::external_api))
        .route("/bugs/error/json-parse", get(handler::error::json_parse))
        .route(
            "/bugs/background/panic",
            get(handler::background::background_panic),
        )
        .route(
            "/bugs/fatal/unhandled-goroutine-panic",
            get(handler::background::fatal_background_panic),
        );

    // Compose, then wrap in the single middleware chain (outer → inner):
    // request id → access log → panic recovery → dispatch
    Router::new()
        .route("/", get(handler::index::index))
        .route("/healthz", get(handler::health::healthz))
        .merge(bug_routes)
        .fallback(handler::not_found)
        .method_not_allowed_fallback(handler::method_not_allowed)
        .layer(axum_mw::from_fn_with_state(
            state.clone(),
            middleware::recover::recover_panic_middleware,
        ))
        .layer(axum_mw::from_fn(
            middleware::request_logging::request_logging_middleware,
        ))
        .layer(axum_mw::from_fn_with_state(
            state.clone(),
            middleware::request_id::request_id_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
