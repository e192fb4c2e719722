//! Routes that panic synchronously inside the request handler.
//!
//! `black_box` keeps the compiler from proving the fault at build time.

use super::unexpected_success;
use axum::response::Response;
use bugboy_core::context::RequestContext;
use std::collections::HashMap;
use std::hint::black_box;

struct Profile {
    name: String,
}

fn load_profile() -> Option<Profile> {
    black_box(None)
}

pub async fn nil_pointer(ctx: RequestContext) -> Response {
    let profile = load_profile();
    let name = &profile.as_ref().unwrap().name;
    tracing::debug!(name = %name, "Profile loaded");
    unexpected_success(&ctx)
}

pub async fn index_out_of_range(ctx: RequestContext) -> Response {
    let values = ["alpha", "beta", "gamma"].to_vec();
    let value = values[black_box(9)];
    tracing::debug!(value, "Value selected");
    unexpected_success(&ctx)
}

pub async fn divide_by_zero(ctx: RequestContext) -> Response {
    let numerator: i64 = 42;
    let denominator: i64 = black_box(0);
    let ratio = numerator / denominator;
    tracing::debug!(ratio, "Ratio computed");
    unexpected_success(&ctx)
}

pub async fn nil_map_write(ctx: RequestContext) -> Response {
    let mut session: Option<HashMap<&str, &str>> = black_box(None);
    session
        .as_mut()
        .expect("assignment to entry in uninitialized map")
        .insert("tenant", "demo");
    unexpected_success(&ctx)
}
