use super::handled_error;
use crate::AppState;
use crate::routes::{BUG_ROUTES, HEALTH_ROUTE};
use axum::extract::State;
use axum::response::{Html, IntoResponse, Response};
use bugboy_core::context::RequestContext;
use minijinja::{Environment, context};

const INDEX_TEMPLATE: &str = include_str!("../../templates/index.html");

/// Compiled index template, parsed once at startup.
pub struct IndexPage {
    env: Environment<'static>,
}

impl IndexPage {
    pub fn new() -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        env.add_template("index.html", INDEX_TEMPLATE)?;
        Ok(Self { env })
    }

    pub fn render(&self) -> Result<String, minijinja::Error> {
        self.env.get_template("index.html")?.render(context! {
            health => HEALTH_ROUTE,
            routes => BUG_ROUTES,
            version => env!("CARGO_PKG_VERSION"),
        })
    }
}

pub async fn index(State(state): State<AppState>, ctx: RequestContext) -> Response {
    match state.index.render() {
        Ok(page) => Html(page).into_response(),
        Err(e) => handled_error(&state, &ctx, e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_lists_every_route() {
        let page = IndexPage::new().unwrap().render().unwrap();
        for route in BUG_ROUTES {
            assert!(page.contains(route.path), "missing {}", route.path);
        }
        assert!(page.contains("/healthz"));
    }
}
