use serde::Serialize;

/// Static description of a route, rendered on the index page.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct RouteDescriptor {
    pub method: &'static str,
    pub path: &'static str,
    pub description: &'static str,
    /// Hitting this route takes the whole process down.
    pub fatal: bool,
}

const fn get(path: &'static str, description: &'static str) -> RouteDescriptor {
    RouteDescriptor {
        method: "GET",
        path,
        description,
        fatal: false,
    }
}

pub const HEALTH_ROUTE: RouteDescriptor = get("/healthz", "Liveness probe");

pub const BUG_ROUTES: &[RouteDescriptor] = &[
    get("/bugs/panic/nil-pointer", "Unwrap of an absent value panics"),
    get("/bugs/panic/index-out-of-range", "Slice index out of bounds panics"),
    get("/bugs/panic/divide-by-zero", "Integer division by zero panics"),
    get("/bugs/panic/nil-map-write", "Write to an uninitialized map panics"),
    get("/bugs/error/db-timeout", "Handled timeout wrapped like a DB failure"),
    get("/bugs/error/external-api", "Handled upstream API connectivity error"),
    get("/bugs/error/json-parse", "Handled JSON parse/type mismatch error"),
    get("/bugs/background/panic", "Background task panic (captured and logged)"),
    RouteDescriptor {
        method: "GET",
        path: "/bugs/fatal/unhandled-goroutine-panic",
        description: "Unrecovered background task panic that aborts the process",
        fatal: true,
    },
];
