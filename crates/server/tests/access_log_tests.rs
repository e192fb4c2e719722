use arc_swap::ArcSwap;
use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{Request, StatusCode};
use bugboy_core::config::Config;
use bugboy_core::context::X_REQUEST_ID;
use bugboy_core::panic::install_panic_hook;
use bugboy_core::reporter::NoopReporter;
use bugboy_server::{AppState, build_router};
use serde_json::Value;
use std::io::Write;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use tracing_subscriber::fmt::MakeWriter;

// ---------------------------------------------------------------------------
// Log capture
// ---------------------------------------------------------------------------

/// In-memory sink for JSON-formatted log lines.
#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

impl LogBuffer {
    /// Events whose message equals `message`, as their `fields` objects.
    fn events(&self, message: &str) -> Vec<Value> {
        let bytes = self.0.lock().unwrap().clone();
        String::from_utf8(bytes)
            .unwrap()
            .lines()
            .filter_map(|line| serde_json::from_str::<Value>(line).ok())
            .map(|event| event["fields"].clone())
            .filter(|fields| fields["message"] == message)
            .collect()
    }
}

/// Route this thread's events into a fresh buffer until the guard drops.
fn capture_logs() -> (LogBuffer, tracing::subscriber::DefaultGuard) {
    let buffer = LogBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .json()
        .with_max_level(tracing::Level::INFO)
        .with_writer(buffer.clone())
        .finish();
    let guard = tracing::subscriber::set_default(subscriber);
    (buffer, guard)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const PEER: &str = "10.0.0.7:5555";

fn create_state() -> AppState {
    install_panic_hook();
    AppState::new(
        Arc::new(ArcSwap::from_pointee(Config::default())),
        Arc::new(NoopReporter),
    )
    .expect("failed to build state")
}

/// Send a GET from `PEER` and return (status, x-request-id).
async fn send_from_peer(state: &AppState, uri: &str) -> (StatusCode, String) {
    let mut request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let peer: SocketAddr = PEER.parse().unwrap();
    request.extensions_mut().insert(ConnectInfo(peer));

    let response = build_router(state.clone()).oneshot(request).await.unwrap();
    let request_id = response.headers()[X_REQUEST_ID].to_str().unwrap().to_string();
    (response.status(), request_id)
}

fn assert_access_line(line: &Value, request_id: &str, path: &str, status: StatusCode) {
    assert_eq!(line["request_id"], request_id);
    assert_eq!(line["method"], "GET");
    assert_eq!(line["path"], path);
    assert_eq!(line["remote_addr"], PEER);
    assert_eq!(line["status"], status.as_u16());
    assert!(line["duration_ms"].is_u64(), "duration_ms missing: {line}");
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_one_access_line_per_request() {
    let state = create_state();
    let (logs, _guard) = capture_logs();

    let (health_status, health_id) = send_from_peer(&state, "/healthz").await;
    let (panic_status, panic_id) = send_from_peer(&state, "/bugs/panic/divide-by-zero").await;

    assert_eq!(health_status, StatusCode::OK);
    assert_eq!(panic_status, StatusCode::INTERNAL_SERVER_ERROR);

    let lines = logs.events("Request completed");
    assert_eq!(lines.len(), 2, "{lines:?}");
    assert_access_line(&lines[0], &health_id, "/healthz", StatusCode::OK);
    assert_access_line(
        &lines[1],
        &panic_id,
        "/bugs/panic/divide-by-zero",
        StatusCode::INTERNAL_SERVER_ERROR,
    );
}

#[tokio::test]
async fn test_recovered_panic_logged_once_with_stack() {
    let state = create_state();
    let (logs, _guard) = capture_logs();

    let (_, request_id) = send_from_peer(&state, "/bugs/panic/index-out-of-range").await;

    let recovered = logs.events("Panic recovered");
    assert_eq!(recovered.len(), 1, "{recovered:?}");
    let event = &recovered[0];
    assert_eq!(event["request_id"], request_id.as_str());
    assert_eq!(event["path"], "/bugs/panic/index-out-of-range");
    assert!(event["panic"].as_str().unwrap().contains("index out of bounds"));
    assert!(event["stack"].as_str().unwrap().starts_with("panicked at "));
}

#[tokio::test]
async fn test_access_line_without_peer_address() {
    let state = create_state();
    let (logs, _guard) = capture_logs();

    let request = Request::builder().uri("/healthz").body(Body::empty()).unwrap();
    build_router(state).oneshot(request).await.unwrap();

    let lines = logs.events("Request completed");
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["remote_addr"], "-");
}
