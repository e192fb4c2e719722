//! Process-level tests: run the built binary and talk to it over TCP.

use serde_json::Value;
use std::io::Read;
use std::net::TcpListener;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

/// Kills the server when a test ends, whatever the outcome.
struct ServerProcess {
    child: Child,
    base_url: String,
}

impl Drop for ServerProcess {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

impl ServerProcess {
    async fn start(extra_env: &[(&str, &str)]) -> Self {
        Self::start_with(extra_env, Stdio::null()).await
    }

    async fn start_with(extra_env: &[(&str, &str)], stderr: Stdio) -> Self {
        let port = free_port();
        let mut command = Command::new(env!("CARGO_BIN_EXE_bugboy"));
        command
            .env("PORT", port.to_string())
            .env("BUGBOY_HOST", "127.0.0.1")
            .env("BUGBOY_CONFIG", "does-not-exist.yaml")
            .env("BUGBOY_LOG_LEVEL", "warn")
            .env_remove("BUGSTACK_API_KEY")
            .env_remove("BUGSTACK_ENDPOINT")
            .env_remove("BUGBOY_RECOVER_PANICS")
            .stdout(Stdio::null())
            .stderr(stderr);
        for (key, value) in extra_env {
            command.env(key, value);
        }

        let server = Self {
            child: command.spawn().expect("failed to start bugboy"),
            base_url: format!("http://127.0.0.1:{port}"),
        };
        server.wait_until_healthy().await;
        server
    }

    async fn wait_until_healthy(&self) {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + Duration::from_secs(10);
        while Instant::now() < deadline {
            if let Ok(resp) = client.get(self.url("/healthz")).send().await {
                if resp.status().is_success() {
                    return;
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        panic!("server did not become healthy at {}", self.base_url);
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn get(&self, path: &str) -> (u16, Value) {
        let resp = reqwest::get(self.url(path)).await.expect("request failed");
        let status = resp.status().as_u16();
        let body = resp.json::<Value>().await.unwrap_or(Value::Null);
        (status, body)
    }

    fn stderr(&mut self) -> String {
        let mut output = String::new();
        if let Some(mut pipe) = self.child.stderr.take() {
            let _ = pipe.read_to_string(&mut output);
        }
        output
    }

    fn wait_for_exit(&mut self, within: Duration) -> Option<ExitStatus> {
        let deadline = Instant::now() + within;
        while Instant::now() < deadline {
            if let Some(status) = self.child.try_wait().expect("try_wait failed") {
                return Some(status);
            }
            std::thread::sleep(Duration::from_millis(20));
        }
        None
    }
}

fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .and_then(|l| l.local_addr())
        .map(|a| a.port())
        .expect("no free port")
}

#[tokio::test]
async fn test_server_survives_recovered_and_background_panics() {
    let mut server = ServerProcess::start(&[]).await;

    let (status, body) = server.get("/bugs/panic/index-out-of-range").await;
    assert_eq!(status, 500);
    assert_eq!(body["error"], "panic recovered in request handler");

    let (status, body) = server.get("/bugs/background/panic").await;
    assert_eq!(status, 202);
    assert_eq!(body["status"], "queued");

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(server.wait_for_exit(Duration::ZERO).is_none());

    let (status, body) = server.get("/healthz").await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_fatal_route_terminates_process() {
    let mut server = ServerProcess::start_with(&[], Stdio::piped()).await;

    let (status, body) = server.get("/bugs/fatal/unhandled-goroutine-panic").await;
    let responded = Instant::now();
    assert_eq!(status, 202);
    assert_eq!(body["status"], "queued");

    let exit = server
        .wait_for_exit(Duration::from_secs(5))
        .expect("process should terminate after the fatal route");
    let elapsed = responded.elapsed();
    assert!(!exit.success());
    assert!(
        elapsed < Duration::from_millis(500),
        "process took {elapsed:?} to terminate"
    );

    let stderr = server.stderr();
    assert!(
        stderr.contains("unrecovered background panic, aborting"),
        "stderr was: {stderr:?}"
    );
    assert!(stderr.contains("/bugs/fatal/unhandled-goroutine-panic"));
}

#[tokio::test]
async fn test_recovery_disabled_drops_connection_but_process_lives() {
    let mut server = ServerProcess::start(&[("BUGBOY_RECOVER_PANICS", "false")]).await;

    let result = reqwest::get(server.url("/bugs/panic/nil-pointer")).await;
    assert!(result.is_err(), "no response should be written: {result:?}");

    assert!(server.wait_for_exit(Duration::from_millis(100)).is_none());
    let (status, _) = server.get("/healthz").await;
    assert_eq!(status, 200);
}
