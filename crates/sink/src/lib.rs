//! HTTP delivery of captured errors and panics to an external monitoring
//! endpoint, behind the `ErrorReporter` capability.

pub mod event;

use async_trait::async_trait;
use bugboy_core::config::{ReporterConfig, SinkMode};
use bugboy_core::context::RequestInfo;
use bugboy_core::error::error_chain;
use bugboy_core::reporter::{ErrorReporter, panic_report_message, reporter_or_noop};
use event::{EventKind, SinkEvent};
use reqwest::Url;
use std::any::Any;
use std::error::Error as StdError;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

const API_KEY_HEADER: &str = "x-api-key";
const SERVICE_NAME: &str = "bugboy";

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("invalid sink endpoint {endpoint:?}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("no tokio runtime available to run the delivery worker")]
    NoRuntime,
}

/// Connection settings for [`HttpReporter`].
#[derive(Debug, Clone)]
pub struct SinkSettings {
    pub endpoint: String,
    pub api_key: String,
    pub environment: Option<String>,
    pub queue_capacity: usize,
    pub timeout: Duration,
}

enum Command {
    Deliver(SinkEvent),
    Flush(oneshot::Sender<()>),
}

/// Reporter that queues events and posts them as JSON from a background
/// worker. Captures never block the caller; when the queue is full the event
/// is dropped with a warning.
pub struct HttpReporter {
    tx: mpsc::Sender<Command>,
    environment: Option<String>,
}

impl HttpReporter {
    /// Validate settings and start the delivery worker on the current runtime.
    pub fn spawn(settings: SinkSettings) -> Result<Self, SinkError> {
        let endpoint = Url::parse(&settings.endpoint).map_err(|e| SinkError::InvalidEndpoint {
            endpoint: settings.endpoint.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(SinkError::InvalidEndpoint {
                endpoint: settings.endpoint.clone(),
                reason: format!("unsupported scheme {}", endpoint.scheme()),
            });
        }

        let runtime = tokio::runtime::Handle::try_current().map_err(|_| SinkError::NoRuntime)?;
        let client = reqwest::Client::builder()
            .user_agent(concat!("bugboy/", env!("CARGO_PKG_VERSION")))
            .timeout(settings.timeout)
            .build()?;

        let (tx, rx) = mpsc::channel(settings.queue_capacity.max(1));
        runtime.spawn(run_worker(client, endpoint, settings.api_key, rx));

        Ok(Self {
            tx,
            environment: settings.environment,
        })
    }

    fn event(&self, kind: EventKind, message: String) -> SinkEvent {
        SinkEvent::new(kind, message, SERVICE_NAME, self.environment.as_deref())
    }

    fn enqueue(&self, event: SinkEvent) {
        match self.tx.try_send(Command::Deliver(event)) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!("Error sink queue full; dropping event");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!("Error sink worker stopped; dropping event");
            }
        }
    }
}

#[async_trait]
impl ErrorReporter for HttpReporter {
    fn capture_error(&self, err: &(dyn StdError + 'static)) {
        self.enqueue(self.event(EventKind::Error, error_chain(err)));
    }

    fn capture_error_with_request(&self, err: &(dyn StdError + 'static), request: &RequestInfo) {
        self.enqueue(
            self.event(EventKind::Error, error_chain(err))
                .with_request(request),
        );
    }

    fn capture_panic(&self, payload: &(dyn Any + Send)) {
        self.enqueue(self.event(EventKind::Panic, panic_report_message(payload)));
    }

    fn capture_panic_with_request(&self, payload: &(dyn Any + Send), request: &RequestInfo) {
        self.enqueue(
            self.event(EventKind::Panic, panic_report_message(payload))
                .with_request(request),
        );
    }

    async fn flush(&self, timeout: Duration) {
        let (done_tx, done_rx) = oneshot::channel();
        let drained = tokio::time::timeout(timeout, async {
            if self.tx.send(Command::Flush(done_tx)).await.is_ok() {
                let _ = done_rx.await;
            }
        })
        .await;
        if drained.is_err() {
            tracing::warn!(
                timeout_ms = timeout.as_millis() as u64,
                "Error sink flush timed out; pending events may be lost"
            );
        }
    }
}

async fn run_worker(
    client: reqwest::Client,
    endpoint: Url,
    api_key: String,
    mut rx: mpsc::Receiver<Command>,
) {
    while let Some(command) = rx.recv().await {
        match command {
            Command::Deliver(event) => deliver(&client, &endpoint, &api_key, &event).await,
            Command::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
}

/// Post a single event. Failures are logged and the event is dropped.
async fn deliver(client: &reqwest::Client, endpoint: &Url, api_key: &str, event: &SinkEvent) {
    let result = client
        .post(endpoint.clone())
        .header(API_KEY_HEADER, api_key)
        .json(event)
        .send()
        .await;

    match result {
        Ok(resp) if resp.status().is_success() => {
            tracing::debug!(kind = ?event.kind, "Delivered event to error sink");
        }
        Ok(resp) => {
            tracing::warn!(status = resp.status().as_u16(), "Error sink rejected event");
        }
        Err(e) => {
            tracing::warn!(error = %error_chain(&e), "Error sink delivery failed");
        }
    }
}

/// Pick the reporter implementation for the given settings.
///
/// Never fails: any configuration problem is logged and the no-op reporter is
/// returned instead.
pub fn build_reporter(config: &ReporterConfig) -> Arc<dyn ErrorReporter> {
    reporter_or_noop(http_reporter(config))
}

fn http_reporter(config: &ReporterConfig) -> Option<Arc<dyn ErrorReporter>> {
    match config.mode() {
        SinkMode::Active { api_key, endpoint } => {
            let settings = SinkSettings {
                endpoint: endpoint.clone(),
                api_key,
                environment: config.environment.clone(),
                queue_capacity: config.queue_capacity,
                timeout: Duration::from_millis(config.timeout_ms),
            };
            match HttpReporter::spawn(settings) {
                Ok(reporter) => {
                    tracing::info!(endpoint = %endpoint, "Error sink enabled");
                    Some(Arc::new(reporter))
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Error sink disabled");
                    None
                }
            }
        }
        SinkMode::MissingEndpoint => {
            tracing::warn!(
                "BUGSTACK_API_KEY is set but no sink endpoint is configured; error sink disabled"
            );
            None
        }
        SinkMode::Disabled => {
            tracing::info!("Error sink disabled: BUGSTACK_API_KEY is not set");
            None
        }
    }
}
