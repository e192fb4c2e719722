//! OS signal handling: SIGINT/SIGTERM request shutdown, SIGHUP reloads config.

use tokio::sync::watch;

/// Listens for OS signals and turns them into shutdown / reload actions.
pub struct SignalHandler {
    shutdown_tx: watch::Sender<bool>,
}

impl SignalHandler {
    /// Create a handler and a receiver that flips to `true` on shutdown.
    pub fn new() -> (Self, watch::Receiver<bool>) {
        let (tx, rx) = watch::channel(false);
        (Self { shutdown_tx: tx }, rx)
    }

    /// Run until a shutdown signal arrives, calling `reload_fn` on each SIGHUP.
    pub async fn run<F>(self, reload_fn: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        wait_for_shutdown(reload_fn).await;
        let _ = self.shutdown_tx.send(true);
    }
}

#[cfg(unix)]
async fn wait_for_shutdown<F: Fn()>(reload_fn: F) {
    use tokio::signal::unix::{SignalKind, signal};

    let (mut sigterm, mut sighup) = match (
        signal(SignalKind::terminate()),
        signal(SignalKind::hangup()),
    ) {
        (Ok(term), Ok(hup)) => (term, hup),
        (Err(e), _) | (_, Err(e)) => {
            tracing::warn!(
                error = %e,
                "Unix signal handlers unavailable; only Ctrl+C will stop the server"
            );
            ctrl_c().await;
            return;
        }
    };

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received SIGINT, shutting down");
                return;
            }
            _ = sigterm.recv() => {
                tracing::info!("Received SIGTERM, shutting down");
                return;
            }
            _ = sighup.recv() => {
                tracing::info!("Received SIGHUP, reloading configuration");
                reload_fn();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown<F: Fn()>(_reload_fn: F) {
    ctrl_c().await;
}

async fn ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Received Ctrl+C, shutting down"),
        Err(e) => {
            tracing::error!(error = %e, "Ctrl+C handler failed; waiting forever");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_handler_construction() {
        let (handler, rx) = SignalHandler::new();
        assert!(!*rx.borrow());
        let _ = handler.shutdown_tx.send(true);
        assert!(*rx.borrow());
    }
}
