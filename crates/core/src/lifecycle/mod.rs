//! Process lifecycle: readiness notification, signal handling and logging.

pub mod logging;
pub mod notify;
pub mod signal;

use std::net::SocketAddr;
use std::time::Duration;

/// Hooks fired at process state transitions (foreground vs systemd).
pub trait Lifecycle: Send + Sync {
    /// The listener is bound and requests are being accepted.
    fn on_ready(&self, addr: SocketAddr);
    /// A configuration reload has started.
    fn on_reloading(&self);
    /// A configuration reload finished; `recover_panics` is the new switch value.
    fn on_reloaded(&self, recover_panics: bool);
    /// The listener is closed and in-flight requests get `grace` to finish.
    fn on_stopping(&self, grace: Duration);
}

/// Foreground lifecycle: log lines only.
pub struct ForegroundLifecycle;

impl Lifecycle for ForegroundLifecycle {
    fn on_ready(&self, addr: SocketAddr) {
        tracing::info!(address = %addr, "Listening on http://{addr}");
    }

    fn on_reloading(&self) {
        tracing::info!("Reloading configuration...");
    }

    fn on_reloaded(&self, recover_panics: bool) {
        tracing::info!(recover_panics, "Configuration reloaded");
    }

    fn on_stopping(&self, grace: Duration) {
        tracing::info!(grace_secs = grace.as_secs(), "Draining in-flight requests...");
    }
}

/// Systemd lifecycle: sd-notify messages plus the foreground log lines.
pub struct SystemdLifecycle;

impl Lifecycle for SystemdLifecycle {
    fn on_ready(&self, addr: SocketAddr) {
        notify::sd_ready(&format!("listening on {addr}"));
        ForegroundLifecycle.on_ready(addr);
    }

    fn on_reloading(&self) {
        notify::sd_reloading();
        ForegroundLifecycle.on_reloading();
    }

    fn on_reloaded(&self, recover_panics: bool) {
        let status = if recover_panics {
            "serving (panic recovery on)"
        } else {
            "serving (panic recovery off)"
        };
        notify::sd_ready(status);
        ForegroundLifecycle.on_reloaded(recover_panics);
    }

    fn on_stopping(&self, grace: Duration) {
        notify::sd_stopping();
        ForegroundLifecycle.on_stopping(grace);
    }
}

/// `SystemdLifecycle` when started by systemd (`NOTIFY_SOCKET` set),
/// `ForegroundLifecycle` otherwise.
pub fn detect_lifecycle() -> Box<dyn Lifecycle> {
    if std::env::var_os("NOTIFY_SOCKET").is_some() {
        Box::new(SystemdLifecycle)
    } else {
        Box::new(ForegroundLifecycle)
    }
}
