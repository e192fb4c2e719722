//! Application struct that encapsulates server assembly and serving logic.

use crate::cli::RunArgs;
use arc_swap::ArcSwap;
use bugboy_core::config::{Config, ConfigOverrides};
use bugboy_core::lifecycle::signal::SignalHandler;
use bugboy_core::lifecycle::{self, Lifecycle};
use bugboy_core::panic::install_panic_hook;
use bugboy_core::reporter::ErrorReporter;
use bugboy_server::{AppState, build_router};
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

/// Upper bound on delivering buffered reports at exit.
const REPORTER_FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

pub struct Application {
    config: Arc<ArcSwap<Config>>,
    config_path: String,
    overrides: ConfigOverrides,
    app_router: axum::Router,
    reporter: Arc<dyn ErrorReporter>,
    lifecycle: Box<dyn Lifecycle>,
}

impl Application {
    /// Build the application from CLI args and the (possibly failed) config
    /// file load: apply overrides, wire the reporter, state and router.
    pub fn build(args: &RunArgs, loaded: anyhow::Result<Config>) -> anyhow::Result<Self> {
        let mut config = loaded.unwrap_or_else(|e| {
            tracing::warn!(
                "Failed to load config from '{}': {e:#}, using defaults",
                args.config
            );
            Config::default()
        });

        let overrides = args.overrides();
        config.apply_overrides(&overrides);

        install_panic_hook();

        let reporter = bugboy_sink::build_reporter(&config.reporter);

        tracing::info!(
            recover_panics = config.recover_panics,
            shutdown_timeout = config.shutdown_timeout,
            "Configuration loaded"
        );
        if !config.recover_panics {
            tracing::warn!("Panic recovery is disabled; handler panics will drop connections");
        }

        let config = Arc::new(ArcSwap::from_pointee(config));
        let state = AppState::new(config.clone(), reporter.clone())?;
        let app_router = build_router(state);

        Ok(Self {
            config,
            config_path: args.config.clone(),
            overrides,
            app_router,
            reporter,
            lifecycle: lifecycle::detect_lifecycle(),
        })
    }

    /// Serve HTTP, handle signals, drain gracefully and flush the reporter.
    pub async fn serve(self) -> anyhow::Result<()> {
        let Self {
            config,
            config_path,
            overrides,
            app_router,
            reporter,
            lifecycle,
        } = self;

        let (signal_handler, shutdown_rx) = SignalHandler::new();

        // SIGHUP reload function
        let reload_config = config.clone();
        let reload_lifecycle: Arc<dyn Lifecycle> = Arc::from(lifecycle::detect_lifecycle());
        let reload_fn = move || {
            reload_lifecycle.on_reloading();
            match Config::load(&config_path) {
                Ok(mut new_cfg) => {
                    new_cfg.apply_overrides(&overrides);
                    let recover_panics = new_cfg.recover_panics;
                    if new_cfg.reporter != reload_config.load().reporter {
                        tracing::warn!("Reporter settings changed; they take effect on restart");
                    }
                    reload_config.store(Arc::new(new_cfg));
                    reload_lifecycle.on_reloaded(recover_panics);
                }
                Err(e) => {
                    tracing::error!("SIGHUP config reload failed: {e:#}");
                }
            }
        };

        tokio::spawn(signal_handler.run(reload_fn));

        let cfg = config.load();
        let addr = format!("{}:{}", cfg.host, cfg.port);
        let grace = Duration::from_secs(cfg.shutdown_timeout);
        drop(cfg);

        serve_http(&addr, app_router, shutdown_rx, &*lifecycle, grace).await?;

        reporter.flush(REPORTER_FLUSH_TIMEOUT).await;
        tracing::info!("Server shut down.");
        Ok(())
    }
}

async fn serve_http(
    addr: &str,
    app_router: axum::Router,
    shutdown_rx: tokio::sync::watch::Receiver<bool>,
    lifecycle: &dyn Lifecycle,
    grace: Duration,
) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    lifecycle.on_ready(listener.local_addr()?);

    let mut graceful_rx = shutdown_rx.clone();
    let server = axum::serve(
        listener,
        app_router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        let _ = graceful_rx.wait_for(|v| *v).await;
    })
    .into_future();

    let mut deadline_rx = shutdown_rx;
    let deadline = async move {
        if deadline_rx.wait_for(|v| *v).await.is_err() {
            std::future::pending::<()>().await;
        }
        lifecycle.on_stopping(grace);
        tokio::time::sleep(grace).await;
    };

    tokio::select! {
        result = server => result?,
        _ = deadline => {
            tracing::warn!(
                grace_secs = grace.as_secs(),
                "Shutdown grace period elapsed; dropping remaining connections"
            );
        }
    }
    Ok(())
}
