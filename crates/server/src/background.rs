//! Detached background work launched from request handlers.
//!
//! A background task may still be running after its response was sent and its
//! connection closed, so it cannot rely on the request recovery boundary. Each
//! task receives only by-value data (a [`RequestInfo`]) describing where it
//! came from.

use bugboy_core::context::RequestInfo;
use bugboy_core::panic::{catch_panic, panic_message, take_stack_trace};
use bugboy_core::reporter::ErrorReporter;
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Leading text of the stderr line written before a fatal abort.
pub const FATAL_PANIC_PREFIX: &str = "bugboy: unrecovered background panic, aborting:";

/// Spawn `task` with its own capture boundary: a panic is reported against a
/// synthetic request built from `origin` and logged. No response is written.
pub fn spawn_captured<F>(
    reporter: Arc<dyn ErrorReporter>,
    origin: RequestInfo,
    task: F,
) -> JoinHandle<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(payload) = catch_panic(task).await {
            let stack = take_stack_trace();
            let message = panic_message(&*payload);
            let request =
                RequestInfo::synthetic(origin.method, origin.path, origin.request_id);

            reporter.capture_panic_with_request(&*payload, &request);
            tracing::error!(
                request_id = %request.request_id,
                method = %request.method,
                path = %request.path,
                panic = %message,
                stack = %stack,
                "Background panic recovered"
            );
        }
    })
}

/// DELIBERATELY FATAL. Spawn `task` with no recovery: if it panics the panic
/// is logged and the whole process is aborted. The reporter is never told.
///
/// Abort skips destructors, so buffered log writers are not flushed; the
/// panic is also written straight to stderr.
///
/// Exists only for the fatal demo route; use [`spawn_captured`] everywhere
/// else.
pub fn spawn_fatal<F>(origin: RequestInfo, task: F) -> JoinHandle<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    spawn_fatal_with(origin, task, || std::process::abort())
}

fn spawn_fatal_with<F, T>(origin: RequestInfo, task: F, terminate: T) -> JoinHandle<()>
where
    F: Future<Output = ()> + Send + 'static,
    T: FnOnce() + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(payload) = catch_panic(task).await {
            let message = panic_message(&*payload);
            let stack = take_stack_trace();
            tracing::error!(
                request_id = %origin.request_id,
                method = %origin.method,
                path = %origin.path,
                panic = %message,
                stack = %stack,
                "Unrecovered background panic; terminating process"
            );
            eprintln!(
                "{FATAL_PANIC_PREFIX} request_id={} method={} path={} panic={message}\n{stack}",
                origin.request_id, origin.method, origin.path
            );
            terminate();
        }
    })
}
