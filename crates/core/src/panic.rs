//! Panic-site capture.
//!
//! Once the stack has unwound to a capture boundary the frames that caused the
//! panic are gone. The hook installed here runs on the panicking thread before
//! unwinding starts and stashes the message, location and a backtrace in a
//! thread-local slot. Capture boundaries poll the panicking future on that same
//! thread, so they can take the record right after the panic is caught.
//!
//! Panics raised outside a boundary are also handed to the previously
//! installed hook, so they still reach stderr.

use futures::FutureExt;
use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::{Cell, RefCell};
use std::future::Future;
use std::panic::{AssertUnwindSafe, PanicHookInfo};
use std::sync::Once;

/// What the hook saw at the moment of the panic.
#[derive(Debug, Clone)]
pub struct PanicRecord {
    pub message: String,
    pub location: Option<String>,
    pub backtrace: String,
}

thread_local! {
    static LAST_PANIC: RefCell<Option<PanicRecord>> = const { RefCell::new(None) };
    static BOUNDARY_DEPTH: Cell<usize> = const { Cell::new(0) };
}

static INSTALL: Once = Once::new();

/// Install the recording hook. Idempotent; later calls are no-ops.
///
/// Panics caught by [`catch_panic`] are only recorded, since the boundary logs
/// them through `tracing`. Every other panic is recorded and then passed on to
/// the hook that was installed before.
pub fn install_panic_hook() {
    INSTALL.call_once(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info: &PanicHookInfo<'_>| {
            record_panic(info);
            if !in_boundary() {
                previous(info);
            }
        }));
    });
}

fn record_panic(info: &PanicHookInfo<'_>) {
    let record = PanicRecord {
        message: panic_message(info.payload()),
        location: info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column())),
        backtrace: Backtrace::force_capture().to_string(),
    };
    LAST_PANIC.with(|slot| {
        if let Ok(mut slot) = slot.try_borrow_mut() {
            *slot = Some(record);
        }
    });
}

/// Whether the current thread is polling a future inside [`catch_panic`].
pub fn in_boundary() -> bool {
    BOUNDARY_DEPTH.with(|depth| depth.get() > 0)
}

struct BoundaryScope;

impl BoundaryScope {
    fn enter() -> Self {
        BOUNDARY_DEPTH.with(|depth| depth.set(depth.get() + 1));
        BoundaryScope
    }
}

impl Drop for BoundaryScope {
    fn drop(&mut self) {
        BOUNDARY_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// Poll `fut` to completion, turning a panic into `Err(payload)`.
///
/// While the future is being polled the hook treats panics as handled here.
/// The caller is expected to log them, e.g. with [`take_stack_trace`].
pub async fn catch_panic<F: Future>(fut: F) -> Result<F::Output, Box<dyn Any + Send>> {
    let mut caught = std::pin::pin!(AssertUnwindSafe(fut).catch_unwind());
    std::future::poll_fn(|cx| {
        let _scope = BoundaryScope::enter();
        caught.as_mut().poll(cx)
    })
    .await
}

/// Take the record left by the most recent panic on this thread.
pub fn take_panic_record() -> Option<PanicRecord> {
    LAST_PANIC.with(|slot| slot.try_borrow_mut().ok().and_then(|mut s| s.take()))
}

/// Stack trace for a panic that was just caught on this thread.
///
/// Falls back to the capture site when no hook record is available.
pub fn take_stack_trace() -> String {
    match take_panic_record() {
        Some(record) => match record.location {
            Some(location) => format!("panicked at {location}\n{}", record.backtrace),
            None => record.backtrace,
        },
        None => Backtrace::force_capture().to_string(),
    }
}

/// Textual form of a panic payload.
///
/// `panic!` payloads are `&'static str` or `String`; anything else (for
/// example values raised with `std::panic::panic_any`) has no portable
/// `Display`, so only its presence is reported.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(err) = payload.downcast_ref::<Box<dyn std::error::Error + Send + Sync>>() {
        err.to_string()
    } else {
        "non-string panic payload".to_string()
    }
}
