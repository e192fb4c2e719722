//! Tracing subscriber setup with optional daily-rotated file output.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

const LOG_FILE_PREFIX: &str = "bugboy.log";

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `level`. With `to_file` set, events go to a
/// daily rotating file under `log_dir` (default `./logs`) through a
/// non-blocking writer; the returned guard must be held until exit or buffered
/// lines are lost.
pub fn init_logging(level: &str, to_file: bool, log_dir: Option<&str>) -> Option<WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if !to_file {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
        return None;
    }

    let dir = log_dir.unwrap_or("./logs");
    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::daily(
        dir,
        LOG_FILE_PREFIX,
    ));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();
    Some(guard)
}
