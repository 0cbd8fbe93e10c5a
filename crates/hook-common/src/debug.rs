//! Logging for hook processes.
//!
//! Stdout carries the protocol line, so logs go to stderr by default. In debug
//! mode every event is also appended as JSON to a per-project log file.

use camino::{Utf8Path, Utf8PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

pub const ENV_DEBUG: &str = "MEMORY_HOOK_DEBUG";
pub const ENV_LOG_FILTER: &str = "MEMORY_HOOK_LOG";

const DEBUG_LOG_FILE: &str = "memory-hook.jsonl";

/// Check if debug mode is enabled
pub fn is_debug_enabled(project_dir: &Utf8Path) -> bool {
    // Enable via environment variable
    if std::env::var_os(ENV_DEBUG).is_some() {
        return true;
    }

    // Or check for debug marker file
    project_dir.join(".claude").join(".hook-debug").exists()
}

/// Directory holding the debug log file.
pub fn debug_log_dir(project_dir: &Utf8Path) -> Utf8PathBuf {
    project_dir.join(".claude").join("logs")
}

/// Install the global subscriber.
///
/// The returned guard flushes the debug file on drop; keep it alive until the
/// process exits. Calling this twice is harmless (the second call is a no-op).
pub fn init_logging(project_dir: &Utf8Path) -> Option<WorkerGuard> {
    let filter = || {
        EnvFilter::try_from_env(ENV_LOG_FILTER).unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    let init_stderr = || {
        let _ = tracing_subscriber::registry()
            .with(filter())
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false),
            )
            .try_init();
    };

    if !is_debug_enabled(project_dir) {
        init_stderr();
        return None;
    }

    let dir = debug_log_dir(project_dir);
    if std::fs::create_dir_all(&dir).is_err() {
        init_stderr();
        return None;
    }

    let appender = tracing_appender::rolling::never(dir.as_std_path(), DEBUG_LOG_FILE);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let _ = tracing_subscriber::registry()
        .with(EnvFilter::new("debug"))
        .with(tracing_subscriber::fmt::layer().json().with_writer(writer))
        .try_init();

    Some(guard)
}
