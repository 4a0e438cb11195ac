//! Logging Infrastructure
//!
//! `RUST_LOG` wins over `LOG_LEVEL`; text output by default, JSON when
//! `LOG_JSON=true`, daily rolling files when `LOG_DIR` is set.

use std::path::Path;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::util::TryInitError;

/// Initialize the logger (stdout, info)
pub fn init_logger() -> Result<(), TryInitError> {
    init_logger_with_file(None, None, None)
}

/// Initialize the logger with optional JSON format and file output
pub fn init_logger_with_file(
    log_level: Option<&str>,
    json: Option<bool>,
    log_dir: Option<&str>,
) -> Result<(), TryInitError> {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let level = log_level.unwrap_or("info");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("barber_server={level},tower_http={level},security={level}"))
    });
    let json = json.unwrap_or(false);

    let file_appender = log_dir
        .map(Path::new)
        .filter(|p| std::fs::create_dir_all(p).is_ok())
        .map(|p| tracing_appender::rolling::daily(p, "barber-server"));

    let registry = tracing_subscriber::registry().with(filter);

    match (file_appender, json) {
        (Some(appender), true) => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(appender))
            .try_init(),
        (Some(appender), false) => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(appender),
            )
            .try_init(),
        (None, true) => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
        (None, false) => registry
            .with(tracing_subscriber::fmt::layer().with_target(false))
            .try_init(),
    }
}
