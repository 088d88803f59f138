//! Logging system initialization
//!
//! Sets up the tracing subscriber from the loaded configuration.
//! Call once during startup, after the configuration is available.

use crate::config::LoggingConfig;

/// Initialize the logging system.
///
/// Returns a `WorkerGuard` that must stay alive for the duration of
/// the program so buffered log writes are flushed on shutdown.
pub fn init_logging(config: &LoggingConfig) -> tracing_appender::non_blocking::WorkerGuard {
    let (non_blocking_writer, guard) = tracing_appender::non_blocking(std::io::stdout());
    let filter = tracing_subscriber::EnvFilter::new(config.level.clone());

    let subscriber_builder = tracing_subscriber::fmt()
        .with_writer(non_blocking_writer)
        .with_env_filter(filter)
        .with_level(true)
        .with_ansi(true);

    if config.format == "json" {
        subscriber_builder.json().init();
    } else {
        subscriber_builder.init();
    }

    guard
}
