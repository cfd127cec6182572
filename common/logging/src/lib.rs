//! Minimal slog logger construction helpers shared by Lighthouse binaries and test suites.
use slog::Logger;
use sloggers::{null::NullLoggerBuilder, Build};
use std::sync::Arc;

lazy_static::lazy_static! {
    static ref TEST_LOGGER: Logger = build_test_logger();
}

/// Build a `Logger` that discards all output.
///
/// Used by default in tests and by components that have not been handed a real logger.
pub fn null_logger() -> Logger {
    let log_builder = NullLoggerBuilder;
    log_builder.build().expect("should build null logger")
}

/// Returns a clone of the process-wide test logger.
///
/// When the `test_logger` feature is enabled, log lines are printed to stderr so `cargo test --
/// --nocapture` shows them. Without the feature, log output is dropped.
pub fn test_logger() -> Logger {
    TEST_LOGGER.clone()
}

#[cfg(feature = "test_logger")]
fn build_test_logger() -> Logger {
    use slog::{o, Drain};

    let decorator = slog_term::PlainDecorator::new(std::io::stderr());
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    Logger::root(drain, o!())
}

#[cfg(not(feature = "test_logger"))]
fn build_test_logger() -> Logger {
    null_logger()
}

/// Wraps a `Logger` in an `Arc` so it can be shared cheaply between components that expect
/// owned access (e.g. connection pool customizers).
pub fn shared(log: Logger) -> Arc<Logger> {
    Arc::new(log)
}
