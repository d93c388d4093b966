//! Subscriber initialization.
//!
//! Production output is JSON, one event per line, filtered by `RUST_LOG`.
//! Every call is safe to repeat; only the first installs a subscriber.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_DIRECTIVES: &str = "info";

/// JSON logs with the default filter.
pub fn init() {
    init_with(DEFAULT_DIRECTIVES);
}

/// JSON logs, filtered by `RUST_LOG` or `fallback` when it is unset or invalid.
pub fn init_with(fallback: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false)
        .try_init();
}

/// Human-readable logs captured by the test harness.
pub fn init_for_tests() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
