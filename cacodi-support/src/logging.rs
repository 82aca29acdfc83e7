//! Subscriber setup for resolution diagnostics.
//!
//! The container reports why each constructor candidate failed only through
//! `tracing` events. These helpers install a `fmt` subscriber so those
//! events become visible.

use tracing_subscriber::EnvFilter;

/// Default filter: container debug output, everything else at `warn`.
pub const DEFAULT_FILTER: &str = "warn,cacodi=debug,cacodi_container=debug";

/// Installs a global `fmt` subscriber.
///
/// `RUST_LOG` wins over `filter` when it is set. Returns `false` if a
/// global subscriber was already installed.
///
/// ```
/// use cacodi_support::logging::init_logging;
///
/// let _ = init_logging("cacodi_container=trace");
/// ```
pub fn init_logging(filter: &str) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}

/// Installs a subscriber that writes through the test harness.
///
/// Safe to call from every test; only the first call installs anything.
pub fn init_test_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
