//! Shared helpers for the integration tests.

use std::sync::Once;

use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Installs a test-friendly tracing subscriber once per test binary.
///
/// Honors `RUST_LOG`, defaulting to `bounded_cache=debug`.
pub fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("bounded_cache=debug")),
            )
            .with_test_writer()
            .try_init();
    });
}
