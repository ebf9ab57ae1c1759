//! Tracing/logging initialization.

use tracing_subscriber::EnvFilter;

/// Initialize tracing for the process: JSON lines on stderr, filtered by
/// `RUST_LOG` with an `info` default.
///
/// Idempotent: if a subscriber is already installed, it stays in place.
pub fn init() {
    init_with_default_filter("info");
}

/// Like [`init`], but with an explicit fallback filter for when `RUST_LOG`
/// is unset. Embedders that want quieter startup pass e.g. `"warn"`.
pub fn init_with_default_filter(default: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .json()
        .try_init();
}
