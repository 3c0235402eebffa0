//! Diagnostic tracing for modbisect.
//!
//! # Separation of Concerns
//!
//! - **Tracing (this module)**: diagnostics via `RUST_LOG`, output to stderr.
//!   Library code only emits events; the binary installs the subscriber once.
//!
//! - **Command output (`cli`)**: the mod lists and search instructions the
//!   user reads, printed to stdout. Unaffected by `RUST_LOG`.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG`; falls back to `default_level` (from the config file)
/// when unset or invalid. Output: stderr, compact format.
///
/// # Example
/// ```bash
/// RUST_LOG=modbisect=debug modbisect start
/// ```
pub fn init(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // A second init (e.g. from tests) is harmless, so the error is dropped.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .try_init();
}
