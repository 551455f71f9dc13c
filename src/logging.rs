//! Tracing subscriber initialization.
//!
//! Logs go to stderr so stdout stays free for the JSON report.

use tracing_subscriber::EnvFilter;

/// Respects `RUST_LOG`, defaults to "info". Returns `false` when a
/// subscriber was already installed.
pub fn init() -> bool {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .is_ok()
}
