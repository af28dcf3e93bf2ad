//! Tracing subscriber setup for hosts and integration tests.

use tracing_subscriber::{fmt, EnvFilter};

/// Install a formatted tracing subscriber honoring the `MDSYNC_LOG`
/// environment variable (falls back to `info`).
///
/// Safe to call more than once; subsequent calls are no-ops.
pub fn init_diagnostics() {
    let filter = EnvFilter::try_from_env(crate::constants::LOG_FILTER_ENV_VAR)
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
