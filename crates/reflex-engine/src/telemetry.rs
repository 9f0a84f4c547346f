//! Tracing setup for binaries and tests embedding the engine.

use tracing_subscriber::EnvFilter;

/// Install the global subscriber, driven by `REFLEX_LOG` (falling back
/// to `info`). Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_env("REFLEX_LOG")
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
