//! Logging setup

use tracing_subscriber::EnvFilter;

/// Install a fmt subscriber. `RUST_LOG` overrides the default level.
///
/// Safe to call more than once; later calls leave the first subscriber in place.
pub fn init(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
