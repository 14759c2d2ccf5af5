//! Logging & diagnostics (C13): a structured, level-filtered event
//! stream independent of the raw `--log FILE` trace of `cli::Config`.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Install the global subscriber. Filterable via `RUST_LOG`, defaulting
/// to `info` when unset or unparsable.
pub fn init() {
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}
