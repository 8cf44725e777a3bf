//! Tracing setup for the bmrp binary.
//!
//! Diagnostics go to stderr so command output on stdout stays parseable.
//! `RUST_LOG` always wins over the level passed in.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Quiet default: warnings and errors only
pub const DEFAULT_LEVEL: &str = "warn";

pub fn init() {
    init_with_level(DEFAULT_LEVEL)
}

/// Install the global subscriber, falling back to `default_level`
/// (e.g. "debug", "bmr_core=trace") when `RUST_LOG` is unset or invalid
pub fn init_with_level(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .compact()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

/// Debug-level logging routed through the test harness; safe to call repeatedly
#[cfg(test)]
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(EnvFilter::new("debug"))
        .try_init();
}
