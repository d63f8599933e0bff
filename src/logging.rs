//! Logging setup.
//!
//! Diagnostics go to stderr through `tracing-subscriber`. The default level
//! is `warn`; `RUST_LOG` can raise it (`RUST_LOG=kodlaewlong_stub=debug`).
//! Release builds on Windows have no console, so the output is only visible
//! when the stub is started from a terminal in a debug build.

use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "warn";

/// Build the filter from `RUST_LOG`, falling back to `DEFAULT_FILTER`.
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Initialize the global subscriber. Safe to call more than once; later
/// calls are ignored.
pub fn init() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .with_file(true)
        .with_line_number(true)
        .with_target(false)
        .try_init();
}
