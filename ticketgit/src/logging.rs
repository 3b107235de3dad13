//! Diagnostics and user-facing messages.
//!
//! # Separation of Concerns
//!
//! - **Tracing**: dev diagnostics via `RUST_LOG`, output to stderr. Defaults to
//!   `warn`; `TICKETGIT_DEBUG` raises it to `ticketgit=debug`.
//!
//! - **Policy messages** ([`user_warn`], [`user_error`]): one line on stderr per
//!   violation, always shown, unaffected by `RUST_LOG`.
//!
//! - **Tracking log** (`io::session_store::DebugLog`): `tracking.log` under the
//!   state root, written only in debug mode.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG`; when unset, defaults to `warn` (or `ticketgit=debug`
/// with `debug`). Output: stderr, compact format.
///
/// # Example
/// ```bash
/// RUST_LOG=ticketgit=trace ticketgit exec -- status
/// ```
pub fn init(debug: bool) {
    let default = if debug { "ticketgit=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // A second init (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .try_init();
}

/// Print a non-fatal policy violation.
pub fn user_warn(message: &str) {
    eprintln!("{}", format_warn(message));
}

/// Print a fatal policy violation or wrapper failure.
pub fn user_error(message: &str) {
    eprintln!("{}", format_error(message));
}

pub fn format_warn(message: &str) -> String {
    format!("WARN: {message}")
}

pub fn format_error(message: &str) -> String {
    format!("ERROR: {message}")
}
