//! Diagnostic tracing.
//!
//! The engine only emits `tracing` events. A host that has no subscriber of
//! its own can install this one; hosts that already log should skip it.

use anyhow::{Result, anyhow};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_DIRECTIVE: &str = "warn";

fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
}

/// Install a compact stderr subscriber filtered by `RUST_LOG` (default `warn`).
///
/// Fails if the process already has a global subscriber.
///
/// ```bash
/// RUST_LOG=formflow=debug cargo test -- --nocapture
/// ```
pub fn try_init() -> Result<()> {
    tracing_subscriber::registry()
        .with(filter())
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .try_init()
        .map_err(|err| anyhow!("install tracing subscriber: {err}"))
}

/// Like [`try_init`], but leaves an existing subscriber in place.
pub fn init() {
    if let Err(err) = try_init() {
        tracing::debug!(error = %err, "tracing already initialized");
    }
}
