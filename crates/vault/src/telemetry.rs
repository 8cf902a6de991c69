//! Tracing subscriber setup for processes embedding the vault.
//!
//! # Telemetry invariants
//!
//! - **No plaintext, envelope, or key material** in any span or log field.
//!   Only bookmark ids, counts and durations are recorded.
//! - Log level is configurable via `LOG_LEVEL` (default: `info`); `RUST_LOG`
//!   takes precedence when set.
//! - A malformed `LOG_LEVEL` is a startup error, not a silent fallback.

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

/// Initialise the global tracing subscriber with one flat JSON object per
/// event.
///
/// # Errors
///
/// Returns an error if `log_level` is not a valid filter directive or if a
/// global subscriber has already been set.
pub fn init(log_level: &str) -> Result<()> {
    let filter = match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(from_env) if !from_env.trim().is_empty() => directives(&from_env)
            .with_context(|| format!("invalid {}", EnvFilter::DEFAULT_ENV))?,
        _ => directives(log_level).context("invalid LOG_LEVEL")?,
    };

    tracing_subscriber::fmt()
        .json()
        .flatten_event(true)
        .with_current_span(false)
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("vault tracing subscriber already set: {e}"))
}

fn directives(spec: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(spec).map_err(|e| anyhow::anyhow!("{spec:?}: {e}"))
}
