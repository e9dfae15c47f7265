//! Process-wide tracing setup for scanning workers.

use tracing_subscriber::{
    EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

/// Directives used when `RUST_LOG` is unset: engine summaries at `info`,
/// per-page chatter suppressed.
pub const DEFAULT_DIRECTIVES: &str =
    "info,segscan_core::segment=info,segscan_core::scanner=info";

/// Install the global subscriber: an `EnvFilter` read from `RUST_LOG`
/// (falling back to `default_directives`) and a fmt layer.
///
/// Fails if a global subscriber is already set.
pub fn init(default_directives: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directives))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .try_init()?;
    Ok(())
}
