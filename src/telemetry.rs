//! Tracing setup for hosts embedding the dialogs.

use anyhow::{Context, Result};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "info,sweepstake_admin=debug";

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` takes precedence over the built-in filter. Fails when a global
/// subscriber is already installed.
pub fn init_tracing() -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .context("failed to install tracing subscriber")
}
