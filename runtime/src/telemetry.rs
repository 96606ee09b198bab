//! Tracing bootstrap for binaries and tests.

use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Errors from tracing setup.
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// The filter directive does not parse.
    #[error("Invalid log filter {filter:?}: {reason}")]
    InvalidFilter {
        /// Offending directive
        filter: String,
        /// Parser message
        reason: String,
    },
}

/// Install a fmt subscriber filtered by `filter` (e.g. `"readmodel_auth=debug,info"`).
///
/// Returns `Ok(false)` if a global subscriber was already installed.
///
/// # Errors
///
/// Returns [`TelemetryError::InvalidFilter`] if `filter` does not parse.
pub fn init_tracing(filter: &str) -> Result<bool, TelemetryError> {
    let env_filter = EnvFilter::try_new(filter).map_err(|e| TelemetryError::InvalidFilter {
        filter: filter.to_string(),
        reason: e.to_string(),
    })?;

    let installed = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .try_init()
        .is_ok();

    if !installed {
        tracing::debug!("tracing subscriber already installed");
    }
    Ok(installed)
}
