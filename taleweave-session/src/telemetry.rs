//! Tracing subscriber setup.
//!
//! `RUST_LOG` wins over `general.log_level` when set. JSON output is for
//! log shippers; the default is human-readable lines.

use taleweave_core::config::GeneralConfig;
use taleweave_core::error::{Result, TaleError};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Build the filter from `RUST_LOG`, falling back to the configured level.
///
/// # Errors
///
/// Returns [`TaleError::Config`] if the configured level is not a valid directive.
pub fn env_filter(config: &GeneralConfig) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.log_level)
            .map_err(|e| TaleError::Config(format!("invalid log level '{}': {e}", config.log_level))),
    }
}

/// Install the global subscriber.
///
/// # Errors
///
/// Returns [`TaleError::Config`] if the level is invalid or a global
/// subscriber is already installed.
pub fn init_tracing(config: &GeneralConfig) -> Result<()> {
    let filter = env_filter(config)?;
    let registry = tracing_subscriber::registry().with(filter);

    let installed = if config.json_logs {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer().with_target(true)).try_init()
    };
    installed.map_err(|e| TaleError::Config(format!("tracing already initialized: {e}")))
}
