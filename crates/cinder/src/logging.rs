//! Tracing subscriber setup.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::{CinderError, LoggingConfig};

/// Installs the global subscriber.
///
/// `RUST_LOG` wins over `config.level` when it is set. Fails if a
/// subscriber is already installed.
pub fn init(config: &LoggingConfig) -> Result<(), CinderError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    if config.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_target(false))
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false))
            .try_init()?;
    }
    Ok(())
}
