//! Log output for applications embedding the executor.
//!
//! The library only emits `tracing` events and spans; installing a subscriber is left to the
//! application. [`Telemetry`] is a ready-made one: a `fmt` layer filtered by `RUST_LOG`,
//! falling back to a default directive (`info`) when `RUST_LOG` is unset or invalid.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone)]
pub struct Telemetry {
    default_directive: String,
}

impl Default for Telemetry {
    fn default() -> Self {
        Self::new()
    }
}

impl Telemetry {
    pub fn new() -> Self {
        Self {
            default_directive: "info".to_string(),
        }
    }

    /// Filter used when `RUST_LOG` is not set, e.g. `"gas_sponsor=debug,info"`.
    pub fn with_default_directive(mut self, directive: impl Into<String>) -> Self {
        self.default_directive = directive.into();
        self
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&self.default_directive))
    }

    /// Installs the subscriber globally. Fails if one is already installed.
    pub fn register(self) -> Result<(), TryInitError> {
        tracing_subscriber::registry()
            .with(self.filter())
            .with(tracing_subscriber::fmt::layer())
            .try_init()?;
        tracing::debug!("Log subscriber installed");
        Ok(())
    }
}
