//! The root configuration type.

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use crate::{ConfigError, LogFormat, LoggingConfig, ServerConfig};

/// Root configuration for a Hermes server.
///
/// ```
/// use hermes_config::HermesConfig;
///
/// let config = HermesConfig::default();
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct HermesConfig {
    /// Server defaults.
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl HermesConfig {
    /// Development preset: pretty `debug` logs.
    #[must_use]
    pub fn development() -> Self {
        Self {
            logging: LoggingConfig {
                level: "debug".to_string(),
                format: LogFormat::Pretty,
                ..LoggingConfig::default()
            },
            ..Self::default()
        }
    }

    /// Production preset: JSON `info` logs.
    #[must_use]
    pub fn production() -> Self {
        Self::default()
    }

    /// Validates values serde cannot check on its own.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for a zero body limit or an
    /// unparseable log filter.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.max_body_bytes == Some(0) {
            return Err(ConfigError::invalid_value(
                "server.max_body_bytes",
                "must be greater than 0",
            ));
        }

        if let Err(err) = EnvFilter::try_new(&self.logging.level) {
            return Err(ConfigError::invalid_value(
                "logging.level",
                format!("invalid filter {:?}: {err}", self.logging.level),
            ));
        }

        Ok(())
    }
}
