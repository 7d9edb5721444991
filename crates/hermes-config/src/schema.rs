//! Configuration schema types.

use hermes_core::{ExceptionMode, ResponseType};
use serde::{Deserialize, Serialize};

/// Server section: defaults applied to endpoints without overrides.
///
/// # Example
///
/// ```
/// use hermes_config::ServerConfig;
/// use hermes_core::{ExceptionMode, ResponseType};
///
/// let config = ServerConfig {
///     default_response_type: ResponseType::Text,
///     exception_mode: ExceptionMode::Hide,
///     max_body_bytes: Some(64 * 1024),
/// };
/// # let _ = config;
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Response type for default and error responses (`json` or `text`).
    #[serde(default)]
    pub default_response_type: ResponseType,

    /// How much failure detail responses disclose. `inherit` resolves to
    /// `message` when applied to a server.
    #[serde(default)]
    pub exception_mode: ExceptionMode,

    /// Request body limit for the default body parser. Unlimited if unset.
    #[serde(default)]
    pub max_body_bytes: Option<usize>,
}

/// Log format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON formatted logs (production).
    #[default]
    Json,
    /// Human-readable pretty format (development).
    Pretty,
}

/// Logging section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Enable logging.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Log filter directive (`info`, `hermes_server=debug,warn`, ...).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}
