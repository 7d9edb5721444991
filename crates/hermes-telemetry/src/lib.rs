//! Logging for Hermes services.
//!
//! - [`logging::init_logging`] installs a JSON or pretty `tracing` subscriber
//! - [`LoggingExceptionConsumer`] logs every failure the dispatcher catches
//!
//! # Example
//!
//! ```rust,ignore
//! use hermes_config::ConfigLoader;
//! use hermes_telemetry::logging::{init_logging, LogConfig};
//!
//! let config = ConfigLoader::new().with_env_prefix("HERMES").load()?;
//! init_logging(&LogConfig::from(&config.logging))?;
//! ```

#![doc(html_root_url = "https://docs.rs/hermes-telemetry/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod consumer;
mod error;
pub mod logging;

pub use consumer::LoggingExceptionConsumer;
pub use error::TelemetryError;
pub use logging::{init_logging, LogConfig};

/// Result type alias using [`TelemetryError`].
pub type TelemetryResult<T> = Result<T, TelemetryError>;
