//! Typed configuration for Hermes.
//!
//! - TOML and JSON configuration files
//! - Environment variable overrides (`HERMES__SECTION__KEY`)
//! - Strict parsing (unknown fields are errors)
//! - Layered loading (defaults, then file, then environment)
//!
//! # Configuration File Format
//!
//! ```toml
//! [server]
//! default_response_type = "json"   # json | text
//! exception_mode = "message"       # stacktrace | message | type | hide | inherit
//! max_body_bytes = 1048576
//!
//! [logging]
//! enabled = true
//! level = "info"
//! format = "json"                  # json | pretty
//! ```

#![warn(missing_docs)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::HermesConfig;
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::{LogFormat, LoggingConfig, ServerConfig};
