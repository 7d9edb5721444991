//! Server-wide settings shared by every dispatcher.

use std::fmt;
use std::sync::Arc;

use hermes_core::{
    AuthenticationProvider, ExceptionConsumer, ExceptionMode, Middleware, ResponseType,
};

/// One immutable snapshot of the server-level configuration.
///
/// Snapshots are published atomically; a dispatch loads one snapshot and
/// uses it for its whole run, so it never observes a half-applied change.
#[derive(Clone)]
pub struct ServerSettings {
    /// Response type for endpoints without an override.
    pub default_response_type: ResponseType,
    /// Exception mode for endpoints without an override. Never `Inherit`.
    pub exception_mode: ExceptionMode,
    /// Server-scoped authentication providers, in registration order.
    pub providers: Vec<Arc<dyn AuthenticationProvider>>,
    /// Server-scoped middleware, in registration order.
    pub middlewares: Vec<Arc<dyn Middleware>>,
    /// Exception consumers, in registration order.
    pub consumers: Vec<Arc<dyn ExceptionConsumer>>,
    /// Body limit for endpoints using the default body parser.
    pub max_body_bytes: Option<usize>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            default_response_type: ResponseType::default(),
            exception_mode: ExceptionMode::DEFAULT,
            providers: Vec::new(),
            middlewares: Vec::new(),
            consumers: Vec::new(),
            max_body_bytes: None,
        }
    }
}

impl fmt::Debug for ServerSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerSettings")
            .field("default_response_type", &self.default_response_type)
            .field("exception_mode", &self.exception_mode)
            .field(
                "providers",
                &self.providers.iter().map(|p| p.name()).collect::<Vec<_>>(),
            )
            .field(
                "middlewares",
                &self.middlewares.iter().map(|m| m.name()).collect::<Vec<_>>(),
            )
            .field("consumers", &self.consumers.len())
            .field("max_body_bytes", &self.max_body_bytes)
            .finish()
    }
}
