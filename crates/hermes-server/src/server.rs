//! The endpoint registry and server-level settings.

use std::sync::Arc;

use arc_swap::ArcSwap;
use hermes_config::ServerConfig;
use hermes_core::{
    AuthenticationProvider, EndpointContract, ExceptionConsumer, ExceptionMode, Exchange,
    HttpResponse, Middleware, ResponseType,
};
use indexmap::IndexMap;
use parking_lot::RwLock;
use tracing::{debug, error, info};

use crate::dispatch::{last_resort, Dispatcher};
use crate::error::{ServerError, ServerResult};
use crate::settings::ServerSettings;

/// Hermes server: a registry of endpoints bound to exact paths, plus the
/// server-scoped defaults, providers, middleware and exception consumers.
///
/// Settings changes are published as a new immutable snapshot; a dispatch
/// already in flight keeps the snapshot it started with. Registration is
/// meant to happen before traffic starts.
///
/// # Example
///
/// ```
/// use hermes_core::{EndpointContract, FnEndpoint, HttpMethod, HttpResponse, MemoryExchange, TextResponse};
/// use hermes_server::Server;
///
/// let server = Server::new();
/// server
///     .add_endpoint(
///         "/ping",
///         EndpointContract::builder(FnEndpoint::new(|_request, _auth| {
///             Ok(TextResponse::new("pong").boxed())
///         }))
///         .method(HttpMethod::Get)
///         .build(),
///     )
///     .unwrap();
///
/// let mut exchange = MemoryExchange::get("/ping");
/// server.handle("/ping", &mut exchange);
/// assert_eq!(exchange.response_body().unwrap().as_ref(), b"pong");
/// ```
pub struct Server {
    settings: Arc<ArcSwap<ServerSettings>>,
    endpoints: RwLock<IndexMap<String, Arc<Dispatcher>>>,
}

impl Server {
    /// Creates a server with JSON responses and the `message` exception mode.
    #[must_use]
    pub fn new() -> Self {
        Self::with_settings(ServerSettings::default())
    }

    /// Creates a server from configuration.
    ///
    /// `inherit` as the exception mode resolves to [`ExceptionMode::DEFAULT`].
    #[must_use]
    pub fn from_config(config: &ServerConfig) -> Self {
        Self::with_settings(ServerSettings {
            default_response_type: config.default_response_type,
            exception_mode: config.exception_mode.or_inherit(ExceptionMode::DEFAULT),
            max_body_bytes: config.max_body_bytes,
            ..ServerSettings::default()
        })
    }

    fn with_settings(settings: ServerSettings) -> Self {
        Self {
            settings: Arc::new(ArcSwap::from_pointee(settings)),
            endpoints: RwLock::new(IndexMap::new()),
        }
    }

    /// The current settings snapshot.
    #[must_use]
    pub fn settings(&self) -> Arc<ServerSettings> {
        self.settings.load_full()
    }

    /// The default response type.
    #[must_use]
    pub fn default_response_type(&self) -> ResponseType {
        self.settings.load().default_response_type
    }

    /// The server exception mode. Never `Inherit`.
    #[must_use]
    pub fn exception_mode(&self) -> ExceptionMode {
        self.settings.load().exception_mode
    }

    /// Sets the response type used by endpoints without an override.
    pub fn set_default_response_type(&self, response_type: ResponseType) -> &Self {
        self.update(|settings| settings.default_response_type = response_type)
    }

    /// Sets the server exception mode.
    ///
    /// `Inherit` has no parent at this level and resolves to
    /// [`ExceptionMode::DEFAULT`].
    pub fn set_exception_mode(&self, mode: ExceptionMode) -> &Self {
        let resolved = mode.or_inherit(ExceptionMode::DEFAULT);
        self.update(|settings| settings.exception_mode = resolved)
    }

    /// Sets the body limit applied by the default body parser.
    pub fn set_max_body_bytes(&self, limit: Option<usize>) -> &Self {
        self.update(|settings| settings.max_body_bytes = limit)
    }

    /// Appends a server-scoped authentication provider.
    ///
    /// Server providers are consulted after the endpoint's own providers,
    /// and only by endpoints that opt in.
    pub fn add_authentication_provider(&self, provider: impl AuthenticationProvider) -> &Self {
        let provider: Arc<dyn AuthenticationProvider> = Arc::new(provider);
        self.update(|settings| settings.providers.push(Arc::clone(&provider)))
    }

    /// Appends a server-scoped middleware unit, which runs for every endpoint.
    pub fn add_middleware(&self, middleware: impl Middleware) -> &Self {
        let middleware: Arc<dyn Middleware> = Arc::new(middleware);
        self.update(|settings| settings.middlewares.push(Arc::clone(&middleware)))
    }

    /// Appends an exception consumer.
    pub fn add_exception_consumer(&self, consumer: impl ExceptionConsumer) -> &Self {
        let consumer: Arc<dyn ExceptionConsumer> = Arc::new(consumer);
        self.update(|settings| settings.consumers.push(Arc::clone(&consumer)))
    }

    fn update(&self, apply: impl Fn(&mut ServerSettings)) -> &Self {
        self.settings.rcu(|current| {
            let mut next = ServerSettings::clone(current);
            apply(&mut next);
            next
        });
        self
    }

    /// Binds an endpoint to an exact path.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::InvalidPath`] for paths not starting with `/`
    /// and [`ServerError::DuplicateEndpoint`] if the path is taken.
    pub fn add_endpoint(
        &self,
        path: impl Into<String>,
        contract: EndpointContract,
    ) -> ServerResult<Arc<Dispatcher>> {
        let path = path.into();
        if !path.starts_with('/') {
            return Err(ServerError::InvalidPath { path });
        }

        let mut endpoints = self.endpoints.write();
        if endpoints.contains_key(&path) {
            return Err(ServerError::DuplicateEndpoint { path });
        }

        let dispatcher = Arc::new(Dispatcher::new(
            path.clone(),
            contract,
            Arc::clone(&self.settings),
        ));
        info!(path = %path, "registered endpoint");
        endpoints.insert(path, Arc::clone(&dispatcher));
        Ok(dispatcher)
    }

    /// The dispatcher bound to `path`, if any.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> Option<Arc<Dispatcher>> {
        self.endpoints.read().get(path).cloned()
    }

    /// Registered paths, in registration order.
    #[must_use]
    pub fn endpoint_paths(&self) -> Vec<String> {
        self.endpoints.read().keys().cloned().collect()
    }

    /// Dispatches an exchange to the endpoint bound to `path`.
    ///
    /// Unknown paths get a `404` in the default response type.
    pub fn handle(&self, path: &str, exchange: &mut dyn Exchange) {
        // Release the lock before dispatching.
        let dispatcher = self.endpoint(path);
        match dispatcher {
            Some(dispatcher) => dispatcher.handle(exchange),
            None => {
                debug!(path, "no endpoint registered");
                let response = self.default_response_type().error(
                    format!("No endpoint registered for {path}"),
                    http::StatusCode::NOT_FOUND,
                );
                if let Err(err) = response.render(exchange) {
                    error!(error = %err, "failed to render not-found response");
                    last_resort(exchange);
                }
            }
        }
    }

    /// Dispatches an exchange using its own request path.
    pub fn route(&self, exchange: &mut dyn Exchange) {
        let path = exchange.uri().path().to_owned();
        self.handle(&path, exchange);
    }
}

impl Default for Server {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("settings", &*self.settings.load())
            .field("endpoints", &self.endpoint_paths())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hermes_core::{EmptyResponse, FnEndpoint, FnProvider, MemoryExchange};
    use http::StatusCode;

    fn empty() -> EndpointContract {
        EndpointContract::new(FnEndpoint::new(|_request, _auth| {
            Ok(EmptyResponse::ok().boxed())
        }))
    }

    #[test]
    fn test_inherit_resolves_on_write() {
        let server = Server::new();
        server.set_exception_mode(ExceptionMode::Hide);
        assert_eq!(server.exception_mode(), ExceptionMode::Hide);
        server.set_exception_mode(ExceptionMode::Inherit);
        assert_eq!(server.exception_mode(), ExceptionMode::Message);
    }

    #[test]
    fn test_from_config() {
        let config = ServerConfig {
            default_response_type: ResponseType::Text,
            exception_mode: ExceptionMode::Inherit,
            max_body_bytes: Some(1024),
        };
        let server = Server::from_config(&config);
        assert_eq!(server.default_response_type(), ResponseType::Text);
        assert_eq!(server.exception_mode(), ExceptionMode::DEFAULT);
        assert_eq!(server.settings().max_body_bytes, Some(1024));
    }

    #[test]
    fn test_registration_order_and_duplicates() {
        let server = Server::new();
        server.add_endpoint("/b", empty()).unwrap();
        server.add_endpoint("/a", empty()).unwrap();
        assert_eq!(server.endpoint_paths(), vec!["/b", "/a"]);

        assert_eq!(
            server.add_endpoint("/a", empty()).unwrap_err(),
            ServerError::DuplicateEndpoint {
                path: "/a".to_string()
            }
        );
        assert!(matches!(
            server.add_endpoint("relative", empty()),
            Err(ServerError::InvalidPath { .. })
        ));
        assert_eq!(server.endpoint("/a").unwrap().path(), "/a");
    }

    #[test]
    fn test_snapshots_are_immutable() {
        let server = Server::new();
        let before = server.settings();
        server.add_authentication_provider(FnProvider::new(|_request| Ok(None)));
        assert!(before.providers.is_empty());
        assert_eq!(server.settings().providers.len(), 1);
    }

    #[test]
    fn test_unknown_path_is_404() {
        let server = Server::new();
        server.set_default_response_type(ResponseType::Text);
        let mut exchange = MemoryExchange::get("/missing");
        server.route(&mut exchange);
        assert_eq!(exchange.status(), Some(StatusCode::NOT_FOUND));
        assert_eq!(
            exchange.response_body().unwrap().as_ref(),
            b"No endpoint registered for /missing"
        );
    }
}
