//! Endpoint logic and the policy it is dispatched under.
//!
//! An [`Endpoint`] is the handler. An [`EndpointContract`] wraps it with
//! everything the dispatcher needs to decide whether the handler runs:
//! allowed methods, the authentication requirement, response type and
//! exception mode overrides, endpoint-scoped providers and middleware, and
//! body parsing.
//!
//! Contracts are built once at registration time and are immutable after
//! that, so they are shared between concurrent dispatches without locking.

use std::fmt;
use std::sync::Arc;

use crate::auth::{Authentication, AuthenticationProvider, AuthorizationDecision};
use crate::body::BodyParser;
use crate::error::Failure;
use crate::method::HttpMethod;
use crate::middleware::Middleware;
use crate::policy::{ExceptionMode, ResponseType};
use crate::request::Request;
use crate::response::BoxResponse;

/// Endpoint logic.
pub trait Endpoint: Send + Sync + 'static {
    /// Handles a request that passed every policy check.
    ///
    /// # Errors
    ///
    /// Any [`Failure`] is translated into an internal-error response
    /// according to the effective exception mode.
    fn handle(
        &self,
        request: &mut Request<'_>,
        authentication: Option<&dyn Authentication>,
    ) -> Result<BoxResponse, Failure>;

    /// Authorization hook, run after authentication and before post-auth
    /// middleware. Allows everything by default.
    fn authorize(
        &self,
        _authentication: Option<&dyn Authentication>,
        _request: &Request<'_>,
    ) -> AuthorizationDecision {
        AuthorizationDecision::Allow
    }
}

/// An [`Endpoint`] backed by a closure.
///
/// ```
/// use hermes_core::{EndpointContract, FnEndpoint, HttpResponse, TextResponse};
///
/// let contract = EndpointContract::builder(FnEndpoint::new(|_request, _auth| {
///     Ok(TextResponse::new("pong").boxed())
/// }))
/// .build();
/// # let _ = contract;
/// ```
pub struct FnEndpoint<F> {
    f: F,
}

impl<F> FnEndpoint<F>
where
    F: Fn(&mut Request<'_>, Option<&dyn Authentication>) -> Result<BoxResponse, Failure>
        + Send
        + Sync
        + 'static,
{
    /// Creates an endpoint from a closure.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> Endpoint for FnEndpoint<F>
where
    F: Fn(&mut Request<'_>, Option<&dyn Authentication>) -> Result<BoxResponse, Failure>
        + Send
        + Sync
        + 'static,
{
    fn handle(
        &self,
        request: &mut Request<'_>,
        authentication: Option<&dyn Authentication>,
    ) -> Result<BoxResponse, Failure> {
        (self.f)(request, authentication)
    }
}

impl<F> fmt::Debug for FnEndpoint<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnEndpoint").finish_non_exhaustive()
    }
}

/// How an endpoint's request body is read.
#[derive(Clone, Default)]
pub enum BodyParsing {
    /// The server's default parser: lossy UTF-8 with the server body limit.
    #[default]
    Default,
    /// A custom parser.
    Custom(Arc<dyn BodyParser>),
    /// No body parsing; [`Request::body`] stays `None`.
    Disabled,
}

impl fmt::Debug for BodyParsing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => f.write_str("Default"),
            Self::Custom(_) => f.write_str("Custom"),
            Self::Disabled => f.write_str("Disabled"),
        }
    }
}

/// An endpoint together with its dispatch policy.
///
/// # Example
///
/// ```
/// use hermes_core::{
///     EndpointContract, ExceptionMode, FnEndpoint, HttpMethod, HttpResponse, JsonResponse,
///     ResponseType,
/// };
///
/// let contract = EndpointContract::builder(FnEndpoint::new(|_request, _auth| {
///     Ok(JsonResponse::new(serde_json::json!({ "status": "ok" })).boxed())
/// }))
/// .methods([HttpMethod::Get, HttpMethod::Post])
/// .require_authentication(true)
/// .response_type(ResponseType::Json)
/// .exception_mode(ExceptionMode::Hide)
/// .build();
///
/// assert!(contract.is_method_allowed(HttpMethod::Get));
/// assert!(!contract.is_method_allowed(HttpMethod::Delete));
/// assert_eq!(contract.exception_mode(), Some(ExceptionMode::Hide));
/// ```
#[derive(Clone)]
pub struct EndpointContract {
    handler: Arc<dyn Endpoint>,
    allowed_methods: Vec<HttpMethod>,
    require_authentication: bool,
    use_server_auth_providers: bool,
    response_type: Option<ResponseType>,
    exception_mode: Option<ExceptionMode>,
    providers: Vec<Arc<dyn AuthenticationProvider>>,
    middlewares: Vec<Arc<dyn Middleware>>,
    body_parsing: BodyParsing,
}

impl EndpointContract {
    /// Starts building a contract around `handler`.
    pub fn builder(handler: impl Endpoint) -> EndpointContractBuilder {
        EndpointContractBuilder::new(Arc::new(handler))
    }

    /// A contract with default policy: every method, no authentication
    /// requirement, server defaults for everything else.
    pub fn new(handler: impl Endpoint) -> Self {
        Self::builder(handler).build()
    }

    /// The handler.
    #[must_use]
    pub fn handler(&self) -> &dyn Endpoint {
        self.handler.as_ref()
    }

    /// The declared allow-list in declaration order. Empty means every
    /// method is allowed.
    #[must_use]
    pub fn allowed_methods(&self) -> &[HttpMethod] {
        &self.allowed_methods
    }

    /// The methods advertised in an `Allow` header: the declared list, or
    /// all nine methods when none are declared.
    #[must_use]
    pub fn advertised_methods(&self) -> &[HttpMethod] {
        if self.allowed_methods.is_empty() {
            &HttpMethod::ALL
        } else {
            &self.allowed_methods
        }
    }

    /// Whether `method` passes method validation.
    #[must_use]
    pub fn is_method_allowed(&self, method: HttpMethod) -> bool {
        self.allowed_methods.is_empty() || self.allowed_methods.contains(&method)
    }

    /// Whether a resolved identity is mandatory.
    #[must_use]
    pub fn require_authentication(&self) -> bool {
        self.require_authentication
    }

    /// Whether server-scoped providers are tried after endpoint ones.
    #[must_use]
    pub fn use_server_auth_providers(&self) -> bool {
        self.use_server_auth_providers
    }

    /// The response type override.
    #[must_use]
    pub fn response_type(&self) -> Option<ResponseType> {
        self.response_type
    }

    /// The exception mode override. Never `Inherit`.
    #[must_use]
    pub fn exception_mode(&self) -> Option<ExceptionMode> {
        self.exception_mode
    }

    /// Endpoint-scoped providers in registration order.
    #[must_use]
    pub fn providers(&self) -> &[Arc<dyn AuthenticationProvider>] {
        &self.providers
    }

    /// Endpoint-scoped middleware in registration order.
    #[must_use]
    pub fn middlewares(&self) -> &[Arc<dyn Middleware>] {
        &self.middlewares
    }

    /// How the body is parsed.
    #[must_use]
    pub fn body_parsing(&self) -> &BodyParsing {
        &self.body_parsing
    }
}

impl fmt::Debug for EndpointContract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointContract")
            .field("allowed_methods", &self.allowed_methods)
            .field("require_authentication", &self.require_authentication)
            .field("use_server_auth_providers", &self.use_server_auth_providers)
            .field("response_type", &self.response_type)
            .field("exception_mode", &self.exception_mode)
            .field("providers", &self.providers.len())
            .field("middlewares", &self.middlewares.len())
            .field("body_parsing", &self.body_parsing)
            .finish_non_exhaustive()
    }
}

/// Builder for [`EndpointContract`].
#[must_use]
pub struct EndpointContractBuilder {
    contract: EndpointContract,
}

impl EndpointContractBuilder {
    fn new(handler: Arc<dyn Endpoint>) -> Self {
        Self {
            contract: EndpointContract {
                handler,
                allowed_methods: Vec::new(),
                require_authentication: false,
                use_server_auth_providers: true,
                response_type: None,
                exception_mode: None,
                providers: Vec::new(),
                middlewares: Vec::new(),
                body_parsing: BodyParsing::Default,
            },
        }
    }

    /// Adds one allowed method. Duplicates are ignored.
    pub fn method(mut self, method: HttpMethod) -> Self {
        if !self.contract.allowed_methods.contains(&method) {
            self.contract.allowed_methods.push(method);
        }
        self
    }

    /// Adds several allowed methods, keeping declaration order.
    pub fn methods(self, methods: impl IntoIterator<Item = HttpMethod>) -> Self {
        methods.into_iter().fold(self, Self::method)
    }

    /// Requires a resolved identity.
    pub fn require_authentication(mut self, required: bool) -> Self {
        self.contract.require_authentication = required;
        self
    }

    /// Whether server-scoped providers are consulted. Defaults to `true`.
    pub fn use_server_auth_providers(mut self, enabled: bool) -> Self {
        self.contract.use_server_auth_providers = enabled;
        self
    }

    /// Overrides the server's response type.
    pub fn response_type(mut self, response_type: ResponseType) -> Self {
        self.contract.response_type = Some(response_type);
        self
    }

    /// Overrides the server's exception mode. `Inherit` clears the override.
    pub fn exception_mode(mut self, mode: ExceptionMode) -> Self {
        self.contract.exception_mode = (!mode.is_inherit()).then_some(mode);
        self
    }

    /// Adds an endpoint-scoped authentication provider.
    pub fn provider(mut self, provider: impl AuthenticationProvider) -> Self {
        self.contract.providers.push(Arc::new(provider));
        self
    }

    /// Adds an already shared provider.
    pub fn shared_provider(mut self, provider: Arc<dyn AuthenticationProvider>) -> Self {
        self.contract.providers.push(provider);
        self
    }

    /// Adds an endpoint-scoped middleware unit.
    pub fn middleware(mut self, middleware: impl Middleware) -> Self {
        self.contract.middlewares.push(Arc::new(middleware));
        self
    }

    /// Adds an already shared middleware unit.
    pub fn shared_middleware(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.contract.middlewares.push(middleware);
        self
    }

    /// Uses a custom body parser.
    pub fn body_parser(mut self, parser: impl BodyParser) -> Self {
        self.contract.body_parsing = BodyParsing::Custom(Arc::new(parser));
        self
    }

    /// Disables body parsing.
    pub fn without_body_parsing(mut self) -> Self {
        self.contract.body_parsing = BodyParsing::Disabled;
        self
    }

    /// Finishes the contract.
    #[must_use]
    pub fn build(self) -> EndpointContract {
        self.contract
    }
}
