//! # Hermes
//!
//! **Endpoint dispatch with pluggable authentication and middleware**
//!
//! Hermes owns the part of an HTTP server between "a request arrived for this
//! path" and "a response was written":
//!
//! - **Method policy** – per-endpoint allow-lists, automatic `OPTIONS` answers
//! - **Middleware** – prioritized, cancellable units before and after authentication
//! - **Authentication** – first-match provider resolution, endpoint then server scope
//! - **Failure translation** – every error or panic becomes a `500` whose detail
//!   is governed by the exception mode
//!
//! Hermes never opens sockets. A listener wraps each request in an
//! [`Exchange`](core::Exchange) and hands it to [`Server::route`](server::Server::route).
//!
//! ## Quick Start
//!
//! ```rust
//! use hermes::prelude::*;
//! use http::StatusCode;
//!
//! let server = Server::new();
//! server.add_middleware(RequestIdMiddleware::new());
//! server.add_authentication_provider(BearerTokenProvider::new(|token| {
//!     Ok((token == "s3cret").then(|| Identity::new("admin").shared()))
//! }));
//! server
//!     .add_endpoint(
//!         "/whoami",
//!         EndpointContract::builder(FnEndpoint::new(|_request, auth| {
//!             let subject = auth.and_then(|a| a.subject()).unwrap_or("anonymous");
//!             Ok(TextResponse::new(subject).boxed())
//!         }))
//!         .method(HttpMethod::Get)
//!         .require_authentication(true)
//!         .build(),
//!     )
//!     .unwrap();
//!
//! let mut exchange = MemoryExchange::get("/whoami");
//! server.route(&mut exchange);
//! assert_eq!(exchange.status(), Some(StatusCode::UNAUTHORIZED));
//! ```
//!
//! ## Pipeline
//!
//! ```text
//! body → OPTIONS? → method check → pre-auth chain → authentication
//!      → authorization → post-auth chain → handler → render
//! ```

#![doc(html_root_url = "https://docs.rs/hermes/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export core contracts
pub use hermes_core as core;

// Re-export the registry and dispatcher
pub use hermes_server as server;

// Re-export middleware and providers
pub use hermes_middleware as middleware;

// Re-export configuration
pub use hermes_config as config;

// Re-export logging setup
pub use hermes_telemetry as telemetry;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust
/// use hermes::prelude::*;
///
/// let server = Server::new();
/// server.set_default_response_type(ResponseType::Text);
/// ```
pub mod prelude {
    pub use hermes_core::{
        Authentication, AuthenticationProvider, AuthorizationDecision, BoxResponse,
        EmptyResponse, Endpoint, EndpointContract, Exchange, ExceptionConsumer, ExceptionMode,
        Failure, FnConsumer, FnEndpoint, FnProvider, HttpMethod, HttpResponse, Identity,
        JsonResponse, MemoryExchange, Middleware, MiddlewareOutcome, MiddlewarePhase,
        MiddlewarePriority, RedirectResponse, Request, ResponseType, SharedAuthentication,
        TextResponse,
    };

    pub use hermes_middleware::{
        ApiKeyProvider, BearerTokenProvider, CorsAnywhereMiddleware, FnMiddleware,
        RequestIdMiddleware,
    };

    pub use hermes_server::{Server, ServerError, ServerResult};

    pub use hermes_config::{ConfigLoader, HermesConfig};

    pub use hermes_telemetry::{init_logging, LogConfig, LoggingExceptionConsumer};
}
