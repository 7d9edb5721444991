//! # Hermes Core
//!
//! Core contracts for the Hermes dispatch pipeline.
//!
//! This crate provides the leaf types every other Hermes crate builds on:
//!
//! - [`HttpMethod`] - The nine HTTP methods the pipeline models
//! - [`ResponseType`] / [`ExceptionMode`] - Response family and error disclosure policy
//! - [`Exchange`] - The transport seam (one inbound request, one outbound response)
//! - [`Request`] - Per-exchange request wrapper handed to middleware and endpoints
//! - [`Authentication`] / [`AuthenticationProvider`] - Caller identity resolution
//! - [`Middleware`] - Cancellable pre/post authentication units
//! - [`Endpoint`] / [`EndpointContract`] - Endpoint logic and its dispatch policy
//! - [`HttpResponse`] - Response models that render themselves onto an exchange
//! - [`Failure`] - The error type user code reports failures with

#![doc(html_root_url = "https://docs.rs/hermes-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod auth;
pub mod body;
mod consumer;
mod endpoint;
mod error;
mod exchange;
mod method;
mod middleware;
mod policy;
pub mod query;
mod request;
pub mod response;

pub use auth::{
    Authentication, AuthenticationProvider, AuthorizationDecision, FnProvider, Identity,
    SharedAuthentication,
};
pub use body::{BodyParser, RawBodyParser, Utf8BodyParser};
pub use consumer::{ExceptionConsumer, FnConsumer};
pub use endpoint::{BodyParsing, Endpoint, EndpointContract, EndpointContractBuilder, FnEndpoint};
pub use error::{CoreError, CoreResult, Failure, HandlerError, PanicError};
pub use exchange::{Exchange, MemoryExchange};
pub use method::HttpMethod;
pub use middleware::{Middleware, MiddlewareOutcome, MiddlewarePhase, MiddlewarePriority};
pub use policy::{ExceptionMode, ResponseType};
pub use request::Request;
pub use response::{
    BoxResponse, EmptyResponse, HttpResponse, JsonResponse, RedirectKind, RedirectResponse,
    TextMime, TextResponse,
};
