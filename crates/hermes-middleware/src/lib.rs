//! # Hermes Middleware
//!
//! Middleware chains and built-in units for the Hermes dispatch pipeline.
//!
//! A chain is built per phase from the server-scoped units followed by the
//! endpoint-scoped units, then stable-sorted by priority. Lower priorities
//! run first, so same-priority units keep server-before-endpoint and
//! registration order.
//!
//! ```text
//! OPTIONS  → handle_options on every unit (server, then endpoint)
//! other    → pre-auth chain → authentication → post-auth chain
//! ```
//!
//! ## Built-in units
//!
//! | Unit | Phase | Priority | Purpose |
//! |------|-------|----------|---------|
//! | [`CorsAnywhereMiddleware`] | pre-auth | lowest | allow any origin |
//! | [`RequestIdMiddleware`] | pre-auth | highest | propagate or generate `x-request-id` |
//! | [`FnMiddleware`] | configurable | configurable | closure-backed unit |
//!
//! ## Built-in providers
//!
//! - [`BearerTokenProvider`]: `Authorization: Bearer <token>`
//! - [`ApiKeyProvider`]: `x-api-key` (or a custom header)

#![doc(html_root_url = "https://docs.rs/hermes-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod chain;
mod function;
pub mod providers;
pub mod stages;

pub use chain::{run_options_hooks, MiddlewareChain};
pub use function::FnMiddleware;
pub use providers::{ApiKeyProvider, BearerTokenProvider};
pub use stages::request_id::RequestId;
pub use stages::{CorsAnywhereMiddleware, RequestIdMiddleware};
