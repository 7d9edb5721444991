//! # Hermes Server
//!
//! Endpoint registry and dispatch pipeline for Hermes.
//!
//! - [`Server`] binds [`EndpointContract`](hermes_core::EndpointContract)s to
//!   exact paths and holds the server-scoped settings
//! - [`Dispatcher`] runs the pipeline for one endpoint
//! - [`translate`] turns caught failures into error responses

#![doc(html_root_url = "https://docs.rs/hermes-server/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod authentication;
mod dispatch;
mod error;
mod server;
mod settings;
pub mod translate;

pub use authentication::resolve_authentication;
pub use dispatch::{Dispatcher, LAST_RESORT_MESSAGE};
pub use error::{ServerError, ServerResult};
pub use server::Server;
pub use settings::ServerSettings;
