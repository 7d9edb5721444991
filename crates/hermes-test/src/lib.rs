//! # Hermes Test
//!
//! In-memory testing for Hermes servers: requests are dispatched through
//! the full pipeline via [`MemoryExchange`](hermes_core::MemoryExchange),
//! without sockets or an async runtime.
//!
//! - [`TestClient`] sends requests to a [`Server`](hermes_server::Server)
//! - [`TestRequestBuilder`] builds exchanges (headers, query, JSON bodies)
//! - [`TestResponse`] captures the response and offers assertions
//!
//! ```
//! use hermes_core::{EndpointContract, FnEndpoint, HttpMethod, HttpResponse, TextResponse};
//! use hermes_server::Server;
//! use hermes_test::TestClient;
//! use http::StatusCode;
//!
//! let server = Server::new();
//! server
//!     .add_endpoint(
//!         "/ping",
//!         EndpointContract::builder(FnEndpoint::new(|_request, _auth| {
//!             Ok(TextResponse::new("pong").boxed())
//!         }))
//!         .method(HttpMethod::Get)
//!         .build(),
//!     )
//!     .unwrap();
//!
//! let client = TestClient::new(server);
//! client.get("/ping").send().assert_status(StatusCode::OK).assert_text("pong");
//! client.post("/ping").send().assert_status(StatusCode::METHOD_NOT_ALLOWED);
//! ```

#![doc(html_root_url = "https://docs.rs/hermes-test/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod client;
mod error;
mod request;
mod response;

pub use client::{TestClient, TestClientRequest};
pub use error::TestError;
pub use request::TestRequestBuilder;
pub use response::TestResponse;
