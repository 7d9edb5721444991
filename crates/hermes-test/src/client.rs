//! In-memory test client.

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use hermes_server::Server;
use serde::Serialize;

use crate::error::TestError;
use crate::request::TestRequestBuilder;
use crate::response::TestResponse;

/// Drives a [`Server`] with in-memory exchanges.
///
/// Requests go through the full dispatch pipeline; no socket is opened.
///
/// # Example
///
/// ```
/// use hermes_core::{EndpointContract, FnEndpoint, HttpResponse, TextResponse};
/// use hermes_server::Server;
/// use hermes_test::TestClient;
///
/// let server = Server::new();
/// server
///     .add_endpoint(
///         "/hello",
///         EndpointContract::new(FnEndpoint::new(|request, _auth| {
///             let name = request.query_parameter("name").unwrap_or("world");
///             Ok(TextResponse::new(format!("hello {name}")).boxed())
///         })),
///     )
///     .unwrap();
///
/// let client = TestClient::new(server);
/// let response = client.get("/hello").query("name", "hermes").send();
/// assert_eq!(response.text().unwrap(), "hello hermes");
/// ```
#[must_use]
#[derive(Debug, Clone)]
pub struct TestClient {
    server: Arc<Server>,
    default_headers: Vec<(String, String)>,
}

impl TestClient {
    /// Creates a client owning `server`.
    pub fn new(server: Server) -> Self {
        Self::shared(Arc::new(server))
    }

    /// Creates a client for a shared server.
    pub fn shared(server: Arc<Server>) -> Self {
        Self {
            server,
            default_headers: Vec::new(),
        }
    }

    /// The server under test.
    #[must_use]
    pub fn server(&self) -> &Server {
        &self.server
    }

    /// Adds a header sent with every request.
    pub fn with_default_header(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    /// A `GET` request.
    pub fn get(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request("GET", uri)
    }

    /// A `POST` request.
    pub fn post(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request("POST", uri)
    }

    /// A `PUT` request.
    pub fn put(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request("PUT", uri)
    }

    /// A `PATCH` request.
    pub fn patch(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request("PATCH", uri)
    }

    /// A `DELETE` request.
    pub fn delete(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request("DELETE", uri)
    }

    /// An `OPTIONS` request.
    pub fn options(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request("OPTIONS", uri)
    }

    /// A `HEAD` request.
    pub fn head(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request("HEAD", uri)
    }

    /// A request with an arbitrary method string.
    pub fn request(&self, method: impl Into<String>, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        let mut builder = TestRequestBuilder::new(method, uri);
        for (name, value) in &self.default_headers {
            builder = builder.header(name, value);
        }
        TestClientRequest {
            client: self,
            builder,
        }
    }

    fn dispatch(&self, builder: TestRequestBuilder) -> Result<TestResponse, TestError> {
        let mut exchange = builder.build()?;
        self.server.route(&mut exchange);
        Ok(TestResponse::from_exchange(&exchange))
    }
}

/// A request bound to a [`TestClient`].
#[must_use]
pub struct TestClientRequest<'a> {
    client: &'a TestClient,
    builder: TestRequestBuilder,
}

impl TestClientRequest<'_> {
    /// Appends a header.
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.builder = self.builder.header(name, value);
        self
    }

    /// Sets `Authorization: Bearer <token>`.
    pub fn bearer_token(mut self, token: impl AsRef<str>) -> Self {
        self.builder = self.builder.bearer_token(token);
        self
    }

    /// Appends a query parameter.
    pub fn query(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.builder = self.builder.query(name, value);
        self
    }

    /// Sets the raw body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.builder = self.builder.body(body);
        self
    }

    /// Sets a JSON body.
    pub fn json<T: Serialize>(mut self, value: &T) -> Self {
        self.builder = self.builder.json(value);
        self
    }

    /// Sets the peer address.
    pub fn remote_addr(mut self, addr: SocketAddr) -> Self {
        self.builder = self.builder.remote_addr(addr);
        self
    }

    /// Sends the request.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built; use
    /// [`try_send`](Self::try_send) to handle that.
    pub fn send(self) -> TestResponse {
        self.try_send().expect("request should build")
    }

    /// Sends the request.
    ///
    /// # Errors
    ///
    /// Returns the error recorded while building the request.
    pub fn try_send(self) -> Result<TestResponse, TestError> {
        self.client.dispatch(self.builder)
    }
}
