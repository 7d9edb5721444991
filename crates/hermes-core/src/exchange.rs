//! The transport seam.
//!
//! An [`Exchange`] is one inbound HTTP request paired with the ability to
//! write exactly one response. Hermes never owns sockets; a listener adapts
//! whatever it accepted into an `Exchange` and hands it to the dispatcher.

use std::io::{Cursor, Read};
use std::net::SocketAddr;

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, StatusCode, Uri};
use http_body_util::Full;

use crate::error::CoreError;

/// One HTTP request/response exchange provided by the transport.
pub trait Exchange {
    /// The raw request method string as received.
    fn method(&self) -> &str;

    /// The request URI (path and query).
    fn uri(&self) -> &Uri;

    /// The request headers.
    fn request_headers(&self) -> &HeaderMap;

    /// The request body byte stream.
    fn request_body(&mut self) -> &mut dyn Read;

    /// The peer address, when the transport knows it.
    fn remote_addr(&self) -> Option<SocketAddr>;

    /// Response headers staged so far.
    fn response_headers(&self) -> &HeaderMap;

    /// Mutable access to the staged response headers.
    fn response_headers_mut(&mut self) -> &mut HeaderMap;

    /// Sends the status, staged headers and body.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::AlreadySent`] on a second call, or
    /// [`CoreError::Transport`] if the write fails.
    fn send(&mut self, status: StatusCode, body: Bytes) -> Result<(), CoreError>;

    /// Whether a response has been sent.
    fn is_sent(&self) -> bool;
}

/// An in-memory [`Exchange`].
///
/// Used by listeners that buffer the whole request (hyper services collect
/// the body first) and by tests.
///
/// # Example
///
/// ```
/// use hermes_core::{Exchange, MemoryExchange};
/// use http::StatusCode;
///
/// let mut exchange = MemoryExchange::get("/health?verbose=1");
/// assert_eq!(exchange.method(), "GET");
/// assert_eq!(exchange.uri().query(), Some("verbose=1"));
///
/// exchange.send(StatusCode::OK, "up".into()).unwrap();
/// assert!(exchange.send(StatusCode::OK, "again".into()).is_err());
/// ```
#[derive(Debug)]
pub struct MemoryExchange {
    method: String,
    uri: Uri,
    request_headers: HeaderMap,
    body: Cursor<Bytes>,
    remote_addr: Option<SocketAddr>,
    response_headers: HeaderMap,
    response: Option<(StatusCode, Bytes)>,
}

impl MemoryExchange {
    /// Creates an exchange for the given raw method and URI.
    #[must_use]
    pub fn new(method: impl Into<String>, uri: Uri) -> Self {
        Self {
            method: method.into(),
            uri,
            request_headers: HeaderMap::new(),
            body: Cursor::new(Bytes::new()),
            remote_addr: None,
            response_headers: HeaderMap::new(),
            response: None,
        }
    }

    /// Creates a `GET` exchange for a static URI.
    ///
    /// # Panics
    ///
    /// Panics if `uri` is not a valid URI.
    #[must_use]
    pub fn get(uri: &'static str) -> Self {
        Self::new("GET", Uri::from_static(uri))
    }

    /// Creates an exchange from a buffered `http::Request`.
    #[must_use]
    pub fn from_request(request: http::Request<Bytes>) -> Self {
        let (parts, body) = request.into_parts();
        Self {
            method: parts.method.as_str().to_string(),
            uri: parts.uri,
            request_headers: parts.headers,
            body: Cursor::new(body),
            remote_addr: parts.extensions.get::<SocketAddr>().copied(),
            response_headers: HeaderMap::new(),
            response: None,
        }
    }

    /// Appends a request header.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.request_headers.append(name, value);
        self
    }

    /// Sets the request body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Cursor::new(body.into());
        self
    }

    /// Sets the peer address.
    #[must_use]
    pub fn with_remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    /// The status sent, if any.
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        self.response.as_ref().map(|(status, _)| *status)
    }

    /// The body sent, if any.
    #[must_use]
    pub fn response_body(&self) -> Option<&Bytes> {
        self.response.as_ref().map(|(_, body)| body)
    }

    /// Converts the sent response into an `http::Response`.
    ///
    /// An exchange that never sent anything becomes an empty `500`.
    #[must_use]
    pub fn into_response(self) -> http::Response<Full<Bytes>> {
        let (status, body) = self
            .response
            .unwrap_or((StatusCode::INTERNAL_SERVER_ERROR, Bytes::new()));
        let mut response = http::Response::new(Full::new(body));
        *response.status_mut() = status;
        *response.headers_mut() = self.response_headers;
        response
    }
}

impl Exchange for MemoryExchange {
    fn method(&self) -> &str {
        &self.method
    }

    fn uri(&self) -> &Uri {
        &self.uri
    }

    fn request_headers(&self) -> &HeaderMap {
        &self.request_headers
    }

    fn request_body(&mut self) -> &mut dyn Read {
        &mut self.body
    }

    fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    fn response_headers(&self) -> &HeaderMap {
        &self.response_headers
    }

    fn response_headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.response_headers
    }

    fn send(&mut self, status: StatusCode, body: Bytes) -> Result<(), CoreError> {
        if self.response.is_some() {
            return Err(CoreError::AlreadySent);
        }
        self.response = Some((status, body));
        Ok(())
    }

    fn is_sent(&self) -> bool {
        self.response.is_some()
    }
}
