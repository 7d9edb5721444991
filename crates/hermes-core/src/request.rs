//! The per-exchange request wrapper.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;

use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, Uri};

use crate::error::CoreError;
use crate::exchange::Exchange;
use crate::method::HttpMethod;
use crate::query::parse_query;

/// The request handed to middleware, authentication providers and endpoints.
///
/// A `Request` is built once per dispatch and borrows the exchange for the
/// duration of that dispatch. The method and query parameters are derived
/// at construction and never change afterwards.
///
/// Besides read access to the inbound request, it offers two kinds of
/// scratch storage for passing data from middleware to handlers:
///
/// - a string map ([`middleware_data`](Self::middleware_data))
/// - typed extensions keyed by type ([`set_extension`](Self::set_extension))
pub struct Request<'a> {
    exchange: &'a mut dyn Exchange,
    method: HttpMethod,
    query_parameters: HashMap<String, String>,
    body: Option<String>,
    middleware_data: HashMap<String, String>,
    extensions: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl<'a> Request<'a> {
    /// Wraps an exchange.
    ///
    /// `body` is `Some` only when a body parser ran; `None` means parsing was
    /// not attempted.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnsupportedMethod`] if the exchange's method is
    /// not one of the nine recognised methods.
    pub fn new(exchange: &'a mut dyn Exchange, body: Option<String>) -> Result<Self, CoreError> {
        let method = HttpMethod::parse(exchange.method())?;
        let query_parameters = parse_query(exchange.uri().query());
        Ok(Self {
            exchange,
            method,
            query_parameters,
            body,
            middleware_data: HashMap::new(),
            extensions: HashMap::new(),
        })
    }

    /// The request method.
    #[must_use]
    pub fn method(&self) -> HttpMethod {
        self.method
    }

    /// The request URI.
    #[must_use]
    pub fn uri(&self) -> &Uri {
        self.exchange.uri()
    }

    /// The raw request path.
    #[must_use]
    pub fn path(&self) -> &str {
        self.exchange.uri().path()
    }

    /// All query parameters.
    #[must_use]
    pub fn query_parameters(&self) -> &HashMap<String, String> {
        &self.query_parameters
    }

    /// A single query parameter.
    #[must_use]
    pub fn query_parameter(&self, name: &str) -> Option<&str> {
        self.query_parameters.get(name).map(String::as_str)
    }

    /// The parsed body, if a body parser ran.
    #[must_use]
    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    /// The request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        self.exchange.request_headers()
    }

    /// The first value of a header, if present and valid UTF-8.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers().get(name).and_then(|v| v.to_str().ok())
    }

    /// Every value of a header that is valid UTF-8.
    #[must_use]
    pub fn header_values(&self, name: &str) -> Vec<&str> {
        self.headers()
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect()
    }

    /// The response headers staged so far.
    #[must_use]
    pub fn response_headers(&self) -> &HeaderMap {
        self.exchange.response_headers()
    }

    /// Appends a response header, keeping existing values.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidHeader`] if the name or value is invalid.
    pub fn add_response_header<K, V>(&mut self, name: K, value: V) -> Result<&mut Self, CoreError>
    where
        K: TryInto<HeaderName>,
        K::Error: fmt::Display,
        V: TryInto<HeaderValue>,
        V::Error: fmt::Display,
    {
        let (name, value) = header_pair(name, value)?;
        self.exchange.response_headers_mut().append(name, value);
        Ok(self)
    }

    /// Sets a response header, replacing existing values.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidHeader`] if the name or value is invalid.
    pub fn insert_response_header<K, V>(
        &mut self,
        name: K,
        value: V,
    ) -> Result<&mut Self, CoreError>
    where
        K: TryInto<HeaderName>,
        K::Error: fmt::Display,
        V: TryInto<HeaderValue>,
        V::Error: fmt::Display,
    {
        let (name, value) = header_pair(name, value)?;
        self.exchange.response_headers_mut().insert(name, value);
        Ok(self)
    }

    /// The peer address, when the transport knows it.
    #[must_use]
    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.exchange.remote_addr()
    }

    /// String data attached by middleware.
    #[must_use]
    pub fn middleware_data(&self) -> &HashMap<String, String> {
        &self.middleware_data
    }

    /// Mutable access to the middleware data map.
    pub fn middleware_data_mut(&mut self) -> &mut HashMap<String, String> {
        &mut self.middleware_data
    }

    /// Stores a typed extension value, replacing any previous one of the
    /// same type.
    ///
    /// ```
    /// use hermes_core::{MemoryExchange, Request};
    ///
    /// #[derive(Debug, PartialEq)]
    /// struct Tenant(&'static str);
    ///
    /// let mut exchange = MemoryExchange::get("/");
    /// let mut request = Request::new(&mut exchange, None).unwrap();
    /// request.set_extension(Tenant("acme"));
    /// assert_eq!(request.extension::<Tenant>(), Some(&Tenant("acme")));
    /// ```
    pub fn set_extension<T: Send + Sync + 'static>(&mut self, value: T) {
        self.extensions.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Retrieves a typed extension value.
    #[must_use]
    pub fn extension<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions
            .get(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast_ref::<T>())
    }

    /// Removes and returns a typed extension value.
    pub fn remove_extension<T: Send + Sync + 'static>(&mut self) -> Option<T> {
        self.extensions
            .remove(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast::<T>().ok())
            .map(|boxed| *boxed)
    }

    /// The underlying exchange.
    pub fn exchange_mut(&mut self) -> &mut dyn Exchange {
        &mut *self.exchange
    }
}

fn header_pair<K, V>(name: K, value: V) -> Result<(HeaderName, HeaderValue), CoreError>
where
    K: TryInto<HeaderName>,
    K::Error: fmt::Display,
    V: TryInto<HeaderValue>,
    V::Error: fmt::Display,
{
    let name = name.try_into().map_err(CoreError::invalid_header)?;
    let value = value.try_into().map_err(CoreError::invalid_header)?;
    Ok((name, value))
}

impl fmt::Debug for Request<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("uri", self.exchange.uri())
            .field("query_parameters", &self.query_parameters)
            .field("body", &self.body)
            .field("middleware_data", &self.middleware_data)
            .field("extensions", &self.extensions.len())
            .finish()
    }
}
