//! Test request building.

use std::net::SocketAddr;

use bytes::Bytes;
use hermes_core::MemoryExchange;
use http::{header, HeaderMap, HeaderName, HeaderValue, Uri};
use serde::Serialize;

use crate::error::TestError;

/// Builder for in-memory exchanges.
///
/// Errors (bad header names, unserializable JSON, invalid URIs) are kept
/// until [`build`](Self::build), so the builder chains without `?`.
///
/// ```
/// use hermes_core::Exchange;
/// use hermes_test::TestRequestBuilder;
///
/// let exchange = TestRequestBuilder::new("GET", "/search")
///     .query("q", "a b")
///     .bearer_token("t0k3n")
///     .build()
///     .unwrap();
///
/// assert_eq!(exchange.uri().query(), Some("q=a%20b"));
/// assert_eq!(exchange.request_headers()["authorization"], "Bearer t0k3n");
/// ```
#[must_use]
pub struct TestRequestBuilder {
    method: String,
    uri: String,
    query: Vec<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
    remote_addr: Option<SocketAddr>,
    error: Option<TestError>,
}

impl TestRequestBuilder {
    /// Creates a builder. `method` is kept verbatim, so unsupported methods
    /// can be tested too.
    pub fn new(method: impl Into<String>, uri: impl AsRef<str>) -> Self {
        Self {
            method: method.into(),
            uri: uri.as_ref().to_string(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
            remote_addr: None,
            error: None,
        }
    }

    /// Appends a header.
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        let name = HeaderName::try_from(name.as_ref());
        let value = HeaderValue::try_from(value.as_ref());
        match (name, value) {
            (Ok(name), Ok(value)) => {
                self.headers.append(name, value);
            }
            (Err(err), _) => self.fail(TestError::InvalidHeader(err.to_string())),
            (_, Err(err)) => self.fail(TestError::InvalidHeader(err.to_string())),
        }
        self
    }

    /// Sets `Authorization: Bearer <token>`.
    pub fn bearer_token(self, token: impl AsRef<str>) -> Self {
        self.header(
            header::AUTHORIZATION.as_str(),
            format!("Bearer {}", token.as_ref()),
        )
    }

    /// Sets the `Content-Type` header.
    pub fn content_type(self, content_type: impl AsRef<str>) -> Self {
        self.header(header::CONTENT_TYPE.as_str(), content_type)
    }

    /// Appends a percent-encoded query parameter.
    pub fn query(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.query
            .push((name.as_ref().to_string(), value.as_ref().to_string()));
        self
    }

    /// Sets the raw body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Sets a JSON body and `Content-Type: application/json`.
    pub fn json<T: Serialize>(mut self, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(bytes) => self.body = Bytes::from(bytes),
            Err(err) => self.fail(TestError::Json(err)),
        }
        self.content_type("application/json")
    }

    /// Sets the peer address.
    pub fn remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    fn fail(&mut self, error: TestError) {
        self.error.get_or_insert(error);
    }

    /// Builds the exchange.
    ///
    /// # Errors
    ///
    /// Returns the first error recorded while building, or
    /// [`TestError::RequestBuild`] for an invalid URI.
    pub fn build(self) -> Result<MemoryExchange, TestError> {
        if let Some(error) = self.error {
            return Err(error);
        }

        let mut uri = self.uri;
        if !self.query.is_empty() {
            let encoded: Vec<String> = self
                .query
                .iter()
                .map(|(name, value)| {
                    format!("{}={}", urlencoding::encode(name), urlencoding::encode(value))
                })
                .collect();
            uri.push(if uri.contains('?') { '&' } else { '?' });
            uri.push_str(&encoded.join("&"));
        }
        let uri: Uri = uri
            .parse()
            .map_err(|e| TestError::RequestBuild(format!("Invalid URI: {e}")))?;

        let mut exchange = MemoryExchange::new(self.method, uri).with_body(self.body);
        for (name, value) in &self.headers {
            exchange = exchange.with_header(name.clone(), value.clone());
        }
        if let Some(addr) = self.remote_addr {
            exchange = exchange.with_remote_addr(addr);
        }
        Ok(exchange)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hermes_core::Exchange;
    use std::io::Read;

    #[test]
    fn test_query_is_appended_and_encoded() {
        let exchange = TestRequestBuilder::new("GET", "/items?page=2")
            .query("tag", "a&b")
            .build()
            .unwrap();
        assert_eq!(exchange.uri().query(), Some("page=2&tag=a%26b"));
    }

    #[test]
    fn test_json_body() {
        let mut exchange = TestRequestBuilder::new("POST", "/users")
            .json(&serde_json::json!({ "name": "Alice" }))
            .build()
            .unwrap();
        assert_eq!(
            exchange.request_headers()[header::CONTENT_TYPE],
            "application/json"
        );
        let mut body = String::new();
        exchange.request_body().read_to_string(&mut body).unwrap();
        assert_eq!(body, r#"{"name":"Alice"}"#);
    }

    #[test]
    fn test_repeated_headers_are_kept() {
        let exchange = TestRequestBuilder::new("GET", "/")
            .header("x-tag", "a")
            .header("x-tag", "b")
            .build()
            .unwrap();
        assert_eq!(exchange.request_headers().get_all("x-tag").iter().count(), 2);
    }

    #[test]
    fn test_errors_surface_on_build() {
        let result = TestRequestBuilder::new("GET", "/")
            .header("bad header", "x")
            .build();
        assert!(matches!(result, Err(TestError::InvalidHeader(_))));

        let result = TestRequestBuilder::new("GET", "not a uri").build();
        assert!(matches!(result, Err(TestError::RequestBuild(_))));
    }

    #[test]
    fn test_custom_method_is_verbatim() {
        let exchange = TestRequestBuilder::new("BREW", "/pot").build().unwrap();
        assert_eq!(exchange.method(), "BREW");
    }
}
