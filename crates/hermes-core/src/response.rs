//! Response models.
//!
//! Every response the pipeline produces is an [`HttpResponse`] that renders
//! itself onto an [`Exchange`]. The dispatcher renders exactly one response
//! per exchange.
//!
//! | Model | Content-Type | Notes |
//! |-------|--------------|-------|
//! | [`JsonResponse`] | `application/json; charset=utf-8` | optional indentation |
//! | [`TextResponse`] | `text/plain`, `text/html`, `text/csv` | `; charset=utf-8` |
//! | [`EmptyResponse`] | none | status and headers only |
//! | [`RedirectResponse`] | none | `Location` header |

use std::fmt;

use bytes::Bytes;
use http::header::{self, HeaderName, HeaderValue};
use http::{HeaderMap, StatusCode};
use serde::Serialize;

use crate::error::CoreError;
use crate::exchange::Exchange;

/// A boxed response, as returned by endpoints and middleware.
pub type BoxResponse = Box<dyn HttpResponse>;

/// A response that knows how to write itself onto an exchange.
pub trait HttpResponse: fmt::Debug + Send + Sync {
    /// The response status.
    fn status(&self) -> StatusCode;

    /// Writes status, headers and body.
    ///
    /// # Errors
    ///
    /// Returns an error if the body cannot be encoded, a header is invalid,
    /// or the exchange refuses the write.
    fn render(&self, exchange: &mut dyn Exchange) -> Result<(), CoreError>;

    /// Boxes the response.
    fn boxed(self) -> BoxResponse
    where
        Self: Sized + 'static,
    {
        Box::new(self)
    }
}

/// JSON response with an object or array body.
///
/// # Example
///
/// ```
/// use hermes_core::{HttpResponse, JsonResponse, MemoryExchange};
/// use http::StatusCode;
///
/// let response = JsonResponse::new(serde_json::json!([1, 2, 3]))
///     .with_status(StatusCode::CREATED);
///
/// let mut exchange = MemoryExchange::get("/");
/// response.render(&mut exchange).unwrap();
/// assert_eq!(exchange.status(), Some(StatusCode::CREATED));
/// assert_eq!(exchange.response_body().unwrap().as_ref(), b"[1,2,3]");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct JsonResponse {
    body: serde_json::Value,
    status: StatusCode,
    indentation: Option<usize>,
}

impl JsonResponse {
    /// Content type written by JSON responses.
    pub const CONTENT_TYPE: &'static str = "application/json; charset=utf-8";

    /// Creates a `200 OK` response.
    #[must_use]
    pub fn new(body: serde_json::Value) -> Self {
        Self {
            body,
            status: StatusCode::OK,
            indentation: None,
        }
    }

    /// Serializes any value into a response body.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Serialization`] if the value cannot be
    /// represented as JSON.
    pub fn from_serializable<T: Serialize + ?Sized>(value: &T) -> Result<Self, CoreError> {
        Ok(Self::new(serde_json::to_value(value)?))
    }

    /// Sets the status.
    #[must_use]
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Pretty-prints with `spaces` of indentation.
    #[must_use]
    pub fn with_indentation(mut self, spaces: usize) -> Self {
        self.indentation = Some(spaces);
        self
    }

    /// The JSON body.
    #[must_use]
    pub fn body(&self) -> &serde_json::Value {
        &self.body
    }

    /// Encodes the body.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Serialization`] on encoder failure.
    pub fn to_bytes(&self) -> Result<Bytes, CoreError> {
        let encoded = match self.indentation {
            None => serde_json::to_vec(&self.body)?,
            Some(spaces) => {
                let indent = " ".repeat(spaces);
                let formatter = serde_json::ser::PrettyFormatter::with_indent(indent.as_bytes());
                let mut out = Vec::new();
                let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
                self.body.serialize(&mut serializer)?;
                out
            }
        };
        Ok(Bytes::from(encoded))
    }
}

impl HttpResponse for JsonResponse {
    fn status(&self) -> StatusCode {
        self.status
    }

    fn render(&self, exchange: &mut dyn Exchange) -> Result<(), CoreError> {
        let body = self.to_bytes()?;
        exchange.response_headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(Self::CONTENT_TYPE),
        );
        exchange.send(self.status, body)
    }
}

/// Text flavours a [`TextResponse`] can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextMime {
    /// `text/plain`
    #[default]
    Plain,
    /// `text/html`
    Html,
    /// `text/csv`
    Csv,
}

impl TextMime {
    /// The full `Content-Type` value including the charset.
    #[must_use]
    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Plain => "text/plain; charset=utf-8",
            Self::Html => "text/html; charset=utf-8",
            Self::Csv => "text/csv; charset=utf-8",
        }
    }
}

/// Plain text, HTML or CSV response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextResponse {
    body: String,
    status: StatusCode,
    mime: TextMime,
}

impl TextResponse {
    /// Creates a `200 OK` plain text response.
    #[must_use]
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            status: StatusCode::OK,
            mime: TextMime::Plain,
        }
    }

    /// Creates a `200 OK` HTML response.
    #[must_use]
    pub fn html(body: impl Into<String>) -> Self {
        Self::new(body).with_mime(TextMime::Html)
    }

    /// Creates a `200 OK` CSV response.
    #[must_use]
    pub fn csv(body: impl Into<String>) -> Self {
        Self::new(body).with_mime(TextMime::Csv)
    }

    /// Sets the status.
    #[must_use]
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Sets the mime flavour.
    #[must_use]
    pub fn with_mime(mut self, mime: TextMime) -> Self {
        self.mime = mime;
        self
    }

    /// The body text.
    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    /// The mime flavour.
    #[must_use]
    pub fn mime(&self) -> TextMime {
        self.mime
    }
}

impl HttpResponse for TextResponse {
    fn status(&self) -> StatusCode {
        self.status
    }

    fn render(&self, exchange: &mut dyn Exchange) -> Result<(), CoreError> {
        exchange.response_headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(self.mime.content_type()),
        );
        exchange.send(self.status, Bytes::from(self.body.clone()))
    }
}

/// A response without a body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmptyResponse {
    status: StatusCode,
    headers: HeaderMap,
}

impl EmptyResponse {
    /// Creates an empty response with the given status.
    #[must_use]
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
        }
    }

    /// An empty `200 OK`.
    #[must_use]
    pub fn ok() -> Self {
        Self::new(StatusCode::OK)
    }

    /// Adds a header written on render. Repeated names keep every value.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Headers written on render.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }
}

impl HttpResponse for EmptyResponse {
    fn status(&self) -> StatusCode {
        self.status
    }

    fn render(&self, exchange: &mut dyn Exchange) -> Result<(), CoreError> {
        let staged = exchange.response_headers_mut();
        for name in self.headers.keys() {
            staged.remove(name);
        }
        for (name, value) in &self.headers {
            staged.append(name.clone(), value.clone());
        }
        exchange.send(self.status, Bytes::new())
    }
}

/// The status a [`RedirectResponse`] uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RedirectKind {
    /// `307 Temporary Redirect`
    #[default]
    Temporary,
    /// `308 Permanent Redirect`
    Permanent,
    /// `301 Moved Permanently`
    MovedPermanently,
}

impl RedirectKind {
    /// The status code for this kind.
    #[must_use]
    pub const fn status(self) -> StatusCode {
        match self {
            Self::Temporary => StatusCode::TEMPORARY_REDIRECT,
            Self::Permanent => StatusCode::PERMANENT_REDIRECT,
            Self::MovedPermanently => StatusCode::MOVED_PERMANENTLY,
        }
    }
}

/// A redirect carrying a `Location` header.
///
/// ```
/// use hermes_core::{HttpResponse, RedirectResponse};
/// use http::StatusCode;
///
/// assert_eq!(RedirectResponse::temporary("/login").status(), StatusCode::TEMPORARY_REDIRECT);
/// assert_eq!(RedirectResponse::permanent("/v2").status(), StatusCode::PERMANENT_REDIRECT);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectResponse {
    location: String,
    kind: RedirectKind,
}

impl RedirectResponse {
    /// Creates a redirect of the given kind.
    #[must_use]
    pub fn new(location: impl Into<String>, kind: RedirectKind) -> Self {
        Self {
            location: location.into(),
            kind,
        }
    }

    /// `307 Temporary Redirect`.
    #[must_use]
    pub fn temporary(location: impl Into<String>) -> Self {
        Self::new(location, RedirectKind::Temporary)
    }

    /// `308 Permanent Redirect`.
    #[must_use]
    pub fn permanent(location: impl Into<String>) -> Self {
        Self::new(location, RedirectKind::Permanent)
    }

    /// `301 Moved Permanently`.
    #[must_use]
    pub fn moved_permanently(location: impl Into<String>) -> Self {
        Self::new(location, RedirectKind::MovedPermanently)
    }

    /// The redirect target.
    #[must_use]
    pub fn location(&self) -> &str {
        &self.location
    }

    /// The redirect kind.
    #[must_use]
    pub fn kind(&self) -> RedirectKind {
        self.kind
    }
}

impl HttpResponse for RedirectResponse {
    fn status(&self) -> StatusCode {
        self.kind.status()
    }

    fn render(&self, exchange: &mut dyn Exchange) -> Result<(), CoreError> {
        let location =
            HeaderValue::try_from(self.location.as_str()).map_err(CoreError::invalid_header)?;
        exchange
            .response_headers_mut()
            .insert(header::LOCATION, location);
        exchange.send(self.status(), Bytes::new())
    }
}
