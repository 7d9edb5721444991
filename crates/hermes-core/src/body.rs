//! Request body parsers.
//!
//! The dispatcher runs the endpoint's parser before building the
//! [`Request`](crate::Request). A parser failure ends the dispatch with an
//! internal-error response labelled "processing the request body".

use std::io::Read;

use crate::error::{CoreError, Failure};
use crate::exchange::Exchange;

/// Reads the request body into a string.
pub trait BodyParser: Send + Sync + 'static {
    /// Consumes the exchange's body stream.
    ///
    /// # Errors
    ///
    /// Implementation-defined; any [`Failure`] aborts the dispatch.
    fn parse(&self, exchange: &mut dyn Exchange) -> Result<String, Failure>;
}

/// Strict UTF-8 body parser with an optional size limit.
///
/// Invalid UTF-8 fails the dispatch. Opt in with
/// [`body_parser`](crate::EndpointContractBuilder::body_parser) on endpoints
/// that must reject mis-encoded input.
///
/// # Example
///
/// ```
/// use hermes_core::{BodyParser, MemoryExchange, Utf8BodyParser};
///
/// let parser = Utf8BodyParser::with_limit(4);
/// let mut small = MemoryExchange::get("/").with_body("abc");
/// assert_eq!(parser.parse(&mut small).unwrap(), "abc");
///
/// let mut large = MemoryExchange::get("/").with_body("abcdef");
/// assert!(parser.parse(&mut large).is_err());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Utf8BodyParser {
    limit: Option<usize>,
}

impl Utf8BodyParser {
    /// A parser without a size limit.
    #[must_use]
    pub const fn new() -> Self {
        Self { limit: None }
    }

    /// A parser that rejects bodies larger than `limit` bytes.
    #[must_use]
    pub const fn with_limit(limit: usize) -> Self {
        Self { limit: Some(limit) }
    }

    /// The configured limit.
    #[must_use]
    pub const fn limit(&self) -> Option<usize> {
        self.limit
    }
}

impl BodyParser for Utf8BodyParser {
    fn parse(&self, exchange: &mut dyn Exchange) -> Result<String, Failure> {
        let bytes = read_limited(exchange.request_body(), self.limit)?;
        Ok(String::from_utf8(bytes).map_err(CoreError::from)?)
    }
}

/// Lossy UTF-8 body parser with an optional size limit.
///
/// Invalid UTF-8 sequences become `U+FFFD`, so only a read error or an
/// oversized body fails. This is the parser behind [`BodyParsing::Default`],
/// configured with the server body limit.
///
/// [`BodyParsing::Default`]: crate::BodyParsing::Default
///
/// ```
/// use hermes_core::{BodyParser, MemoryExchange, RawBodyParser};
///
/// let mut upload = MemoryExchange::get("/").with_body(vec![b'o', b'k', 0xff]);
/// assert_eq!(RawBodyParser::new().parse(&mut upload).unwrap(), "ok\u{fffd}");
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawBodyParser {
    limit: Option<usize>,
}

impl RawBodyParser {
    /// A parser without a size limit.
    #[must_use]
    pub const fn new() -> Self {
        Self { limit: None }
    }

    /// A parser that rejects bodies larger than `limit` bytes.
    #[must_use]
    pub const fn with_limit(limit: usize) -> Self {
        Self { limit: Some(limit) }
    }

    /// The configured limit.
    #[must_use]
    pub const fn limit(&self) -> Option<usize> {
        self.limit
    }
}

impl BodyParser for RawBodyParser {
    fn parse(&self, exchange: &mut dyn Exchange) -> Result<String, Failure> {
        let bytes = read_limited(exchange.request_body(), self.limit)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

fn read_limited(reader: &mut dyn Read, limit: Option<usize>) -> Result<Vec<u8>, CoreError> {
    let mut bytes = Vec::new();
    match limit {
        Some(limit) => {
            let cap = u64::try_from(limit).unwrap_or(u64::MAX).saturating_add(1);
            reader
                .take(cap)
                .read_to_end(&mut bytes)
                .map_err(CoreError::BodyRead)?;
            if bytes.len() > limit {
                return Err(CoreError::BodyTooLarge { limit });
            }
        }
        None => {
            reader.read_to_end(&mut bytes).map_err(CoreError::BodyRead)?;
        }
    }
    Ok(bytes)
}
