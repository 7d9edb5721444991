//! Header-based authentication providers.
//!
//! Both providers only extract the credential; deciding who it belongs to
//! is left to a caller-supplied resolver. A missing or malformed header is
//! "no match", so the next provider gets a chance.

use std::fmt;

use hermes_core::{AuthenticationProvider, Failure, Request, SharedAuthentication};
use http::header::AUTHORIZATION;
use tracing::debug;

/// Default header for [`ApiKeyProvider`].
pub const API_KEY_HEADER: &str = "x-api-key";

const BEARER_PREFIX: &str = "bearer ";

/// Authenticates `Authorization: Bearer <token>` headers.
///
/// The scheme is matched case-insensitively; an empty token is no match.
///
/// ```
/// use hermes_core::Identity;
/// use hermes_middleware::BearerTokenProvider;
///
/// let provider = BearerTokenProvider::new(|token| {
///     Ok((token == "s3cret").then(|| Identity::new("admin").shared()))
/// });
/// # let _ = provider;
/// ```
pub struct BearerTokenProvider<F> {
    resolve: F,
}

impl<F> BearerTokenProvider<F>
where
    F: Fn(&str) -> Result<Option<SharedAuthentication>, Failure> + Send + Sync + 'static,
{
    /// Creates a provider that hands bearer tokens to `resolve`.
    pub fn new(resolve: F) -> Self {
        Self { resolve }
    }
}

/// Extracts the token from an `Authorization` header value.
fn bearer_token(value: &str) -> Option<&str> {
    let prefix = value.get(..BEARER_PREFIX.len())?;
    if !prefix.eq_ignore_ascii_case(BEARER_PREFIX) {
        return None;
    }
    let token = value[BEARER_PREFIX.len()..].trim();
    (!token.is_empty()).then_some(token)
}

impl<F> AuthenticationProvider for BearerTokenProvider<F>
where
    F: Fn(&str) -> Result<Option<SharedAuthentication>, Failure> + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        "bearer_token"
    }

    fn authenticate(&self, request: &Request<'_>) -> Result<Option<SharedAuthentication>, Failure> {
        let Some(token) = request.header(AUTHORIZATION.as_str()).and_then(bearer_token) else {
            debug!(provider = self.name(), "no bearer token present");
            return Ok(None);
        };
        (self.resolve)(token)
    }
}

impl<F> fmt::Debug for BearerTokenProvider<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerTokenProvider").finish_non_exhaustive()
    }
}

/// Authenticates an API key carried in a header (`x-api-key` by default).
pub struct ApiKeyProvider<F> {
    header: String,
    resolve: F,
}

impl<F> ApiKeyProvider<F>
where
    F: Fn(&str) -> Result<Option<SharedAuthentication>, Failure> + Send + Sync + 'static,
{
    /// Creates a provider reading [`API_KEY_HEADER`].
    pub fn new(resolve: F) -> Self {
        Self::with_header(API_KEY_HEADER, resolve)
    }

    /// Creates a provider reading a custom header.
    pub fn with_header(header: impl Into<String>, resolve: F) -> Self {
        Self {
            header: header.into().to_ascii_lowercase(),
            resolve,
        }
    }

    /// The header this provider reads.
    #[must_use]
    pub fn header(&self) -> &str {
        &self.header
    }
}

impl<F> AuthenticationProvider for ApiKeyProvider<F>
where
    F: Fn(&str) -> Result<Option<SharedAuthentication>, Failure> + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        "api_key"
    }

    fn authenticate(&self, request: &Request<'_>) -> Result<Option<SharedAuthentication>, Failure> {
        match request.header(&self.header).map(str::trim) {
            Some(key) if !key.is_empty() => (self.resolve)(key),
            _ => Ok(None),
        }
    }
}

impl<F> fmt::Debug for ApiKeyProvider<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKeyProvider")
            .field("header", &self.header)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hermes_core::{Authentication, Identity, MemoryExchange};
    use http::HeaderValue;

    fn bearer() -> impl AuthenticationProvider {
        BearerTokenProvider::new(|token| {
            Ok((token == "good").then(|| Identity::new("alice").shared()))
        })
    }

    fn with_header(name: &'static str, value: &'static str) -> MemoryExchange {
        MemoryExchange::get("/").with_header(name.parse().unwrap(), HeaderValue::from_static(value))
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(bearer_token("bearer  abc "), Some("abc"));
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("Bear"), None);
    }

    #[test]
    fn test_bearer_provider_resolves() {
        let provider = bearer();

        let mut exchange = with_header("authorization", "Bearer good");
        let request = Request::new(&mut exchange, None).unwrap();
        let identity = provider.authenticate(&request).unwrap().unwrap();
        assert_eq!(identity.subject(), Some("alice"));

        let mut exchange = with_header("authorization", "Bearer bad");
        let request = Request::new(&mut exchange, None).unwrap();
        assert!(provider.authenticate(&request).unwrap().is_none());

        let mut exchange = MemoryExchange::get("/");
        let request = Request::new(&mut exchange, None).unwrap();
        assert!(provider.authenticate(&request).unwrap().is_none());
    }

    #[test]
    fn test_api_key_custom_header() {
        let provider = ApiKeyProvider::with_header("X-Service-Key", |key| {
            Ok(Some(Identity::new(key).with_permission("internal").shared()))
        });
        assert_eq!(provider.header(), "x-service-key");

        let mut exchange = with_header("x-service-key", "billing");
        let request = Request::new(&mut exchange, None).unwrap();
        let identity = provider.authenticate(&request).unwrap().unwrap();
        assert_eq!(identity.subject(), Some("billing"));
        assert!(identity.has_permission("internal"));
    }

    #[test]
    fn test_api_key_errors_propagate() {
        let provider = ApiKeyProvider::new(|_key| Err(Failure::msg("key store offline")));

        let mut exchange = with_header(API_KEY_HEADER, "k1");
        let request = Request::new(&mut exchange, None).unwrap();
        let failure = provider.authenticate(&request).unwrap_err();
        assert_eq!(failure.message(), "key store offline");
    }
}
