//! Request ID middleware.
//!
//! Every request gets an identifier that is echoed in the `x-request-id`
//! response header and made available to later middleware and the handler:
//!
//! - as the `request_id` entry of [`Request::middleware_data`]
//! - as a typed [`RequestId`] extension
//!
//! A valid UUID in an incoming `x-request-id` header is reused; otherwise a
//! new UUID v7 is generated. UUID v7 is time-ordered, which keeps IDs
//! sortable in logs.

use std::fmt;

use hermes_core::{
    Authentication, EndpointContract, Failure, Middleware, MiddlewareOutcome, MiddlewarePhase,
    MiddlewarePriority, Request,
};
use tracing::debug;
use uuid::Uuid;

/// The header name for request ID propagation.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// The [`Request::middleware_data`] key the ID is stored under.
pub const REQUEST_ID_DATA_KEY: &str = "request_id";

/// A request identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Generates a new UUID v7 identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// The underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for RequestId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Propagates or generates `x-request-id`.
///
/// Runs before authentication at the highest priority.
#[derive(Debug, Clone)]
pub struct RequestIdMiddleware {
    trust_incoming: bool,
}

impl RequestIdMiddleware {
    /// Reuses a valid incoming ID, generating one otherwise.
    #[must_use]
    pub fn new() -> Self {
        Self {
            trust_incoming: true,
        }
    }

    /// Always generates a fresh ID, ignoring the incoming header.
    ///
    /// Use this at the edge, where clients are not trusted to pick IDs.
    #[must_use]
    pub fn generate_only() -> Self {
        Self {
            trust_incoming: false,
        }
    }

    fn incoming(&self, request: &Request<'_>) -> Option<RequestId> {
        if !self.trust_incoming {
            return None;
        }
        request
            .header(REQUEST_ID_HEADER)
            .and_then(|raw| Uuid::parse_str(raw).ok())
            .map(RequestId::from)
    }
}

impl Default for RequestIdMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

impl Middleware for RequestIdMiddleware {
    fn name(&self) -> &'static str {
        "request_id"
    }

    fn priority(&self) -> MiddlewarePriority {
        MiddlewarePriority::Highest
    }

    fn phase(&self) -> MiddlewarePhase {
        MiddlewarePhase::PreAuthentication
    }

    fn handle(
        &self,
        _endpoint: &EndpointContract,
        request: &mut Request<'_>,
        _authentication: Option<&dyn Authentication>,
    ) -> Result<MiddlewareOutcome, Failure> {
        let id = self.incoming(request).unwrap_or_default();
        debug!(request_id = %id, "assigned request id");

        request.insert_response_header(REQUEST_ID_HEADER, id.to_string())?;
        request
            .middleware_data_mut()
            .insert(REQUEST_ID_DATA_KEY.to_string(), id.to_string());
        request.set_extension(id);
        Ok(MiddlewareOutcome::Continue)
    }
}
