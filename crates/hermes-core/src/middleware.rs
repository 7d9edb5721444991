//! The middleware contract.
//!
//! A [`Middleware`] unit runs either before or after authentication
//! ([`MiddlewarePhase`]) and either lets the request continue or cancels it
//! with a finished response ([`MiddlewareOutcome`]). Units of the same phase
//! run in ascending [`MiddlewarePriority`] order, so the highest priority has
//! the final say.
//!
//! `OPTIONS` requests never reach [`Middleware::handle`]. Every unit, in
//! either phase, gets [`Middleware::handle_options`] instead, which can only
//! touch headers and cannot cancel.
//!
//! # Example
//!
//! ```
//! use hermes_core::{
//!     Authentication, EndpointContract, Failure, Middleware, MiddlewareOutcome,
//!     MiddlewarePhase, MiddlewarePriority, Request,
//! };
//!
//! struct PoweredBy;
//!
//! impl Middleware for PoweredBy {
//!     fn name(&self) -> &'static str {
//!         "powered-by"
//!     }
//!
//!     fn priority(&self) -> MiddlewarePriority {
//!         MiddlewarePriority::Low
//!     }
//!
//!     fn handle(
//!         &self,
//!         _endpoint: &EndpointContract,
//!         request: &mut Request<'_>,
//!         _authentication: Option<&dyn Authentication>,
//!     ) -> Result<MiddlewareOutcome, Failure> {
//!         request.insert_response_header("x-powered-by", "hermes")?;
//!         Ok(MiddlewareOutcome::Continue)
//!     }
//! }
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::auth::Authentication;
use crate::endpoint::EndpointContract;
use crate::error::Failure;
use crate::request::Request;
use crate::response::{BoxResponse, HttpResponse};

/// Ordering scale for middleware within a phase. Lower values run first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum MiddlewarePriority {
    /// Runs first.
    Lowest,
    /// Runs before the default.
    Low,
    /// The default.
    #[default]
    Medium,
    /// Runs after the default.
    High,
    /// Runs last.
    Highest,
}

impl MiddlewarePriority {
    /// The integer value of this level.
    #[must_use]
    pub const fn value(self) -> i32 {
        match self {
            Self::Lowest => -32,
            Self::Low => -16,
            Self::Medium => 0,
            Self::High => 16,
            Self::Highest => 32,
        }
    }
}

/// When a middleware unit runs relative to authentication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MiddlewarePhase {
    /// Before authentication; never sees an identity.
    PreAuthentication,
    /// After authentication and authorization.
    #[default]
    PostAuthentication,
}

/// What a middleware unit decided.
pub enum MiddlewareOutcome {
    /// Continue with the next unit.
    Continue,
    /// Stop the dispatch and send this response.
    Cancel(BoxResponse),
}

impl MiddlewareOutcome {
    /// Cancels with the given response.
    pub fn cancel(response: impl HttpResponse + 'static) -> Self {
        Self::Cancel(response.boxed())
    }

    /// Returns `true` for [`MiddlewareOutcome::Cancel`].
    #[must_use]
    pub const fn is_cancel(&self) -> bool {
        matches!(self, Self::Cancel(_))
    }
}

impl fmt::Debug for MiddlewareOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Continue => f.write_str("Continue"),
            Self::Cancel(response) => f.debug_tuple("Cancel").field(response).finish(),
        }
    }
}

/// A cancellable request-processing unit.
pub trait Middleware: Send + Sync + 'static {
    /// A name for logs.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// The unit's priority within its phase.
    fn priority(&self) -> MiddlewarePriority {
        MiddlewarePriority::Medium
    }

    /// The phase the unit runs in.
    fn phase(&self) -> MiddlewarePhase {
        MiddlewarePhase::PostAuthentication
    }

    /// Processes a non-`OPTIONS` request.
    ///
    /// `authentication` is always `None` in the pre-authentication phase.
    ///
    /// # Errors
    ///
    /// Any [`Failure`] aborts the dispatch with an internal-error response.
    fn handle(
        &self,
        endpoint: &EndpointContract,
        request: &mut Request<'_>,
        authentication: Option<&dyn Authentication>,
    ) -> Result<MiddlewareOutcome, Failure>;

    /// Side-effect hook for `OPTIONS` requests.
    fn handle_options(&self, _request: &mut Request<'_>) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::EmptyResponse;
    use http::StatusCode;

    #[test]
    fn test_priority_order_matches_values() {
        let mut levels = vec![
            MiddlewarePriority::Highest,
            MiddlewarePriority::Lowest,
            MiddlewarePriority::Medium,
            MiddlewarePriority::High,
            MiddlewarePriority::Low,
        ];
        levels.sort();
        let values: Vec<_> = levels.iter().map(|p| p.value()).collect();
        assert_eq!(values, vec![-32, -16, 0, 16, 32]);
    }

    #[test]
    fn test_defaults() {
        assert_eq!(MiddlewarePriority::default(), MiddlewarePriority::Medium);
        assert_eq!(
            MiddlewarePhase::default(),
            MiddlewarePhase::PostAuthentication
        );
    }

    #[test]
    fn test_outcome_cancel() {
        let outcome = MiddlewareOutcome::cancel(EmptyResponse::new(StatusCode::TOO_MANY_REQUESTS));
        assert!(outcome.is_cancel());
        match outcome {
            MiddlewareOutcome::Cancel(response) => {
                assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
            }
            MiddlewareOutcome::Continue => panic!("expected cancel"),
        }
        assert!(!MiddlewareOutcome::Continue.is_cancel());
    }

    #[test]
    fn test_phase_serde_names() {
        let json = serde_json::to_string(&MiddlewarePhase::PreAuthentication).unwrap();
        assert_eq!(json, "\"pre_authentication\"");
    }
}
