//! Caller identity and authorization.
//!
//! An [`AuthenticationProvider`] turns a request into an optional
//! [`Authentication`]. Providers are tried in registration order and the
//! first one that yields an identity wins; see the dispatcher in
//! `hermes-server` for the resolution order across endpoint and server
//! scopes.

use std::fmt;
use std::sync::Arc;

use http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::error::Failure;
use crate::request::Request;

/// An authenticated caller.
///
/// The pipeline itself only looks at permissions; everything else about an
/// identity is up to the application.
pub trait Authentication: Send + Sync + fmt::Debug {
    /// The permissions granted to this caller.
    fn permissions(&self) -> &[String];

    /// Returns `true` if the caller holds `permission`.
    fn has_permission(&self, permission: &str) -> bool {
        self.permissions().iter().any(|p| p == permission)
    }

    /// The caller's subject, if it has one.
    fn subject(&self) -> Option<&str> {
        None
    }
}

/// A shared, type-erased identity as produced by providers.
pub type SharedAuthentication = Arc<dyn Authentication>;

/// A plain identity: a subject plus a permission list.
///
/// # Example
///
/// ```
/// use hermes_core::{Authentication, Identity};
///
/// let identity = Identity::new("user-42")
///     .with_permission("orders:read")
///     .with_permission("orders:write");
///
/// assert_eq!(identity.subject(), Some("user-42"));
/// assert!(identity.has_permission("orders:write"));
/// assert!(!identity.has_permission("admin"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Identity {
    /// The subject (user id, service name, key id).
    pub subject: String,
    /// Granted permissions.
    #[serde(default)]
    pub permissions: Vec<String>,
}

impl Identity {
    /// Creates an identity without permissions.
    #[must_use]
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            permissions: Vec::new(),
        }
    }

    /// Adds a permission.
    #[must_use]
    pub fn with_permission(mut self, permission: impl Into<String>) -> Self {
        self.permissions.push(permission.into());
        self
    }

    /// Replaces the permission list.
    #[must_use]
    pub fn with_permissions<I, S>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.permissions = permissions.into_iter().map(Into::into).collect();
        self
    }

    /// Wraps this identity for return from a provider.
    #[must_use]
    pub fn shared(self) -> SharedAuthentication {
        Arc::new(self)
    }
}

impl Authentication for Identity {
    fn permissions(&self) -> &[String] {
        &self.permissions
    }

    fn subject(&self) -> Option<&str> {
        Some(&self.subject)
    }
}

/// Resolves a caller identity from a request.
///
/// Returning `Ok(None)` means "no match" and lets the next provider try.
/// Errors and panics are caught by the dispatcher and turned into an
/// internal-error response.
pub trait AuthenticationProvider: Send + Sync + 'static {
    /// A name for logs.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Attempts to authenticate the request.
    ///
    /// # Errors
    ///
    /// Any [`Failure`] aborts the dispatch with an internal-error response.
    fn authenticate(&self, request: &Request<'_>) -> Result<Option<SharedAuthentication>, Failure>;
}

/// An [`AuthenticationProvider`] backed by a closure.
///
/// ```
/// use hermes_core::{FnProvider, Identity};
///
/// let provider = FnProvider::new(|request| {
///     Ok(request.header("x-user").map(|user| Identity::new(user).shared()))
/// });
/// # let _ = provider;
/// ```
pub struct FnProvider<F> {
    f: F,
}

impl<F> FnProvider<F>
where
    F: Fn(&Request<'_>) -> Result<Option<SharedAuthentication>, Failure> + Send + Sync + 'static,
{
    /// Creates a provider from a closure.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> AuthenticationProvider for FnProvider<F>
where
    F: Fn(&Request<'_>) -> Result<Option<SharedAuthentication>, Failure> + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        "FnProvider"
    }

    fn authenticate(&self, request: &Request<'_>) -> Result<Option<SharedAuthentication>, Failure> {
        (self.f)(request)
    }
}

impl<F> fmt::Debug for FnProvider<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnProvider").finish_non_exhaustive()
    }
}

/// The result of an endpoint's authorization hook.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AuthorizationDecision {
    /// Continue with the request.
    #[default]
    Allow,
    /// Stop with an error response.
    Deny {
        /// The message placed in the error response.
        message: String,
        /// The response status.
        status: StatusCode,
    },
}

impl AuthorizationDecision {
    /// Allows the request.
    #[must_use]
    pub const fn allow() -> Self {
        Self::Allow
    }

    /// Denies with a custom message and status.
    #[must_use]
    pub fn deny(message: impl Into<String>, status: StatusCode) -> Self {
        Self::Deny {
            message: message.into(),
            status,
        }
    }

    /// Denies with `401 Unauthorized`.
    #[must_use]
    pub fn unauthorized() -> Self {
        Self::deny("Unauthorized", StatusCode::UNAUTHORIZED)
    }

    /// Denies with `403 Forbidden`.
    #[must_use]
    pub fn forbidden() -> Self {
        Self::deny("Forbidden", StatusCode::FORBIDDEN)
    }

    /// Returns `true` for [`AuthorizationDecision::Allow`].
    #[must_use]
    pub const fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }
}
