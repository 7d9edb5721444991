//! Registration errors.

use thiserror::Error;

/// Errors raised while registering endpoints.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServerError {
    /// An endpoint is already bound to this path.
    #[error("An endpoint is already registered for path {path}")]
    DuplicateEndpoint {
        /// The conflicting path.
        path: String,
    },

    /// The path is empty or does not start with `/`.
    #[error("Invalid endpoint path: {path:?}")]
    InvalidPath {
        /// The rejected path.
        path: String,
    },
}

/// Result type alias using [`ServerError`].
pub type ServerResult<T> = Result<T, ServerError>;
