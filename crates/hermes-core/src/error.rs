//! Error types for Hermes.
//!
//! Two kinds of errors flow through the pipeline:
//!
//! - [`CoreError`] covers failures produced by Hermes itself (unsupported
//!   methods, body reading, transport writes).
//! - [`Failure`] is what user code (endpoints, middleware, authentication
//!   providers, body parsers) reports. It remembers the concrete error type
//!   name and a backtrace so the exception translator can disclose as much
//!   as the active [`ExceptionMode`](crate::ExceptionMode) permits.

use std::any::Any;
use std::backtrace::Backtrace;
use std::borrow::Cow;
use std::error::Error as StdError;
use std::fmt::{self, Write as _};
use std::panic::{self, AssertUnwindSafe};

use thiserror::Error;

/// Result type alias using [`CoreError`].
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised by Hermes itself.
#[derive(Error, Debug)]
pub enum CoreError {
    /// The transport reported a method outside the nine recognised ones.
    #[error("The HTTP method {method} is not supported")]
    UnsupportedMethod {
        /// The raw method string.
        method: String,
    },

    /// The request body exceeded the configured limit.
    #[error("request body exceeds the limit of {limit} bytes")]
    BodyTooLarge {
        /// The limit in bytes.
        limit: usize,
    },

    /// The request body was not valid UTF-8.
    #[error("request body is not valid UTF-8: {0}")]
    InvalidBody(#[from] std::string::FromUtf8Error),

    /// Reading the request body failed.
    #[error("failed to read request body: {0}")]
    BodyRead(#[source] std::io::Error),

    /// A header name or value could not be encoded.
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// A response body could not be serialized.
    #[error("failed to serialize response: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A response was written to an exchange that already sent one.
    #[error("a response has already been sent on this exchange")]
    AlreadySent,

    /// The transport failed while writing the response.
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),
}

impl CoreError {
    /// Creates an unsupported method error.
    #[must_use]
    pub fn unsupported_method(method: impl Into<String>) -> Self {
        Self::UnsupportedMethod {
            method: method.into(),
        }
    }

    /// Creates an invalid header error.
    #[must_use]
    pub fn invalid_header(reason: impl fmt::Display) -> Self {
        Self::InvalidHeader(reason.to_string())
    }
}

/// Ad-hoc error created by [`Failure::msg`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct HandlerError(pub String);

/// A panic caught inside user code, carrying the panic message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct PanicError(pub String);

/// A failure reported by user code.
///
/// Any `E: std::error::Error + Send + Sync + 'static` converts into a
/// `Failure` with `?`, so endpoints can propagate their own errors directly:
///
/// ```
/// use hermes_core::Failure;
///
/// fn parse_limit(raw: &str) -> Result<u32, Failure> {
///     Ok(raw.parse::<u32>()?)
/// }
///
/// let failure = parse_limit("many").unwrap_err();
/// assert!(failure.type_name().ends_with("ParseIntError"));
/// ```
///
/// Like `anyhow::Error`, `Failure` deliberately does not implement
/// `std::error::Error` itself; use [`Failure::error`] to reach the inner
/// error.
pub struct Failure {
    type_name: Cow<'static, str>,
    error: anyhow::Error,
    backtrace: Backtrace,
}

impl Failure {
    /// Wraps a concrete error, recording its type name.
    pub fn new<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self {
            type_name: Cow::Borrowed(std::any::type_name::<E>()),
            error: anyhow::Error::new(error),
            backtrace: Backtrace::force_capture(),
        }
    }

    /// Creates a failure from a plain message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self::new(HandlerError(message.into()))
    }

    /// Wraps an `anyhow::Error`.
    ///
    /// The concrete type is no longer known at this point, so the type name
    /// is reported as `anyhow::Error`.
    pub fn from_anyhow(error: anyhow::Error) -> Self {
        Self {
            type_name: Cow::Borrowed("anyhow::Error"),
            error,
            backtrace: Backtrace::force_capture(),
        }
    }

    /// Converts a caught panic payload into a failure with type name `panic`.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "panic with a non-string payload".to_string());

        Self {
            type_name: Cow::Borrowed("panic"),
            error: anyhow::Error::new(PanicError(message)),
            backtrace: Backtrace::force_capture(),
        }
    }

    /// Runs user code, converting a panic into a [`Failure`].
    ///
    /// # Example
    ///
    /// ```
    /// use hermes_core::Failure;
    ///
    /// let result: Result<(), Failure> = Failure::guard(|| panic!("boom"));
    /// let failure = result.unwrap_err();
    /// assert_eq!(failure.type_name(), "panic");
    /// assert_eq!(failure.message(), "boom");
    /// ```
    pub fn guard<T, F>(f: F) -> Result<T, Failure>
    where
        F: FnOnce() -> Result<T, Failure>,
    {
        panic::catch_unwind(AssertUnwindSafe(f))
            .unwrap_or_else(|payload| Err(Self::from_panic(payload)))
    }

    /// Returns the name of the concrete error type.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Returns the error's own message.
    #[must_use]
    pub fn message(&self) -> String {
        self.error.to_string()
    }

    /// Returns the wrapped error.
    #[must_use]
    pub fn error(&self) -> &anyhow::Error {
        &self.error
    }

    /// Returns the backtrace captured when the failure was created.
    #[must_use]
    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }

    /// Attempts to downcast to the concrete error type.
    #[must_use]
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        self.error.downcast_ref::<E>()
    }

    /// Formats the failure, its cause chain and the captured backtrace.
    ///
    /// ```text
    /// std::io::error::Error: disk on fire
    /// Caused by: ...
    /// <backtrace>
    /// ```
    #[must_use]
    pub fn stack_trace(&self) -> String {
        let mut out = format!("{}: {}", self.type_name, self.error);
        for cause in self.error.chain().skip(1) {
            let _ = write!(out, "\nCaused by: {cause}");
        }
        let _ = write!(out, "\n{}", self.backtrace);
        out
    }
}

impl<E> From<E> for Failure
where
    E: StdError + Send + Sync + 'static,
{
    fn from(error: E) -> Self {
        Self::new(error)
    }
}

impl fmt::Debug for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Failure")
            .field("type_name", &self.type_name)
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.type_name, self.error)
    }
}
