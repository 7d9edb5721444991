//! Exception consumers.
//!
//! Consumers observe every failure the dispatcher catches, once per failure,
//! in registration order, before the error response is built.

use std::fmt;

use crate::error::Failure;

/// Observes caught failures, e.g. for logging or metrics.
///
/// Consumers must not panic; a panicking consumer ends the dispatch with the
/// last-resort `500` response.
pub trait ExceptionConsumer: Send + Sync + 'static {
    /// Called once for each caught failure.
    fn accept(&self, failure: &Failure);
}

/// An [`ExceptionConsumer`] backed by a closure.
pub struct FnConsumer<F> {
    f: F,
}

impl<F> FnConsumer<F>
where
    F: Fn(&Failure) + Send + Sync + 'static,
{
    /// Creates a consumer from a closure.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> ExceptionConsumer for FnConsumer<F>
where
    F: Fn(&Failure) + Send + Sync + 'static,
{
    fn accept(&self, failure: &Failure) {
        (self.f)(failure);
    }
}

impl<F> fmt::Debug for FnConsumer<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnConsumer").finish_non_exhaustive()
    }
}
