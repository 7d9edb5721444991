use std::fmt;

use hermes_core::{
    Authentication, EndpointContract, Failure, Middleware, MiddlewareOutcome, MiddlewarePhase,
    MiddlewarePriority, Request,
};

/// A [`Middleware`] backed by a closure.
///
/// Defaults to the post-authentication phase at medium priority.
///
/// ```
/// use hermes_core::{MiddlewareOutcome, MiddlewarePhase, MiddlewarePriority};
/// use hermes_middleware::FnMiddleware;
///
/// let tag = FnMiddleware::new("tag", |_endpoint, request, _auth| {
///     request.insert_response_header("x-tagged", "1")?;
///     Ok(MiddlewareOutcome::Continue)
/// })
/// .with_phase(MiddlewarePhase::PreAuthentication)
/// .with_priority(MiddlewarePriority::High);
/// # let _ = tag;
/// ```
pub struct FnMiddleware<F> {
    name: &'static str,
    priority: MiddlewarePriority,
    phase: MiddlewarePhase,
    f: F,
}

impl<F> FnMiddleware<F>
where
    F: Fn(
            &EndpointContract,
            &mut Request<'_>,
            Option<&dyn Authentication>,
        ) -> Result<MiddlewareOutcome, Failure>
        + Send
        + Sync
        + 'static,
{
    /// Creates a named middleware from a closure.
    pub fn new(name: &'static str, f: F) -> Self {
        Self {
            name,
            priority: MiddlewarePriority::default(),
            phase: MiddlewarePhase::default(),
            f,
        }
    }

    /// Sets the priority.
    #[must_use]
    pub fn with_priority(mut self, priority: MiddlewarePriority) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the phase.
    #[must_use]
    pub fn with_phase(mut self, phase: MiddlewarePhase) -> Self {
        self.phase = phase;
        self
    }
}

impl<F> Middleware for FnMiddleware<F>
where
    F: Fn(
            &EndpointContract,
            &mut Request<'_>,
            Option<&dyn Authentication>,
        ) -> Result<MiddlewareOutcome, Failure>
        + Send
        + Sync
        + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn priority(&self) -> MiddlewarePriority {
        self.priority
    }

    fn phase(&self) -> MiddlewarePhase {
        self.phase
    }

    fn handle(
        &self,
        endpoint: &EndpointContract,
        request: &mut Request<'_>,
        authentication: Option<&dyn Authentication>,
    ) -> Result<MiddlewareOutcome, Failure> {
        (self.f)(endpoint, request, authentication)
    }
}

impl<F> fmt::Debug for FnMiddleware<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnMiddleware")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("phase", &self.phase)
            .finish_non_exhaustive()
    }
}
