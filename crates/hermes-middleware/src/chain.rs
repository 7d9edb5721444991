//! Phase-filtered, priority-sorted middleware chains.

use std::sync::Arc;

use hermes_core::{
    Authentication, EndpointContract, Failure, Middleware, MiddlewareOutcome, MiddlewarePhase,
    Request,
};
use tracing::debug;

/// The middleware units of one phase, in execution order.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use hermes_core::{Middleware, MiddlewarePhase};
/// use hermes_middleware::{CorsAnywhereMiddleware, MiddlewareChain, RequestIdMiddleware};
///
/// let server: Vec<Arc<dyn Middleware>> = vec![Arc::new(RequestIdMiddleware::new())];
/// let endpoint: Vec<Arc<dyn Middleware>> = vec![Arc::new(CorsAnywhereMiddleware)];
///
/// let chain = MiddlewareChain::for_phase(&server, &endpoint, MiddlewarePhase::PreAuthentication);
/// assert_eq!(chain.names(), vec!["cors_anywhere", "request_id"]);
/// ```
#[derive(Clone, Default)]
pub struct MiddlewareChain {
    units: Vec<Arc<dyn Middleware>>,
}

impl MiddlewareChain {
    /// Builds the chain for `phase`: server units then endpoint units,
    /// filtered by phase and stable-sorted by priority.
    #[must_use]
    pub fn for_phase(
        server: &[Arc<dyn Middleware>],
        endpoint: &[Arc<dyn Middleware>],
        phase: MiddlewarePhase,
    ) -> Self {
        let mut units: Vec<_> = server
            .iter()
            .chain(endpoint)
            .filter(|unit| unit.phase() == phase)
            .cloned()
            .collect();
        units.sort_by_key(|unit| unit.priority());
        Self { units }
    }

    /// Number of units.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Returns `true` if the chain has no units.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Unit names in execution order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.units.iter().map(|unit| unit.name()).collect()
    }

    /// Runs the chain until a unit cancels.
    ///
    /// Returns the first [`MiddlewareOutcome::Cancel`], or
    /// [`MiddlewareOutcome::Continue`] when every unit continued.
    ///
    /// # Errors
    ///
    /// The first unit failure (including a panic) stops the chain and is
    /// returned.
    pub fn run(
        &self,
        endpoint: &EndpointContract,
        request: &mut Request<'_>,
        authentication: Option<&dyn Authentication>,
    ) -> Result<MiddlewareOutcome, Failure> {
        for unit in &self.units {
            let outcome =
                Failure::guard(|| unit.handle(endpoint, request, authentication))?;
            if outcome.is_cancel() {
                debug!(middleware = unit.name(), "middleware cancelled the request");
                return Ok(outcome);
            }
        }
        Ok(MiddlewareOutcome::Continue)
    }
}

impl std::fmt::Debug for MiddlewareChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiddlewareChain")
            .field("units", &self.names())
            .finish()
    }
}

/// Runs the `OPTIONS` hook of every unit regardless of phase: server units
/// first, then endpoint units, each in registration order.
pub fn run_options_hooks(
    server: &[Arc<dyn Middleware>],
    endpoint: &[Arc<dyn Middleware>],
    request: &mut Request<'_>,
) {
    for unit in server.iter().chain(endpoint) {
        unit.handle_options(request);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use hermes_core::{
        EmptyResponse, FnEndpoint, HttpResponse, MemoryExchange, MiddlewarePriority,
    };
    use http::StatusCode;

    type Log = Arc<Mutex<Vec<&'static str>>>;

    struct Recorder {
        name: &'static str,
        priority: MiddlewarePriority,
        phase: MiddlewarePhase,
        cancel: bool,
        log: Log,
    }

    impl Recorder {
        fn new(name: &'static str, priority: MiddlewarePriority, log: &Log) -> Self {
            Self {
                name,
                priority,
                phase: MiddlewarePhase::PreAuthentication,
                cancel: false,
                log: Arc::clone(log),
            }
        }

        fn cancelling(mut self) -> Self {
            self.cancel = true;
            self
        }

        fn post_auth(mut self) -> Self {
            self.phase = MiddlewarePhase::PostAuthentication;
            self
        }
    }

    impl Middleware for Recorder {
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
            _endpoint: &EndpointContract,
            _request: &mut Request<'_>,
            _authentication: Option<&dyn Authentication>,
        ) -> Result<MiddlewareOutcome, Failure> {
            self.log.lock().unwrap().push(self.name);
            if self.cancel {
                Ok(MiddlewareOutcome::cancel(EmptyResponse::new(
                    StatusCode::TOO_MANY_REQUESTS,
                )))
            } else {
                Ok(MiddlewareOutcome::Continue)
            }
        }

        fn handle_options(&self, _request: &mut Request<'_>) {
            self.log.lock().unwrap().push(self.name);
        }
    }

    fn contract() -> EndpointContract {
        EndpointContract::new(FnEndpoint::new(|_request, _auth| {
            Ok(EmptyResponse::ok().boxed())
        }))
    }

    fn shared(unit: Recorder) -> Arc<dyn Middleware> {
        Arc::new(unit)
    }

    #[test]
    fn test_priority_then_registration_order() {
        let log = Log::default();
        let server = vec![
            shared(Recorder::new("server-high", MiddlewarePriority::High, &log)),
            shared(Recorder::new("server-medium", MiddlewarePriority::Medium, &log)),
        ];
        let endpoint = vec![
            shared(Recorder::new("endpoint-medium", MiddlewarePriority::Medium, &log)),
            shared(Recorder::new("endpoint-low", MiddlewarePriority::Low, &log)),
        ];

        let chain =
            MiddlewareChain::for_phase(&server, &endpoint, MiddlewarePhase::PreAuthentication);
        assert_eq!(
            chain.names(),
            vec!["endpoint-low", "server-medium", "endpoint-medium", "server-high"]
        );

        let mut exchange = MemoryExchange::get("/");
        let mut request = Request::new(&mut exchange, None).unwrap();
        let outcome = chain.run(&contract(), &mut request, None).unwrap();
        assert!(!outcome.is_cancel());
        assert_eq!(
            *log.lock().unwrap(),
            vec!["endpoint-low", "server-medium", "endpoint-medium", "server-high"]
        );
    }

    #[test]
    fn test_phase_filter() {
        let log = Log::default();
        let server = vec![
            shared(Recorder::new("pre", MiddlewarePriority::Medium, &log)),
            shared(Recorder::new("post", MiddlewarePriority::Medium, &log).post_auth()),
        ];

        let pre = MiddlewareChain::for_phase(&server, &[], MiddlewarePhase::PreAuthentication);
        let post = MiddlewareChain::for_phase(&server, &[], MiddlewarePhase::PostAuthentication);
        assert_eq!(pre.names(), vec!["pre"]);
        assert_eq!(post.names(), vec!["post"]);
    }

    #[test]
    fn test_first_cancel_wins() {
        let log = Log::default();
        let server = vec![
            shared(Recorder::new("first", MiddlewarePriority::Low, &log).cancelling()),
            shared(Recorder::new("second", MiddlewarePriority::High, &log)),
        ];
        let chain = MiddlewareChain::for_phase(&server, &[], MiddlewarePhase::PreAuthentication);

        let mut exchange = MemoryExchange::get("/");
        let mut request = Request::new(&mut exchange, None).unwrap();
        match chain.run(&contract(), &mut request, None).unwrap() {
            MiddlewareOutcome::Cancel(response) => {
                assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
            }
            MiddlewareOutcome::Continue => panic!("expected cancel"),
        }
        assert_eq!(*log.lock().unwrap(), vec!["first"]);
    }

    #[test]
    fn test_panicking_unit_becomes_failure() {
        struct Panics;

        impl Middleware for Panics {
            fn phase(&self) -> MiddlewarePhase {
                MiddlewarePhase::PreAuthentication
            }

            fn handle(
                &self,
                _endpoint: &EndpointContract,
                _request: &mut Request<'_>,
                _authentication: Option<&dyn Authentication>,
            ) -> Result<MiddlewareOutcome, Failure> {
                panic!("middleware exploded")
            }
        }

        let server: Vec<Arc<dyn Middleware>> = vec![Arc::new(Panics)];
        let chain = MiddlewareChain::for_phase(&server, &[], MiddlewarePhase::PreAuthentication);
        let mut exchange = MemoryExchange::get("/");
        let mut request = Request::new(&mut exchange, None).unwrap();

        let failure = chain.run(&contract(), &mut request, None).unwrap_err();
        assert_eq!(failure.type_name(), "panic");
        assert_eq!(failure.message(), "middleware exploded");
    }

    #[test]
    fn test_options_hooks_ignore_phase_and_priority() {
        let log = Log::default();
        let server = vec![
            shared(Recorder::new("server-post", MiddlewarePriority::Highest, &log).post_auth()),
        ];
        let endpoint = vec![shared(Recorder::new(
            "endpoint-pre",
            MiddlewarePriority::Lowest,
            &log,
        ))];

        let mut exchange = MemoryExchange::new("OPTIONS", http::Uri::from_static("/"));
        let mut request = Request::new(&mut exchange, None).unwrap();
        run_options_hooks(&server, &endpoint, &mut request);
        assert_eq!(*log.lock().unwrap(), vec!["server-post", "endpoint-pre"]);
    }
}
