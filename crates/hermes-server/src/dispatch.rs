//! The per-endpoint dispatch pipeline.
//!
//! A [`Dispatcher`] turns one exchange into exactly one response:
//!
//! 1. Resolve the effective response type and exception mode
//! 2. Parse the body
//! 3. Build the [`Request`] (unknown methods get `405`)
//! 4. Answer `OPTIONS` directly
//! 5. Check the method against the endpoint's allow-list
//! 6. Run pre-authentication middleware
//! 7. Resolve the caller identity and enforce required authentication
//! 8. Run the endpoint's authorization hook
//! 9. Run post-authentication middleware
//! 10. Invoke the endpoint
//!
//! Every step may short-circuit with a response. Failures (including panics)
//! are reported to the exception consumers and translated according to the
//! effective exception mode.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use arc_swap::ArcSwap;
use bytes::Bytes;
use hermes_core::{
    Authentication, AuthorizationDecision, BodyParser, BodyParsing, BoxResponse, EmptyResponse,
    EndpointContract, ExceptionConsumer, ExceptionMode, Exchange, Failure, HttpMethod,
    HttpResponse, MiddlewareOutcome, MiddlewarePhase, RawBodyParser, Request, ResponseType,
};
use hermes_middleware::{run_options_hooks, MiddlewareChain};
use http::header::{HeaderValue, ALLOW, CONTENT_TYPE};
use http::StatusCode;
use tracing::{debug, error, info_span, warn};

use crate::authentication::resolve_authentication;
use crate::settings::ServerSettings;
use crate::translate::{context_message, exception_response};

const BODY_LABEL: &str = "processing the request body";
const OPTIONS_LABEL: &str = "processing the OPTIONS request";
const PRE_AUTH_LABEL: &str = "processing pre-authentication middlewares";
const AUTHENTICATION_LABEL: &str = "processing authentication";
const AUTHORIZATION_LABEL: &str = "processing authorization";
const POST_AUTH_LABEL: &str = "processing post-authentication middlewares";
const HANDLER_LABEL: &str = "processing your request";

/// Body of the last-resort response.
pub const LAST_RESORT_MESSAGE: &str = "500 Unhandled exception in dispatch";

/// Dispatches requests for one registered path.
pub struct Dispatcher {
    path: String,
    contract: EndpointContract,
    settings: Arc<ArcSwap<ServerSettings>>,
}

impl Dispatcher {
    pub(crate) fn new(
        path: String,
        contract: EndpointContract,
        settings: Arc<ArcSwap<ServerSettings>>,
    ) -> Self {
        Self {
            path,
            contract,
            settings,
        }
    }

    /// The path this dispatcher is bound to.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The endpoint contract.
    #[must_use]
    pub fn contract(&self) -> &EndpointContract {
        &self.contract
    }

    /// Dispatches and renders one exchange.
    ///
    /// Never panics and never leaves the exchange without a response: if
    /// rendering fails or something escapes the pipeline, a plain-text
    /// [`LAST_RESORT_MESSAGE`] is sent (unless a response already went out).
    pub fn handle(&self, exchange: &mut dyn Exchange) {
        let span = info_span!("dispatch", path = %self.path, method = exchange.method());
        let _entered = span.enter();

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            let response = self.process(exchange);
            debug!(status = response.status().as_u16(), "rendering response");
            response.render(exchange)
        }));

        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                error!(error = %err, "failed to render response");
                last_resort(exchange);
            }
            Err(payload) => {
                let failure = Failure::from_panic(payload);
                error!(panic = %failure.message(), "unhandled exception in dispatch");
                last_resort(exchange);
            }
        }
    }

    /// Runs the pipeline and returns the response without rendering it.
    ///
    /// The server settings are loaded once and used for the whole run.
    /// User code at every stage is guarded; only a panicking exception
    /// consumer escapes, and [`handle`](Self::handle) catches that.
    pub fn process(&self, exchange: &mut dyn Exchange) -> BoxResponse {
        let settings = self.settings.load_full();
        let policy = FailurePolicy {
            consumers: &settings.consumers,
            response_type: self
                .contract
                .response_type()
                .unwrap_or(settings.default_response_type),
            mode: self
                .contract
                .exception_mode()
                .unwrap_or(settings.exception_mode),
        };

        let body = match self.parse_body(&settings, exchange) {
            Ok(body) => body,
            Err(failure) => return policy.respond(&failure, BODY_LABEL),
        };

        let mut request = match Request::new(exchange, body) {
            Ok(request) => request,
            Err(err) => {
                warn!(error = %err, "unsupported method");
                return policy
                    .response_type
                    .error(err.to_string(), StatusCode::METHOD_NOT_ALLOWED);
            }
        };
        let method = request.method();

        if method == HttpMethod::Options {
            return match Failure::guard(|| self.options(&settings, &mut request)) {
                Ok(response) => response,
                Err(failure) => policy.respond(&failure, OPTIONS_LABEL),
            };
        }

        if !self.contract.is_method_allowed(method) {
            warn!(%method, "method not allowed");
            return policy.response_type.error(
                format!("Method {method} is not allowed for this endpoint"),
                StatusCode::METHOD_NOT_ALLOWED,
            );
        }

        let pre_auth = MiddlewareChain::for_phase(
            &settings.middlewares,
            self.contract.middlewares(),
            MiddlewarePhase::PreAuthentication,
        );
        match pre_auth.run(&self.contract, &mut request, None) {
            Ok(MiddlewareOutcome::Continue) => {}
            Ok(MiddlewareOutcome::Cancel(response)) => return response,
            Err(failure) => return policy.respond(&failure, PRE_AUTH_LABEL),
        }

        let authentication =
            match resolve_authentication(&self.contract, &settings.providers, &request) {
                Ok(authentication) => authentication,
                Err(failure) => return policy.respond(&failure, AUTHENTICATION_LABEL),
            };
        if self.contract.require_authentication() && authentication.is_none() {
            warn!("authentication required but no provider matched");
            return policy
                .response_type
                .error("Unauthenticated", StatusCode::UNAUTHORIZED);
        }
        let identity: Option<&dyn Authentication> = authentication.as_deref();

        let handler = self.contract.handler();
        match Failure::guard(|| Ok(handler.authorize(identity, &request))) {
            Ok(AuthorizationDecision::Allow) => {}
            Ok(AuthorizationDecision::Deny { message, status }) => {
                warn!(status = status.as_u16(), "authorization denied");
                return policy.response_type.error(message, status);
            }
            Err(failure) => return policy.respond(&failure, AUTHORIZATION_LABEL),
        }

        let post_auth = MiddlewareChain::for_phase(
            &settings.middlewares,
            self.contract.middlewares(),
            MiddlewarePhase::PostAuthentication,
        );
        match post_auth.run(&self.contract, &mut request, identity) {
            Ok(MiddlewareOutcome::Continue) => {}
            Ok(MiddlewareOutcome::Cancel(response)) => return response,
            Err(failure) => return policy.respond(&failure, POST_AUTH_LABEL),
        }

        debug!("invoking endpoint");
        match Failure::guard(|| handler.handle(&mut request, identity)) {
            Ok(response) => response,
            Err(failure) => policy.respond(&failure, HANDLER_LABEL),
        }
    }

    fn parse_body(
        &self,
        settings: &ServerSettings,
        exchange: &mut dyn Exchange,
    ) -> Result<Option<String>, Failure> {
        match self.contract.body_parsing() {
            BodyParsing::Default => {
                let parser = settings
                    .max_body_bytes
                    .map_or_else(RawBodyParser::new, RawBodyParser::with_limit);
                Failure::guard(|| parser.parse(exchange)).map(Some)
            }
            BodyParsing::Custom(parser) => Failure::guard(|| parser.parse(exchange)).map(Some),
            BodyParsing::Disabled => Ok(None),
        }
    }

    fn options(
        &self,
        settings: &ServerSettings,
        request: &mut Request<'_>,
    ) -> Result<BoxResponse, Failure> {
        run_options_hooks(&settings.middlewares, self.contract.middlewares(), request);
        let allow = HttpMethod::join(self.contract.advertised_methods());
        request.insert_response_header(ALLOW, allow)?;
        debug!("answered OPTIONS");
        Ok(EmptyResponse::ok().boxed())
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("path", &self.path)
            .field("contract", &self.contract)
            .finish_non_exhaustive()
    }
}

/// How caught failures are reported and translated for one dispatch.
struct FailurePolicy<'a> {
    consumers: &'a [Arc<dyn ExceptionConsumer>],
    response_type: ResponseType,
    mode: ExceptionMode,
}

impl FailurePolicy<'_> {
    fn respond(&self, failure: &Failure, label: &str) -> BoxResponse {
        for consumer in self.consumers {
            consumer.accept(failure);
        }
        warn!(
            stage = label,
            exception_type = failure.type_name(),
            error = %failure.error(),
            "dispatch step failed"
        );
        exception_response(self.response_type, self.mode, failure, &context_message(label))
    }
}

pub(crate) fn last_resort(exchange: &mut dyn Exchange) {
    if exchange.is_sent() {
        return;
    }
    exchange.response_headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    if let Err(err) = exchange.send(
        StatusCode::INTERNAL_SERVER_ERROR,
        Bytes::from_static(LAST_RESORT_MESSAGE.as_bytes()),
    ) {
        error!(error = %err, "failed to send last-resort response");
    }
}
