//! Permissive CORS middleware.
//!
//! Sets `Access-Control-Allow-Origin: *` and `Access-Control-Allow-Headers: *`
//! on every response, including `OPTIONS` preflight responses. It never
//! cancels a request.

use hermes_core::{
    Authentication, EndpointContract, Failure, Middleware, MiddlewareOutcome, MiddlewarePhase,
    MiddlewarePriority, Request,
};
use http::header::{ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_ORIGIN};
use http::HeaderValue;

/// Allows any origin and any request header.
#[derive(Debug, Clone, Copy, Default)]
pub struct CorsAnywhereMiddleware;

impl CorsAnywhereMiddleware {
    fn apply(request: &mut Request<'_>) {
        let headers = request.exchange_mut().response_headers_mut();
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
        headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static("*"));
    }
}

impl Middleware for CorsAnywhereMiddleware {
    fn name(&self) -> &'static str {
        "cors_anywhere"
    }

    fn priority(&self) -> MiddlewarePriority {
        MiddlewarePriority::Lowest
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
        Self::apply(request);
        Ok(MiddlewareOutcome::Continue)
    }

    fn handle_options(&self, request: &mut Request<'_>) {
        Self::apply(request);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hermes_core::{EmptyResponse, FnEndpoint, HttpResponse, MemoryExchange};

    fn assert_cors_headers(request: &Request<'_>) {
        let headers = request.response_headers();
        assert_eq!(headers.get(ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(), "*");
        assert_eq!(headers.get(ACCESS_CONTROL_ALLOW_HEADERS).unwrap(), "*");
    }

    #[test]
    fn test_metadata() {
        assert_eq!(CorsAnywhereMiddleware.priority(), MiddlewarePriority::Lowest);
        assert_eq!(
            CorsAnywhereMiddleware.phase(),
            MiddlewarePhase::PreAuthentication
        );
    }

    #[test]
    fn test_handle_sets_headers_and_continues() {
        let contract = EndpointContract::new(FnEndpoint::new(|_request, _auth| {
            Ok(EmptyResponse::ok().boxed())
        }));
        let mut exchange = MemoryExchange::get("/");
        let mut request = Request::new(&mut exchange, None).unwrap();

        let outcome = CorsAnywhereMiddleware
            .handle(&contract, &mut request, None)
            .unwrap();
        assert!(!outcome.is_cancel());
        assert_cors_headers(&request);
    }

    #[test]
    fn test_options_hook_sets_headers() {
        let mut exchange = MemoryExchange::new("OPTIONS", http::Uri::from_static("/"));
        let mut request = Request::new(&mut exchange, None).unwrap();
        CorsAnywhereMiddleware.handle_options(&mut request);
        assert_cors_headers(&request);
    }
}
