//! Identity resolution across endpoint and server providers.

use std::sync::Arc;

use hermes_core::{
    AuthenticationProvider, EndpointContract, Failure, Request, SharedAuthentication,
};
use tracing::debug;

/// Resolves the caller identity for a request.
///
/// Endpoint providers are tried first, in registration order. If none
/// matched and the endpoint opts into server providers, those are tried
/// next. The first provider returning an identity wins and no later provider
/// runs.
///
/// # Errors
///
/// The first provider failure (including a panic) is returned.
pub fn resolve_authentication(
    contract: &EndpointContract,
    server_providers: &[Arc<dyn AuthenticationProvider>],
    request: &Request<'_>,
) -> Result<Option<SharedAuthentication>, Failure> {
    if let Some(found) = first_match(contract.providers(), request)? {
        return Ok(Some(found));
    }
    if contract.use_server_auth_providers() {
        return first_match(server_providers, request);
    }
    Ok(None)
}

fn first_match(
    providers: &[Arc<dyn AuthenticationProvider>],
    request: &Request<'_>,
) -> Result<Option<SharedAuthentication>, Failure> {
    for provider in providers {
        if let Some(found) = Failure::guard(|| provider.authenticate(request))? {
            debug!(provider = provider.name(), "request authenticated");
            return Ok(Some(found));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use hermes_core::{
        Authentication, EmptyResponse, FnEndpoint, FnProvider, HttpResponse, Identity,
        MemoryExchange,
    };

    fn named(subject: &'static str) -> Arc<dyn AuthenticationProvider> {
        Arc::new(FnProvider::new(move |_request| {
            Ok(Some(Identity::new(subject).shared()))
        }))
    }

    fn none() -> Arc<dyn AuthenticationProvider> {
        Arc::new(FnProvider::new(|_request| Ok(None)))
    }

    fn builder() -> hermes_core::EndpointContractBuilder {
        EndpointContract::builder(FnEndpoint::new(|_request, _auth| {
            Ok(EmptyResponse::ok().boxed())
        }))
    }

    fn subject_of(contract: &EndpointContract, server: &[Arc<dyn AuthenticationProvider>]) -> Option<String> {
        let mut exchange = MemoryExchange::get("/");
        let request = Request::new(&mut exchange, None).unwrap();
        resolve_authentication(contract, server, &request)
            .unwrap()
            .and_then(|identity| identity.subject().map(str::to_string))
    }

    #[test]
    fn test_endpoint_providers_win_over_server() {
        let contract = builder().shared_provider(named("endpoint")).build();
        assert_eq!(
            subject_of(&contract, &[named("server")]).as_deref(),
            Some("endpoint")
        );
    }

    #[test]
    fn test_falls_back_to_server_providers() {
        let contract = builder().shared_provider(none()).build();
        assert_eq!(
            subject_of(&contract, &[none(), named("server")]).as_deref(),
            Some("server")
        );
    }

    #[test]
    fn test_server_providers_can_be_disabled() {
        let contract = builder().use_server_auth_providers(false).build();
        assert_eq!(subject_of(&contract, &[named("server")]), None);
    }

    #[test]
    fn test_first_match_stops_resolution() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let failing: Arc<dyn AuthenticationProvider> = Arc::new(FnProvider::new(move |_request| {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(Failure::msg("must not run"))
        }));

        let contract = builder()
            .shared_provider(named("first"))
            .shared_provider(failing)
            .build();
        assert_eq!(subject_of(&contract, &[]).as_deref(), Some("first"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_provider_failure_propagates() {
        let failing: Arc<dyn AuthenticationProvider> =
            Arc::new(FnProvider::new(|_request| panic!("provider crashed")));
        let contract = builder().build();

        let mut exchange = MemoryExchange::get("/");
        let request = Request::new(&mut exchange, None).unwrap();
        let failure = resolve_authentication(&contract, &[failing], &request).unwrap_err();
        assert_eq!(failure.type_name(), "panic");
    }
}
