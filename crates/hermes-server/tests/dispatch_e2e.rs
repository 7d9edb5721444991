//! End-to-end dispatch tests.
//!
//! Every request goes through `Server::route` on an in-memory exchange, so
//! these cover the whole pipeline in order:
//!
//! 1. Body parsing
//! 2. `OPTIONS` short-circuit
//! 3. Method validation
//! 4. Pre-authentication middleware
//! 5. Authentication (endpoint providers, then server providers)
//! 6. Authorization
//! 7. Post-authentication middleware
//! 8. Endpoint handler

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use hermes_core::{
    Authentication, AuthorizationDecision, BoxResponse, EmptyResponse, Endpoint,
    EndpointContract, ExceptionMode, Failure, FnConsumer, FnEndpoint, FnProvider, HandlerError,
    HttpMethod, HttpResponse, Identity, JsonResponse, MiddlewareOutcome, MiddlewarePhase,
    MiddlewarePriority, Request, ResponseType, TextResponse,
};
use hermes_middleware::{
    BearerTokenProvider, CorsAnywhereMiddleware, FnMiddleware, RequestIdMiddleware,
};
use hermes_server::Server;
use hermes_test::TestClient;
use http::StatusCode;
use serde_json::json;

const HANDLER_CONTEXT: &str = "An internal error occurred while processing your request";

/// A shared invocation counter.
#[derive(Clone, Default)]
struct Counter(Arc<AtomicUsize>);

impl Counter {
    fn hit(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

fn ok_endpoint() -> FnEndpoint<
    impl Fn(&mut Request<'_>, Option<&dyn Authentication>) -> Result<BoxResponse, Failure>
        + Send
        + Sync
        + 'static,
> {
    FnEndpoint::new(|_request, _auth| Ok(TextResponse::new("ok").boxed()))
}

fn counting_endpoint(
    counter: Counter,
) -> FnEndpoint<
    impl Fn(&mut Request<'_>, Option<&dyn Authentication>) -> Result<BoxResponse, Failure>
        + Send
        + Sync
        + 'static,
> {
    FnEndpoint::new(move |_request, _auth| {
        counter.hit();
        Ok(TextResponse::new("handled").boxed())
    })
}

fn failing_endpoint() -> FnEndpoint<
    impl Fn(&mut Request<'_>, Option<&dyn Authentication>) -> Result<BoxResponse, Failure>
        + Send
        + Sync
        + 'static,
> {
    FnEndpoint::new(|_request, _auth| Err(Failure::msg("boom")))
}

fn client_with(path: &str, contract: EndpointContract) -> TestClient {
    let server = Server::new();
    server.add_endpoint(path, contract).unwrap();
    TestClient::new(server)
}

// ---------------------------------------------------------------------------
// Method validation
// ---------------------------------------------------------------------------

#[test]
fn test_empty_allow_list_accepts_every_method() {
    let client = client_with("/any", EndpointContract::new(ok_endpoint()));

    for method in HttpMethod::ALL {
        let response = client.request(method.as_str(), "/any").send();
        assert_eq!(response.status(), StatusCode::OK, "method {method}");
    }
}

#[test]
fn test_disallowed_method_skips_middleware_and_providers() {
    let middleware_runs = Counter::default();
    let provider_runs = Counter::default();
    let handler_runs = Counter::default();

    let server = Server::new();
    let runs = middleware_runs.clone();
    server.add_middleware(
        FnMiddleware::new("count", move |_endpoint, _request, _auth| {
            runs.hit();
            Ok(MiddlewareOutcome::Continue)
        })
        .with_phase(MiddlewarePhase::PreAuthentication),
    );
    let runs = provider_runs.clone();
    server.add_authentication_provider(FnProvider::new(move |_request| {
        runs.hit();
        Ok(None)
    }));
    server
        .add_endpoint(
            "/items",
            EndpointContract::builder(counting_endpoint(handler_runs.clone()))
                .method(HttpMethod::Get)
                .build(),
        )
        .unwrap();
    let client = TestClient::new(server);

    client
        .post("/items")
        .send()
        .assert_status(StatusCode::METHOD_NOT_ALLOWED)
        .assert_json(&json!({ "error": "Method POST is not allowed for this endpoint" }));

    assert_eq!(middleware_runs.get(), 0);
    assert_eq!(provider_runs.get(), 0);
    assert_eq!(handler_runs.get(), 0);
}

#[test]
fn test_unsupported_method_string() {
    let handler_runs = Counter::default();
    let client = client_with(
        "/pot",
        EndpointContract::new(counting_endpoint(handler_runs.clone())),
    );

    client
        .request("BREW", "/pot")
        .send()
        .assert_status(StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(handler_runs.get(), 0);
}

// ---------------------------------------------------------------------------
// OPTIONS
// ---------------------------------------------------------------------------

#[test]
fn test_options_lists_declared_methods() {
    let handler_runs = Counter::default();
    let provider_runs = Counter::default();
    let runs = provider_runs.clone();

    let client = client_with(
        "/orders",
        EndpointContract::builder(counting_endpoint(handler_runs.clone()))
            .methods([HttpMethod::Get, HttpMethod::Post])
            .require_authentication(true)
            .provider(FnProvider::new(move |_request| {
                runs.hit();
                Ok(None)
            }))
            .build(),
    );

    client
        .options("/orders")
        .send()
        .assert_status(StatusCode::OK)
        .assert_header("allow", "GET, POST")
        .assert_empty_body();

    assert_eq!(handler_runs.get(), 0);
    assert_eq!(provider_runs.get(), 0);
}

#[test]
fn test_options_without_declared_methods_lists_all() {
    let client = client_with("/any", EndpointContract::new(ok_endpoint()));

    client
        .options("/any")
        .send()
        .assert_header("allow", HttpMethod::join(&HttpMethod::ALL));
}

#[test]
fn test_options_runs_option_hooks() {
    let server = Server::new();
    server.add_middleware(CorsAnywhereMiddleware);
    server
        .add_endpoint("/cors", EndpointContract::new(ok_endpoint()))
        .unwrap();
    let client = TestClient::new(server);

    client
        .options("/cors")
        .send()
        .assert_status(StatusCode::OK)
        .assert_header("access-control-allow-origin", "*")
        .assert_header("access-control-allow-headers", "*");
}

// ---------------------------------------------------------------------------
// Middleware
// ---------------------------------------------------------------------------

#[test]
fn test_pre_auth_cancel_is_terminal() {
    let provider_runs = Counter::default();
    let post_auth_runs = Counter::default();
    let handler_runs = Counter::default();

    let server = Server::new();
    server.add_middleware(
        FnMiddleware::new("rate_limit", |_endpoint, _request, _auth| {
            Ok(MiddlewareOutcome::cancel(EmptyResponse::new(
                StatusCode::TOO_MANY_REQUESTS,
            )))
        })
        .with_phase(MiddlewarePhase::PreAuthentication),
    );
    let runs = post_auth_runs.clone();
    server.add_middleware(FnMiddleware::new("post", move |_endpoint, _request, _auth| {
        runs.hit();
        Ok(MiddlewareOutcome::Continue)
    }));
    let runs = provider_runs.clone();
    server.add_authentication_provider(FnProvider::new(move |_request| {
        runs.hit();
        Ok(None)
    }));
    server
        .add_endpoint(
            "/limited",
            EndpointContract::new(counting_endpoint(handler_runs.clone())),
        )
        .unwrap();
    let client = TestClient::new(server);

    client
        .get("/limited")
        .send()
        .assert_status(StatusCode::TOO_MANY_REQUESTS);

    assert_eq!(provider_runs.get(), 0);
    assert_eq!(post_auth_runs.get(), 0);
    assert_eq!(handler_runs.get(), 0);
}

#[test]
fn test_priority_orders_middleware() {
    let tag = |name: &'static str, priority| {
        FnMiddleware::new(name, move |_endpoint, request, _auth| {
            request.add_response_header("x-order", name)?;
            Ok(MiddlewareOutcome::Continue)
        })
        .with_phase(MiddlewarePhase::PreAuthentication)
        .with_priority(priority)
    };

    let server = Server::new();
    server.add_middleware(tag("server-high", MiddlewarePriority::High));
    server.add_middleware(tag("server-medium", MiddlewarePriority::Medium));
    server
        .add_endpoint(
            "/ordered",
            EndpointContract::builder(ok_endpoint())
                .middleware(tag("endpoint-low", MiddlewarePriority::Low))
                .middleware(tag("endpoint-medium", MiddlewarePriority::Medium))
                .build(),
        )
        .unwrap();
    let client = TestClient::new(server);

    let response = client.get("/ordered").send();
    let order: Vec<&str> = response
        .headers()
        .get_all("x-order")
        .iter()
        .map(|value| value.to_str().unwrap())
        .collect();
    assert_eq!(
        order,
        vec!["endpoint-low", "server-medium", "endpoint-medium", "server-high"]
    );
}

#[test]
fn test_post_auth_middleware_sees_identity() {
    let server = Server::new();
    server.add_middleware(
        FnMiddleware::new("pre", |_endpoint, request, auth| {
            request.add_response_header("x-pre-auth", if auth.is_some() { "yes" } else { "no" })?;
            Ok(MiddlewareOutcome::Continue)
        })
        .with_phase(MiddlewarePhase::PreAuthentication),
    );
    server.add_middleware(FnMiddleware::new("post", |_endpoint, request, auth| {
        let subject = auth.and_then(|a| a.subject()).unwrap_or("none").to_string();
        request.add_response_header("x-post-auth", subject)?;
        Ok(MiddlewareOutcome::Continue)
    }));
    server.add_authentication_provider(FnProvider::new(|_request| {
        Ok(Some(Identity::new("alice").shared()))
    }));
    server
        .add_endpoint("/me", EndpointContract::new(ok_endpoint()))
        .unwrap();
    let client = TestClient::new(server);

    client
        .get("/me")
        .send()
        .assert_status(StatusCode::OK)
        .assert_header("x-pre-auth", "no")
        .assert_header("x-post-auth", "alice");
}

#[test]
fn test_request_id_is_echoed() {
    let server = Server::new();
    server.add_middleware(RequestIdMiddleware::new());
    server
        .add_endpoint("/traced", EndpointContract::new(ok_endpoint()))
        .unwrap();
    let client = TestClient::new(server);

    let incoming = "01936c4a-9d7e-7c3b-8a2f-5e6d7c8b9a01";
    client
        .get("/traced")
        .header("x-request-id", incoming)
        .send()
        .assert_header("x-request-id", incoming);

    let generated = client.get("/traced").send();
    assert!(generated.header_str("x-request-id").is_some());
}

#[test]
fn test_pre_auth_failure_uses_stage_context() {
    let server = Server::new();
    server.set_exception_mode(ExceptionMode::Hide);
    server.add_middleware(
        FnMiddleware::new("broken", |_endpoint, _request, _auth| Err(Failure::msg("nope")))
            .with_phase(MiddlewarePhase::PreAuthentication),
    );
    server
        .add_endpoint("/broken", EndpointContract::new(ok_endpoint()))
        .unwrap();
    let client = TestClient::new(server);

    client
        .get("/broken")
        .send()
        .assert_status(StatusCode::INTERNAL_SERVER_ERROR)
        .assert_json(&json!({
            "error": "An internal error occurred while processing pre-authentication middlewares"
        }));
}

// ---------------------------------------------------------------------------
// Authentication
// ---------------------------------------------------------------------------

fn subject_endpoint() -> FnEndpoint<
    impl Fn(&mut Request<'_>, Option<&dyn Authentication>) -> Result<BoxResponse, Failure>
        + Send
        + Sync
        + 'static,
> {
    FnEndpoint::new(|_request, auth| {
        let subject = auth.and_then(|a| a.subject()).unwrap_or("anonymous");
        Ok(TextResponse::new(subject).boxed())
    })
}

#[test]
fn test_first_matching_provider_wins() {
    let client = client_with(
        "/me",
        EndpointContract::builder(subject_endpoint())
            .require_authentication(true)
            .provider(FnProvider::new(|_request| {
                Ok(Some(Identity::new("alice").shared()))
            }))
            .provider(FnProvider::new(|_request| -> Result<_, Failure> {
                panic!("second provider must not run")
            }))
            .build(),
    );

    client
        .get("/me")
        .send()
        .assert_status(StatusCode::OK)
        .assert_text("alice");
}

#[test]
fn test_endpoint_providers_before_server_providers() {
    let server = Server::new();
    server.add_authentication_provider(FnProvider::new(|_request| {
        Ok(Some(Identity::new("server").shared()))
    }));
    server
        .add_endpoint(
            "/me",
            EndpointContract::builder(subject_endpoint())
                .provider(FnProvider::new(|request| {
                    Ok(request
                        .header("x-user")
                        .map(|user| Identity::new(user).shared()))
                }))
                .build(),
        )
        .unwrap();
    let client = TestClient::new(server);

    client.get("/me").header("x-user", "bob").send().assert_text("bob");
    client.get("/me").send().assert_text("server");
}

#[test]
fn test_unauthenticated_is_rejected() {
    let handler_runs = Counter::default();
    let client = client_with(
        "/private",
        EndpointContract::builder(counting_endpoint(handler_runs.clone()))
            .require_authentication(true)
            .build(),
    );

    client
        .get("/private")
        .send()
        .assert_status(StatusCode::UNAUTHORIZED)
        .assert_json(&json!({ "error": "Unauthenticated" }));
    assert_eq!(handler_runs.get(), 0);
}

#[test]
fn test_unauthenticated_as_text() {
    let client = client_with(
        "/private",
        EndpointContract::builder(ok_endpoint())
            .require_authentication(true)
            .response_type(ResponseType::Text)
            .build(),
    );

    client
        .get("/private")
        .send()
        .assert_status(StatusCode::UNAUTHORIZED)
        .assert_text("Unauthenticated");
}

#[test]
fn test_server_providers_can_be_skipped() {
    let server = Server::new();
    server.add_authentication_provider(FnProvider::new(|_request| {
        Ok(Some(Identity::new("server").shared()))
    }));
    server
        .add_endpoint(
            "/isolated",
            EndpointContract::builder(ok_endpoint())
                .require_authentication(true)
                .use_server_auth_providers(false)
                .build(),
        )
        .unwrap();
    let client = TestClient::new(server);

    client
        .get("/isolated")
        .send()
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[test]
fn test_bearer_token_provider() {
    let server = Server::new();
    server.add_authentication_provider(BearerTokenProvider::new(|token| {
        Ok((token == "s3cret").then(|| Identity::new("admin").shared()))
    }));
    server
        .add_endpoint(
            "/admin",
            EndpointContract::builder(subject_endpoint())
                .require_authentication(true)
                .build(),
        )
        .unwrap();
    let client = TestClient::new(server);

    client
        .get("/admin")
        .bearer_token("s3cret")
        .send()
        .assert_status(StatusCode::OK)
        .assert_text("admin");
    client
        .get("/admin")
        .bearer_token("wrong")
        .send()
        .assert_status(StatusCode::UNAUTHORIZED);
}

// ---------------------------------------------------------------------------
// Authorization
// ---------------------------------------------------------------------------

/// Requires the `orders:write` permission.
struct WriteOrders {
    handler_runs: Counter,
}

impl Endpoint for WriteOrders {
    fn handle(
        &self,
        _request: &mut Request<'_>,
        _authentication: Option<&dyn Authentication>,
    ) -> Result<BoxResponse, Failure> {
        self.handler_runs.hit();
        Ok(EmptyResponse::new(StatusCode::NO_CONTENT).boxed())
    }

    fn authorize(
        &self,
        authentication: Option<&dyn Authentication>,
        _request: &Request<'_>,
    ) -> AuthorizationDecision {
        match authentication {
            Some(identity) if identity.has_permission("orders:write") => {
                AuthorizationDecision::allow()
            }
            Some(_) => AuthorizationDecision::forbidden(),
            None => AuthorizationDecision::unauthorized(),
        }
    }
}

#[test]
fn test_authorization_decisions() {
    let handler_runs = Counter::default();
    let client = client_with(
        "/orders",
        EndpointContract::builder(WriteOrders {
            handler_runs: handler_runs.clone(),
        })
        .provider(FnProvider::new(|request| {
            Ok(request.header("x-user").map(|user| {
                let identity = Identity::new(user);
                if user == "writer" {
                    identity.with_permission("orders:write").shared()
                } else {
                    identity.shared()
                }
            }))
        }))
        .build(),
    );

    client
        .post("/orders")
        .send()
        .assert_status(StatusCode::UNAUTHORIZED)
        .assert_json(&json!({ "error": "Unauthorized" }));
    client
        .post("/orders")
        .header("x-user", "reader")
        .send()
        .assert_status(StatusCode::FORBIDDEN)
        .assert_json(&json!({ "error": "Forbidden" }));
    assert_eq!(handler_runs.get(), 0);

    client
        .post("/orders")
        .header("x-user", "writer")
        .send()
        .assert_status(StatusCode::NO_CONTENT);
    assert_eq!(handler_runs.get(), 1);
}

// ---------------------------------------------------------------------------
// Handler failures
// ---------------------------------------------------------------------------

fn failing_with_mode(mode: ExceptionMode) -> serde_json::Value {
    let client = client_with(
        "/fail",
        EndpointContract::builder(failing_endpoint())
            .exception_mode(mode)
            .build(),
    );
    let response = client.get("/fail").send();
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    response.json_value().unwrap()
}

#[test]
fn test_message_mode_discloses_type_and_message() {
    let type_name = std::any::type_name::<HandlerError>();
    let body = failing_with_mode(ExceptionMode::Message);

    assert_eq!(body["error"], format!("{HANDLER_CONTEXT}. {type_name}. boom"));
    assert_eq!(body["exception_type"], type_name);
    assert_eq!(body["message"], "boom");
    assert!(body.get("stacktrace").is_none());
}

#[test]
fn test_stacktrace_mode_adds_trace() {
    let body = failing_with_mode(ExceptionMode::Stacktrace);

    assert_eq!(body["message"], "boom");
    assert!(body["stacktrace"].is_string());
}

#[test]
fn test_hide_mode_discloses_only_context() {
    let body = failing_with_mode(ExceptionMode::Hide);
    assert_eq!(body, json!({ "error": HANDLER_CONTEXT }));
}

#[test]
fn test_inherit_uses_server_mode() {
    let server = Server::new();
    server.set_exception_mode(ExceptionMode::Hide);
    server
        .add_endpoint(
            "/fail",
            EndpointContract::builder(failing_endpoint())
                .exception_mode(ExceptionMode::Inherit)
                .build(),
        )
        .unwrap();
    let client = TestClient::new(server);

    client
        .get("/fail")
        .send()
        .assert_json(&json!({ "error": HANDLER_CONTEXT }));
}

#[test]
fn test_handler_panic_becomes_internal_error() {
    let client = client_with(
        "/panic",
        EndpointContract::new(FnEndpoint::new(|_request, _auth| -> Result<BoxResponse, Failure> {
            panic!("kaboom")
        })),
    );

    let response = client.get("/panic").send();
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body = response.json_value().unwrap();
    assert_eq!(body["exception_type"], "panic");
    assert_eq!(body["message"], "kaboom");
}

#[test]
fn test_consumers_see_handler_failures() {
    let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let server = Server::new();
    let sink = Arc::clone(&seen);
    server.add_exception_consumer(FnConsumer::new(move |failure: &Failure| {
        sink.lock().push(failure.message());
    }));
    server
        .add_endpoint("/fail", EndpointContract::new(failing_endpoint()))
        .unwrap();
    server
        .add_endpoint("/ok", EndpointContract::new(ok_endpoint()))
        .unwrap();
    let client = TestClient::new(server);

    client.get("/ok").send();
    client.get("/fail").send();

    assert_eq!(*seen.lock(), vec!["boom".to_string()]);
}

// ---------------------------------------------------------------------------
// Request data
// ---------------------------------------------------------------------------

#[test]
fn test_query_and_body_reach_handler() {
    let client = client_with(
        "/search",
        EndpointContract::new(FnEndpoint::new(|request, _auth| {
            Ok(JsonResponse::new(json!({
                "q": request.query_parameter("q"),
                "page": request.query_parameter("page"),
                "body": request.body(),
            }))
            .boxed())
        })),
    );

    client
        .post("/search?page=2")
        .query("q", "rust & go")
        .json(&json!({ "limit": 5 }))
        .send()
        .assert_status(StatusCode::OK)
        .assert_json(&json!({
            "q": "rust & go",
            "page": "2",
            "body": "{\"limit\":5}",
        }));
}

#[test]
fn test_body_limit_from_server_settings() {
    let server = Server::new();
    server.set_max_body_bytes(Some(4));
    server.set_exception_mode(ExceptionMode::Hide);
    server
        .add_endpoint("/upload", EndpointContract::new(ok_endpoint()))
        .unwrap();
    let client = TestClient::new(server);

    client.post("/upload").body("tiny").send().assert_status(StatusCode::OK);
    client
        .post("/upload")
        .body("far too large")
        .send()
        .assert_status(StatusCode::INTERNAL_SERVER_ERROR)
        .assert_json(&json!({
            "error": "An internal error occurred while processing the request body"
        }));
}

#[test]
fn test_default_parser_accepts_binary_body() {
    let client = client_with(
        "/upload",
        EndpointContract::new(FnEndpoint::new(|request, _auth| {
            let body = request.body().unwrap_or_default();
            Ok(TextResponse::new(format!("{} chars", body.chars().count())).boxed())
        })),
    );

    client
        .post("/upload")
        .body(vec![0x89, b'P', b'N', b'G', 0xff])
        .send()
        .assert_status(StatusCode::OK)
        .assert_text("5 chars");
}

// ---------------------------------------------------------------------------
// Stage failures
// ---------------------------------------------------------------------------

/// A server whose consumer counts failures, with `Hide` mode so bodies carry
/// only the stage context.
fn counting_server(failures: &Counter) -> Server {
    let server = Server::new();
    server.set_exception_mode(ExceptionMode::Hide);
    let sink = failures.clone();
    server.add_exception_consumer(FnConsumer::new(move |_failure: &Failure| sink.hit()));
    server
}

fn stage_context(label: &str) -> serde_json::Value {
    json!({ "error": format!("An internal error occurred while {label}") })
}

#[test]
fn test_provider_error_is_authentication_failure() {
    let failures = Counter::default();
    let handler_runs = Counter::default();
    let server = counting_server(&failures);
    server.add_authentication_provider(FnProvider::new(|_request| {
        Err(Failure::msg("token store offline"))
    }));
    server
        .add_endpoint(
            "/me",
            EndpointContract::new(counting_endpoint(handler_runs.clone())),
        )
        .unwrap();
    let client = TestClient::new(server);

    client
        .get("/me")
        .send()
        .assert_status(StatusCode::INTERNAL_SERVER_ERROR)
        .assert_json(&stage_context("processing authentication"));

    assert_eq!(failures.get(), 1);
    assert_eq!(handler_runs.get(), 0);
}

#[test]
fn test_provider_panic_is_authentication_failure() {
    let failures = Counter::default();
    let handler_runs = Counter::default();
    let server = counting_server(&failures);
    server.set_exception_mode(ExceptionMode::Message);
    server
        .add_endpoint(
            "/me",
            EndpointContract::builder(counting_endpoint(handler_runs.clone()))
                .provider(FnProvider::new(|_request| -> Result<_, Failure> {
                    panic!("provider crashed")
                }))
                .build(),
        )
        .unwrap();
    let client = TestClient::new(server);

    let response = client.get("/me").send();
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body = response.json_value().unwrap();
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("An internal error occurred while processing authentication"));
    assert_eq!(body["exception_type"], "panic");
    assert_eq!(body["message"], "provider crashed");

    assert_eq!(failures.get(), 1);
    assert_eq!(handler_runs.get(), 0);
}

#[test]
fn test_post_auth_failure_uses_stage_context() {
    let failures = Counter::default();
    let handler_runs = Counter::default();
    let server = counting_server(&failures);
    server.add_middleware(FnMiddleware::new("audit", |_endpoint, _request, _auth| {
        Err(Failure::msg("audit log full"))
    }));
    server
        .add_endpoint(
            "/audited",
            EndpointContract::new(counting_endpoint(handler_runs.clone())),
        )
        .unwrap();
    let client = TestClient::new(server);

    client
        .get("/audited")
        .send()
        .assert_status(StatusCode::INTERNAL_SERVER_ERROR)
        .assert_json(&stage_context("processing post-authentication middlewares"));

    assert_eq!(failures.get(), 1);
    assert_eq!(handler_runs.get(), 0);
}

/// An endpoint whose authorization hook panics.
struct BrokenPolicy {
    handler_runs: Counter,
}

impl Endpoint for BrokenPolicy {
    fn handle(
        &self,
        _request: &mut Request<'_>,
        _authentication: Option<&dyn Authentication>,
    ) -> Result<BoxResponse, Failure> {
        self.handler_runs.hit();
        Ok(EmptyResponse::ok().boxed())
    }

    fn authorize(
        &self,
        _authentication: Option<&dyn Authentication>,
        _request: &Request<'_>,
    ) -> AuthorizationDecision {
        panic!("policy table missing")
    }
}

#[test]
fn test_authorize_panic_uses_stage_context() {
    let failures = Counter::default();
    let handler_runs = Counter::default();
    let server = counting_server(&failures);
    server
        .add_endpoint(
            "/guarded",
            EndpointContract::new(BrokenPolicy {
                handler_runs: handler_runs.clone(),
            }),
        )
        .unwrap();
    let client = TestClient::new(server);

    client
        .get("/guarded")
        .send()
        .assert_status(StatusCode::INTERNAL_SERVER_ERROR)
        .assert_json(&stage_context("processing authorization"));

    assert_eq!(failures.get(), 1);
    assert_eq!(handler_runs.get(), 0);
}
