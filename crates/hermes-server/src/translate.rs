//! Failure-to-response translation.
//!
//! Every failure caught by the dispatcher becomes a `500` whose content is
//! limited by the effective [`ExceptionMode`]:
//!
//! | Mode | `error` | `exception_type` | `message` | `stacktrace` |
//! |------|---------|------------------|-----------|--------------|
//! | hide | context | | | |
//! | type | context. type | yes | | |
//! | message | context. type. message | yes | yes | |
//! | stacktrace | context. type. message | yes | yes | yes |
//!
//! Text responses carry the `error` string, followed by a line break and the
//! stack trace in `stacktrace` mode.

use hermes_core::{
    BoxResponse, ExceptionMode, Failure, HttpResponse, JsonResponse, ResponseType, TextResponse,
};
use http::StatusCode;
use serde_json::{Map, Value};

/// Indentation of JSON error bodies.
pub const ERROR_JSON_INDENT: usize = 4;

/// Builds the context message for a dispatch stage label.
///
/// ```
/// use hermes_server::translate::context_message;
///
/// assert_eq!(
///     context_message("processing your request"),
///     "An internal error occurred while processing your request"
/// );
/// ```
#[must_use]
pub fn context_message(label: &str) -> String {
    format!("An internal error occurred while {label}")
}

/// Translates a caught failure into an internal-error response.
#[must_use]
pub fn exception_response(
    response_type: ResponseType,
    mode: ExceptionMode,
    failure: &Failure,
    context: &str,
) -> BoxResponse {
    let summary = summary(mode, failure, context);
    match response_type {
        ResponseType::Json => {
            let mut body = Map::new();
            body.insert("error".into(), Value::String(summary));
            if mode.discloses_type() {
                body.insert(
                    "exception_type".into(),
                    Value::String(failure.type_name().to_string()),
                );
            }
            if mode.discloses_message() {
                body.insert("message".into(), Value::String(failure.message()));
            }
            if mode.discloses_stack_trace() {
                body.insert("stacktrace".into(), Value::String(failure.stack_trace()));
            }
            JsonResponse::new(Value::Object(body))
                .with_status(StatusCode::INTERNAL_SERVER_ERROR)
                .with_indentation(ERROR_JSON_INDENT)
                .boxed()
        }
        ResponseType::Text => {
            let mut text = summary;
            if mode.discloses_stack_trace() {
                text.push('\n');
                text.push_str(&failure.stack_trace());
            }
            TextResponse::new(text)
                .with_status(StatusCode::INTERNAL_SERVER_ERROR)
                .boxed()
        }
    }
}

fn summary(mode: ExceptionMode, failure: &Failure, context: &str) -> String {
    let mut summary = context.to_string();
    if mode.discloses_type() {
        summary.push_str(". ");
        summary.push_str(failure.type_name());
    }
    if mode.discloses_message() {
        summary.push_str(". ");
        summary.push_str(&failure.message());
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use hermes_core::{HandlerError, MemoryExchange};

    const CONTEXT: &str = "An internal error occurred while processing your request";

    fn render_json(mode: ExceptionMode) -> Map<String, Value> {
        let response = exception_response(ResponseType::Json, mode, &Failure::msg("boom"), CONTEXT);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let mut exchange = MemoryExchange::get("/");
        response.render(&mut exchange).unwrap();
        match serde_json::from_slice(exchange.response_body().unwrap()).unwrap() {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    fn render_text(mode: ExceptionMode) -> String {
        let response = exception_response(ResponseType::Text, mode, &Failure::msg("boom"), CONTEXT);
        let mut exchange = MemoryExchange::get("/");
        response.render(&mut exchange).unwrap();
        String::from_utf8(exchange.response_body().unwrap().to_vec()).unwrap()
    }

    fn handler_error_name() -> &'static str {
        std::any::type_name::<HandlerError>()
    }

    #[test]
    fn test_hide_discloses_only_context() {
        let body = render_json(ExceptionMode::Hide);
        assert_eq!(body.len(), 1);
        assert_eq!(body["error"], CONTEXT);
    }

    #[test]
    fn test_type_mode() {
        let body = render_json(ExceptionMode::Type);
        assert_eq!(body.len(), 2);
        assert_eq!(body["error"], format!("{CONTEXT}. {}", handler_error_name()));
        assert_eq!(body["exception_type"], handler_error_name());
    }

    #[test]
    fn test_message_mode() {
        let body = render_json(ExceptionMode::Message);
        assert_eq!(body.len(), 3);
        assert_eq!(
            body["error"],
            format!("{CONTEXT}. {}. boom", handler_error_name())
        );
        assert_eq!(body["message"], "boom");
        assert!(!body.contains_key("stacktrace"));
    }

    #[test]
    fn test_stacktrace_mode() {
        let body = render_json(ExceptionMode::Stacktrace);
        assert_eq!(body.len(), 4);
        let trace = body["stacktrace"].as_str().unwrap();
        assert!(!trace.is_empty());
        assert!(trace.contains("boom"));
    }

    #[test]
    fn test_json_body_is_indented() {
        let response =
            exception_response(ResponseType::Json, ExceptionMode::Hide, &Failure::msg("x"), "ctx");
        let mut exchange = MemoryExchange::get("/");
        response.render(&mut exchange).unwrap();
        assert_eq!(
            exchange.response_body().unwrap().as_ref(),
            b"{\n    \"error\": \"ctx\"\n}"
        );
    }

    #[test]
    fn test_text_forms() {
        assert_eq!(render_text(ExceptionMode::Hide), CONTEXT);
        assert_eq!(
            render_text(ExceptionMode::Message),
            format!("{CONTEXT}. {}. boom", handler_error_name())
        );

        let with_trace = render_text(ExceptionMode::Stacktrace);
        let (head, trace) = with_trace.split_once('\n').unwrap();
        assert_eq!(head, format!("{CONTEXT}. {}. boom", handler_error_name()));
        assert!(!trace.is_empty());
    }
}
