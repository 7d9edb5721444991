//! Response family and error disclosure policy.

use std::fmt;
use std::str::FromStr;

use http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::response::{BoxResponse, HttpResponse, JsonResponse, TextResponse};

/// The serialization family used for default and error responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    /// Plain text bodies.
    Text,
    /// JSON bodies.
    #[default]
    Json,
}

impl ResponseType {
    /// Builds an error response carrying `message` with the given status.
    ///
    /// JSON responses have the shape `{"error": message}`; text responses
    /// carry the message verbatim.
    ///
    /// # Example
    ///
    /// ```
    /// use hermes_core::ResponseType;
    /// use http::StatusCode;
    ///
    /// let response = ResponseType::Json.error("Unauthenticated", StatusCode::UNAUTHORIZED);
    /// assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    /// ```
    #[must_use]
    pub fn error(self, message: impl Into<String>, status: StatusCode) -> BoxResponse {
        let message = message.into();
        match self {
            Self::Json => JsonResponse::new(serde_json::json!({ "error": message }))
                .with_status(status)
                .boxed(),
            Self::Text => TextResponse::new(message).with_status(status).boxed(),
        }
    }

    /// Returns the lowercase name used in configuration.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Json => "json",
        }
    }
}

impl fmt::Display for ResponseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResponseType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown response type: {other}")),
        }
    }
}

/// How much detail of an internal failure is disclosed in the response.
///
/// `Inherit` means "use the parent's setting". It is resolved at the moment
/// a setting is written (see [`ExceptionMode::or_inherit`]) and is never the
/// effective mode of a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExceptionMode {
    /// Context message, type name, error message and stack trace.
    Stacktrace,
    /// Context message, type name and error message.
    #[default]
    Message,
    /// Context message and type name.
    Type,
    /// Only the context message.
    Hide,
    /// Use the parent's setting.
    Inherit,
}

impl ExceptionMode {
    /// The mode a server falls back to when asked to inherit.
    pub const DEFAULT: ExceptionMode = ExceptionMode::Message;

    /// Resolves `Inherit` to `parent`; any other mode is returned unchanged.
    ///
    /// ```
    /// use hermes_core::ExceptionMode;
    ///
    /// assert_eq!(ExceptionMode::Inherit.or_inherit(ExceptionMode::Hide), ExceptionMode::Hide);
    /// assert_eq!(ExceptionMode::Type.or_inherit(ExceptionMode::Hide), ExceptionMode::Type);
    /// ```
    #[must_use]
    pub const fn or_inherit(self, parent: ExceptionMode) -> ExceptionMode {
        match self {
            Self::Inherit => parent,
            mode => mode,
        }
    }

    /// Returns `true` for the `Inherit` sentinel.
    #[must_use]
    pub const fn is_inherit(self) -> bool {
        matches!(self, Self::Inherit)
    }

    /// Whether the error's type name is disclosed.
    #[must_use]
    pub const fn discloses_type(self) -> bool {
        matches!(self, Self::Type | Self::Message | Self::Stacktrace)
    }

    /// Whether the error's own message is disclosed.
    #[must_use]
    pub const fn discloses_message(self) -> bool {
        matches!(self, Self::Message | Self::Stacktrace)
    }

    /// Whether the formatted stack trace is disclosed.
    #[must_use]
    pub const fn discloses_stack_trace(self) -> bool {
        matches!(self, Self::Stacktrace)
    }

    /// Returns the lowercase name used in configuration.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stacktrace => "stacktrace",
            Self::Message => "message",
            Self::Type => "type",
            Self::Hide => "hide",
            Self::Inherit => "inherit",
        }
    }
}

impl fmt::Display for ExceptionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExceptionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "stacktrace" => Ok(Self::Stacktrace),
            "message" => Ok(Self::Message),
            "type" => Ok(Self::Type),
            "hide" => Ok(Self::Hide),
            "inherit" => Ok(Self::Inherit),
            other => Err(format!("unknown exception mode: {other}")),
        }
    }
}
