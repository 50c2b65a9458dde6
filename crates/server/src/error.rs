//! Server Error Types
//!
//! [`ErrorKind`] covers failures of the server itself (startup, binding,
//! serving) using `exn` trees like the other crates. [`ApiError`] is what a
//! single request can fail with; it knows how to present itself as an HTTP
//! response and never carries more detail than the client is allowed to see.

use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use derive_more::{Display, Error};
use pagepress_config::Environment;
use pagepress_render::error::{Error as RenderError, ErrorKind as RenderErrorKind};
use serde::Serialize;
use std::net::SocketAddr;

/// A server error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for server operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The conversion pipeline could not be built from configuration.
    #[display("could not set up the conversion pipeline")]
    Setup,
    #[display("could not listen on {_0}")]
    Bind(#[error(not(source))] SocketAddr),
    #[display("server terminated unexpectedly")]
    Serve,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Bind(_))
    }
}

/// Why a request was turned down.
#[derive(Debug)]
pub enum ApiError {
    MissingInput,
    InvalidBody,
    PayloadTooLarge,
    Unauthorized,
    Forbidden,
    MethodNotAllowed,
    Render {
        kind: RenderErrorKind,
        /// Full error tree, only populated in development.
        details: Option<String>,
    },
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    kind: &'a str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<&'a str>,
}

impl ApiError {
    /// Convert a pipeline failure, logging it in full first.
    pub fn render(err: RenderError, environment: Environment) -> Self {
        let kind = (*err).clone();
        match &kind {
            RenderErrorKind::MissingInput => return Self::MissingInput,
            RenderErrorKind::Busy => tracing::warn!(kind = kind.code(), "Conversion rejected"),
            _ => {
                tracing::error!(kind = kind.code(), error = %kind, "PDF generation error");
                tracing::debug!(tree = ?err, "PDF generation error detail");
            },
        }
        let details = environment.is_development().then(|| format!("{err:?}"));
        Self::Render { kind, details }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingInput | Self::InvalidBody => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::Render { kind: RenderErrorKind::Busy, .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::Render { kind, .. } if kind.is_client_error() => StatusCode::BAD_REQUEST,
            Self::Render { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingInput => "missing_input",
            Self::InvalidBody => "invalid_body",
            Self::PayloadTooLarge => "payload_too_large",
            Self::Unauthorized => "unauthorized",
            Self::Forbidden => "forbidden",
            Self::MethodNotAllowed => "method_not_allowed",
            Self::Render { kind, .. } => kind.code(),
        }
    }

    fn summary(&self) -> &'static str {
        match self {
            Self::MissingInput => "No HTML content provided",
            Self::InvalidBody => "Invalid request body",
            Self::PayloadTooLarge => "Request body too large",
            Self::Unauthorized => "Unauthorized",
            Self::Forbidden => "Forbidden",
            Self::MethodNotAllowed => "Method not allowed",
            Self::Render { kind: RenderErrorKind::Busy, .. } => "Service busy",
            Self::Render { .. } => "PDF generation failed",
        }
    }

    fn message(&self) -> String {
        match self {
            Self::MissingInput => "request body must include a non-empty `html` field".to_string(),
            Self::InvalidBody => "expected a JSON object or form data with an `html` field".to_string(),
            Self::PayloadTooLarge => "the HTML document exceeds the configured body limit".to_string(),
            Self::Unauthorized => {
                "API key required: send `x-api-key`, `api-key` or `Authorization: Bearer <key>`".to_string()
            },
            Self::Forbidden => "invalid API key".to_string(),
            Self::MethodNotAllowed => "use POST".to_string(),
            Self::Render { kind, .. } => kind.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.summary(),
            kind: self.kind(),
            message: self.message(),
            details: match &self {
                Self::Render { details, .. } => details.as_deref(),
                _ => None,
            },
        };
        let mut response = (self.status(), Json(&body)).into_response();
        if self.status() == StatusCode::SERVICE_UNAVAILABLE {
            response.headers_mut().insert(header::RETRY_AFTER, HeaderValue::from_static("1"));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagepress_render::SessionState;
    use rstest::rstest;

    #[rstest]
    #[case(ApiError::MissingInput, StatusCode::BAD_REQUEST, "missing_input")]
    #[case(ApiError::Unauthorized, StatusCode::UNAUTHORIZED, "unauthorized")]
    #[case(ApiError::Forbidden, StatusCode::FORBIDDEN, "forbidden")]
    #[case(ApiError::MethodNotAllowed, StatusCode::METHOD_NOT_ALLOWED, "method_not_allowed")]
    #[case(ApiError::Render { kind: RenderErrorKind::Busy, details: None }, StatusCode::SERVICE_UNAVAILABLE, "busy")]
    #[case(
        ApiError::Render { kind: RenderErrorKind::LaunchFailed, details: None },
        StatusCode::INTERNAL_SERVER_ERROR,
        "launch_failure"
    )]
    #[case(
        ApiError::Render { kind: RenderErrorKind::RenderFailed(SessionState::Rendering), details: None },
        StatusCode::INTERNAL_SERVER_ERROR,
        "render_failure"
    )]
    fn status_and_kind(#[case] error: ApiError, #[case] status: StatusCode, #[case] kind: &str) {
        assert_eq!(error.status(), status);
        assert_eq!(error.kind(), kind);
    }

    #[test]
    fn details_only_in_development() {
        let err = || -> RenderError { exn::Exn::new(RenderErrorKind::LaunchFailed) };
        assert!(matches!(ApiError::render(err(), Environment::Production), ApiError::Render { details: None, .. }));
        assert!(matches!(ApiError::render(err(), Environment::Development), ApiError::Render { details: Some(_), .. }));
    }

    #[test]
    fn missing_input_from_pipeline() {
        let err: RenderError = exn::Exn::new(RenderErrorKind::MissingInput);
        assert!(matches!(ApiError::render(err, Environment::Development), ApiError::MissingInput));
    }
}
