//! Route handlers.

use crate::error::ApiError;
use crate::response::PdfResponse;
use crate::state::AppState;
use axum::Json;
use axum::body::Bytes;
use axum::extract::{Form, FromRequest, Request, State};
use axum::http::{StatusCode, header};
use serde::Deserialize;
use serde_json::{Value, json};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Paths that accept conversion requests.
pub const CONVERT_PATHS: [&str; 2] = ["/convert", "/convert-html-to-pdf"];

/// A conversion request body, either JSON or form-encoded.
#[derive(Debug, Default, Deserialize)]
pub struct ConvertRequest {
    #[serde(default)]
    pub html: Option<String>,
}

impl<S: Send + Sync> FromRequest<S> for ConvertRequest {
    type Rejection = ApiError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = request
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("application/x-www-form-urlencoded"));
        if is_form {
            let Form(body) = Form::<ConvertRequest>::from_request(request, state)
                .await
                .map_err(|rejection| body_rejection(rejection.status()))?;
            return Ok(body);
        }
        let bytes =
            Bytes::from_request(request, state).await.map_err(|rejection| body_rejection(rejection.status()))?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(&bytes).map_err(|err| {
            tracing::debug!(error = %err, "Unreadable conversion request");
            ApiError::InvalidBody
        })
    }
}

fn body_rejection(status: StatusCode) -> ApiError {
    match status {
        StatusCode::PAYLOAD_TOO_LARGE => ApiError::PayloadTooLarge,
        _ => ApiError::InvalidBody,
    }
}

#[tracing::instrument(skip_all, fields(bytes))]
pub async fn convert(State(state): State<AppState>, request: ConvertRequest) -> Result<PdfResponse, ApiError> {
    let Some(html) = request.html.filter(|html| !html.is_empty()) else {
        return Err(ApiError::MissingInput);
    };
    tracing::Span::current().record("bytes", html.len());
    let pdf = state.renderer().convert(&html).await.map_err(|err| ApiError::render(err, state.environment()))?;
    Ok(PdfResponse::new(pdf, state.filename()))
}

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "status": "ok",
        "auth": state.api_key().is_some(),
        "readiness": state.renderer().readiness().to_string(),
        "endpoints": {
            "health": "GET /",
            "convert": CONVERT_PATHS.iter().map(|path| format!("POST {path}")).collect::<Vec<_>>(),
            "test_auth": "GET /test-auth",
        },
    }))
}

/// Lets clients check their credentials without rendering anything.
pub async fn test_auth() -> Json<Value> {
    let timestamp = OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default();
    Json(json!({ "message": "Authentication successful", "timestamp": timestamp }))
}

pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}
