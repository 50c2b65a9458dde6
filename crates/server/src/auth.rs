//! Optional API key authentication.
//!
//! When no key is configured every request passes. Otherwise the key may be
//! sent as `x-api-key`, `api-key`, or `Authorization: Bearer <key>`; any one
//! of them matching is enough.

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Request, State};
use axum::http::{HeaderMap, header};
use axum::middleware::Next;
use axum::response::Response;

const KEY_HEADERS: [&str; 2] = ["x-api-key", "api-key"];

/// Middleware guarding protected routes.
pub async fn require_api_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if let Some(expected) = state.api_key() {
        let presented = presented_keys(request.headers());
        if presented.is_empty() {
            tracing::debug!(path = %request.uri().path(), "Missing API key");
            return Err(ApiError::Unauthorized);
        }
        if !presented.iter().any(|key| keys_match(key.as_bytes(), expected.as_bytes())) {
            tracing::warn!(path = %request.uri().path(), "Rejected invalid API key");
            return Err(ApiError::Forbidden);
        }
    }
    Ok(next.run(request).await)
}

/// Every credential a request carries.
fn presented_keys(headers: &HeaderMap) -> Vec<&str> {
    let bearer = headers.get(header::AUTHORIZATION).and_then(|value| {
        let (scheme, token) = value.to_str().ok()?.split_once(' ')?;
        scheme.eq_ignore_ascii_case("bearer").then(|| token.trim())
    });
    KEY_HEADERS
        .iter()
        .filter_map(|name| headers.get(*name)?.to_str().ok())
        .chain(bearer)
        .collect()
}

/// Compare without short-circuiting on the first differing byte.
fn keys_match(presented: &[u8], expected: &[u8]) -> bool {
    if presented.len() != expected.len() {
        return false;
    }
    presented.iter().zip(expected).fold(0u8, |acc, (a, b)| acc | (a ^ b)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use rstest::rstest;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[rstest]
    #[case(&[("x-api-key", "secret")], &["secret"])]
    #[case(&[("api-key", "secret")], &["secret"])]
    #[case(&[("authorization", "Bearer secret")], &["secret"])]
    #[case(&[("authorization", "bearer  secret ")], &["secret"])]
    #[case(&[("authorization", "Basic c2VjcmV0")], &[])]
    #[case(&[("x-api-key", "first"), ("authorization", "Bearer second")], &["first", "second"])]
    #[case(&[], &[])]
    fn finds_presented_keys(#[case] pairs: &[(&'static str, &'static str)], #[case] expected: &[&str]) {
        assert_eq!(presented_keys(&headers(pairs)), expected);
    }

    #[rstest]
    #[case("secret", "secret", true)]
    #[case("secret", "secreT", false)]
    #[case("secret", "secret2", false)]
    #[case("", "secret", false)]
    fn compares_keys(#[case] presented: &str, #[case] expected: &str, #[case] matches: bool) {
        assert_eq!(keys_match(presented.as_bytes(), expected.as_bytes()), matches);
    }
}
