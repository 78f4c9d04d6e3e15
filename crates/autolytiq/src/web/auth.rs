use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::warn;

/// Shared secret for admin routes. With no token configured every admin
/// request is refused.
#[derive(Debug, Clone, Default)]
pub struct AdminToken(Option<Arc<str>>);

impl AdminToken {
    pub fn new(token: Option<String>) -> Self {
        Self(token.filter(|token| !token.is_empty()).map(Arc::from))
    }

    pub fn is_configured(&self) -> bool {
        self.0.is_some()
    }

    fn matches(&self, presented: &str) -> bool {
        match &self.0 {
            Some(expected) => constant_time_eq(expected.as_bytes(), presented.as_bytes()),
            None => false,
        }
    }
}

fn constant_time_eq(left: &[u8], right: &[u8]) -> bool {
    if left.len() != right.len() {
        return false;
    }
    left.iter()
        .zip(right)
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
}

/// Rejects requests whose `Authorization: Bearer` header does not carry the admin token.
pub async fn require_admin_token(
    State(token): State<AdminToken>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Response {
    if !token.is_configured() {
        warn!("admin request refused; no admin token configured");
        let body = json!({ "error": "admin access disabled" });
        return (StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response();
    }

    match bearer_token(&headers) {
        Some(presented) if token.matches(presented) => next.run(request).await,
        _ => {
            let body = json!({ "error": "unauthorized" });
            (
                StatusCode::UNAUTHORIZED,
                [(header::WWW_AUTHENTICATE, "Bearer")],
                Json(body),
            )
                .into_response()
        }
    }
}
