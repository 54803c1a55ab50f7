use axum::Json;
use axum::extract::{Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use subtle::ConstantTimeEq;

use crate::router::BudgetState;

fn key_matches(candidate: &str, expected: &str) -> bool {
    bool::from(candidate.as_bytes().ct_eq(expected.as_bytes()))
}

/// Ensure the inbound request carries the configured API key.
/// Accepts either:
/// - Header: `x-api-key: ...`
/// - Header: `Authorization: Bearer ...`
/// - Query string: `?key=...`
pub fn ensure_authorized(
    headers: &HeaderMap,
    query: Option<&str>,
    expected: &str,
) -> Result<(), Response> {
    // 1) header: x-api-key
    if let Some(hv) = headers.get("x-api-key").and_then(|v| v.to_str().ok())
        && key_matches(hv, expected)
    {
        return Ok(());
    }

    // 2) header: Authorization: Bearer <key>
    if let Some(auth) = headers.get("authorization").and_then(|v| v.to_str().ok()) {
        let auth = auth.trim();
        if let Some(token) = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            && key_matches(token, expected)
        {
            return Ok(());
        }
    }

    // 3) query: key=...
    if let Some(qs) = query {
        for (k, v) in url::form_urlencoded::parse(qs.as_bytes()) {
            if k == "key" && key_matches(&v, expected) {
                return Ok(());
            }
        }
    }

    Err((
        StatusCode::UNAUTHORIZED,
        Json(json!({"error": {"code": "UNAUTHORIZED", "message": "invalid or missing key"}})),
    )
        .into_response())
}

/// Route layer; a no-op when no key is configured.
pub async fn require_api_key(
    State(state): State<BudgetState>,
    req: Request,
    next: Next,
) -> Response {
    if let Some(expected) = state.api_key.as_deref()
        && let Err(rejection) = ensure_authorized(req.headers(), req.uri().query(), expected)
    {
        return rejection;
    }
    next.run(req).await
}
