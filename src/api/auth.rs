// =============================================================================
// Bearer Token Authentication
// =============================================================================
//
// Extracts and validates a Bearer token from the `Authorization` header
// against `AppState::api_token` (from `SMF_API_TOKEN` at startup). Comparison
// runs in constant time.
//
//   async fn handler(_auth: AuthBearer, ...) { ... }
//
// With no token configured every request passes. Otherwise a missing or wrong
// token short-circuits with 401 before the handler body runs.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::app_state::AppState;

// =============================================================================
// Token matching
// =============================================================================

/// `true` when `presented` equals `expected`. Every byte pair is visited even
/// after a mismatch; only the length comparison exits early.
fn token_matches(presented: &str, expected: &str) -> bool {
    presented.len() == expected.len()
        && presented
            .bytes()
            .zip(expected.bytes())
            .fold(0u8, |diff, (a, b)| diff | (a ^ b))
            == 0
}

/// Pull the token out of an `Authorization: Bearer <token>` value.
fn bearer_token(value: &str) -> Option<&str> {
    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

// =============================================================================
// Extractor
// =============================================================================

/// Marker extractor: its presence in a handler's arguments guards the route.
pub struct AuthBearer;

pub struct AuthRejection {
    message: &'static str,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": self.message,
            "code": "unauthorized",
        });
        (StatusCode::UNAUTHORIZED, axum::Json(body)).into_response()
    }
}

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for AuthBearer {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let Some(expected) = state.api_token.as_deref() else {
            return Ok(AuthBearer);
        };

        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(bearer_token);

        let Some(token) = token else {
            warn!(path = %parts.uri.path(), "missing or malformed Authorization header");
            return Err(AuthRejection {
                message: "missing or invalid authorization token",
            });
        };

        if !token_matches(token, expected) {
            warn!(path = %parts.uri.path(), "invalid API token presented");
            return Err(AuthRejection {
                message: "invalid authorization token",
            });
        }

        Ok(AuthBearer)
    }
}

// =============================================================================
// Tests
// =============================================================================
