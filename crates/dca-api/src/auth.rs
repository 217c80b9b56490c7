//! # Authentication Middleware
//!
//! Identity issuance is external. Callers present
//!
//! ```text
//! Authorization: Bearer {role}:{user_id}:{secret}
//! ```
//!
//! The secret is compared in constant time against `AUTH_TOKEN`. The
//! role and user id become a [`Principal`] whose `is_active` flag comes
//! from the stored profile, so a deactivated or unknown user is refused
//! by every engine operation even with a valid secret.
//!
//! Without `AUTH_TOKEN` the server runs in development mode: the
//! `{role}:{user_id}` part is still required, the secret is not checked.

use axum::extract::{Request, State};
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use dca_core::{Principal, Role, UserId};
use subtle::ConstantTimeEq;

use crate::error::{AppError, ErrorBody, ErrorDetail};
use crate::state::AppState;

/// Role and user named by a bearer token, before profile lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallerIdentity {
    pub role: Role,
    pub user_id: UserId,
}

/// The resolved caller, extracted in handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller(pub Principal);

impl<S: Send + Sync> axum::extract::FromRequestParts<S> for Caller {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .copied()
            .map(Caller)
            .ok_or_else(|| AppError::Unauthorized("no caller identity in request context".into()))
    }
}

// ── Token Validation ────────────────────────────────────────────────

/// Constant-time comparison. Lengths that differ still run a comparison.
fn constant_time_token_eq(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();
    if provided.len() != expected.len() {
        let _ = expected.ct_eq(expected);
        return false;
    }
    provided.ct_eq(expected).into()
}

/// Parse `{role}:{user_id}:{secret}`.
///
/// With `expected_secret = None` the secret segment may be omitted.
pub fn parse_bearer_token(
    provided: &str,
    expected_secret: Option<&str>,
) -> Result<CallerIdentity, String> {
    let parts: Vec<&str> = provided.splitn(3, ':').collect();
    let (role_str, user_str) = match (parts.as_slice(), expected_secret) {
        ([role, user, secret], Some(expected)) => {
            if !constant_time_token_eq(secret, expected) {
                return Err("invalid bearer token".into());
            }
            (*role, *user)
        }
        ([role, user, _], None) | ([role, user], None) => (*role, *user),
        _ => return Err("invalid token format, expected {role}:{user_id}:{secret}".into()),
    };

    let role = role_str.parse::<Role>().map_err(|e| e.to_string())?;
    let user_id = user_str
        .parse::<UserId>()
        .map_err(|e| format!("invalid user_id: {e}"))?;
    Ok(CallerIdentity { role, user_id })
}

// ── Middleware ──────────────────────────────────────────────────────

/// Validate the bearer token and inject the caller's [`Principal`].
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let provided = match auth_header {
        Some(value) if value.starts_with("Bearer ") => &value[7..],
        Some(_) => {
            tracing::warn!("authentication failed: non-Bearer authorization scheme");
            return unauthorized_response("authorization header must use Bearer scheme");
        }
        None => {
            tracing::warn!("authentication failed: missing authorization header");
            return unauthorized_response("missing authorization header");
        }
    };

    let identity = match parse_bearer_token(provided, state.config.auth_token.as_deref()) {
        Ok(identity) => identity,
        Err(msg) => {
            tracing::warn!(reason = %msg, "authentication failed: invalid bearer token");
            return unauthorized_response(&msg);
        }
    };

    match state.engine.principal_for(identity.user_id, identity.role) {
        Ok(principal) => {
            if !principal.is_active {
                tracing::debug!(user = %principal.id, role = %principal.role, "caller has no active profile");
            }
            request.extensions_mut().insert(principal);
            next.run(request).await
        }
        Err(e) => AppError::from(e).into_response(),
    }
}

fn unauthorized_response(message: &str) -> Response {
    let body = ErrorBody {
        error: ErrorDetail {
            code: "UNAUTHORIZED".to_string(),
            message: message.to_string(),
            details: None,
        },
    };
    (StatusCode::UNAUTHORIZED, Json(body)).into_response()
}
