//! Bearer-token authentication and role checks.

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};

use super::error::AppError;
use super::state::AppState;
use crate::auth::AuthUser;
use crate::services::ServiceError;

/// Token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Verify the bearer token and attach the caller to the request.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers())
        .ok_or_else(|| AppError(ServiceError::unauthorized("Authentication required")))?;
    let user = state.auth.authenticate(token)?;
    tracing::debug!(user = %user.username, "authenticated request");
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// Reject callers without the admin role. Must run after [`require_auth`].
pub async fn require_admin(
    user: AuthUser,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if !user.is_admin() {
        tracing::info!(user = %user.username, path = %request.uri().path(), "admin route refused");
        return Err(AppError(ServiceError::forbidden(
            "Administrator rights are required",
        )));
    }
    Ok(next.run(request).await)
}
