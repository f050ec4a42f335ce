//! Session Middleware
//!
//! HTTP form of the access guard: requests without a live session are
//! rejected before the handler runs.

use super::handlers::AppState;
use super::types::ApiError;
use crate::auth::UserId;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Utc};
use tracing::debug;

/// Caller identity attached to requests that passed the session check
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user_id: UserId,
    pub username: String,
    pub session_started: DateTime<Utc>,
}

/// Extract the token from an `Authorization: Bearer <token>` header
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Session-checking middleware function
pub async fn require_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let session = match state.auth.authorize(bearer_token(request.headers())) {
        Ok(session) => session,
        Err(e) => {
            state.metrics.record_access_denied();
            return Err(ApiError::from(e));
        }
    };

    debug!(user_id = %session.user_id, path = %request.uri().path(), "Session accepted");
    request.extensions_mut().insert(CurrentUser {
        user_id: session.user_id,
        username: session.username,
        session_started: session.created_at,
    });

    Ok(next.run(request).await)
}
