//! Access Guard
//!
//! Runs a protected operation only after the caller's token resolves to a live
//! session. On failure the operation is never invoked.

use super::session::SessionManager;
use super::types::{Session, UserId};
use crate::error::{AuthError, AuthResult};
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

/// Session precondition for protected operations
#[derive(Clone)]
pub struct AccessGuard {
    sessions: Arc<SessionManager>,
}

impl AccessGuard {
    pub fn new(sessions: Arc<SessionManager>) -> Self {
        Self { sessions }
    }

    /// Resolve a token to its user, or `Unauthorized`
    pub fn check(&self, token: Option<&str>) -> AuthResult<UserId> {
        self.authorize(token).map(|session| session.user_id)
    }

    /// Resolve a token to a snapshot of its live session, or `Unauthorized`
    pub fn authorize(&self, token: Option<&str>) -> AuthResult<Session> {
        let token = token.filter(|t| !t.is_empty()).ok_or_else(|| {
            debug!("Protected access without a session token");
            AuthError::Unauthorized
        })?;

        self.sessions.validate(token).map_err(|_| {
            debug!("Protected access with an invalid session token");
            AuthError::Unauthorized
        })
    }

    /// Run `op` with the caller's user id when the token is valid
    pub fn run<T, F>(&self, token: Option<&str>, op: F) -> AuthResult<T>
    where
        F: FnOnce(UserId) -> T,
    {
        let user_id = self.check(token)?;
        Ok(op(user_id))
    }

    /// Async form of [`AccessGuard::run`]
    pub async fn run_async<T, F, Fut>(&self, token: Option<&str>, op: F) -> AuthResult<T>
    where
        F: FnOnce(UserId) -> Fut,
        Fut: Future<Output = T>,
    {
        let user_id = self.check(token)?;
        Ok(op(user_id).await)
    }
}
