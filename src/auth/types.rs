//! Authentication Types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identity assigned to a user at registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Registered user record
#[derive(Clone)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub password_digest: String,
    pub created_at: DateTime<Utc>,
}

// The digest stays out of Debug output so it can never reach a log line.
impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("password_digest", &"<redacted>")
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Live session bound to a user
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: UserId,
    /// Username at login time, so closing the session needs no store lookup
    pub username: String,
    pub created_at: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

impl Session {
    pub fn new(user_id: UserId, username: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            username: username.into(),
            created_at: now,
            last_seen: now,
        }
    }

    /// Update the last activity timestamp
    pub fn touch(&mut self) {
        self.last_seen = Utc::now();
    }

    /// Check whether the session has been idle longer than `timeout`
    pub fn is_idle(&self, timeout: chrono::Duration, now: DateTime<Utc>) -> bool {
        now - self.last_seen > timeout
    }
}

/// Outcome of a successful registration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registration {
    pub user_id: UserId,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

/// Outcome of a successful login
#[derive(Clone, Serialize, Deserialize)]
pub struct LoginGrant {
    pub token: String,
    pub username: String,
    pub user_id: UserId,
    pub authenticated_at: DateTime<Utc>,
}

impl fmt::Debug for LoginGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginGrant")
            .field("token", &"<redacted>")
            .field("username", &self.username)
            .field("user_id", &self.user_id)
            .field("authenticated_at", &self.authenticated_at)
            .finish()
    }
}

/// Outcome of a successful logout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Logout {
    pub username: String,
    pub logged_out_at: DateTime<Utc>,
}

/// Counts reported by the status query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    pub registered_user_count: u64,
    pub task_count: u64,
}
