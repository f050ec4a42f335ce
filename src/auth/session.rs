//! Session Manager
//!
//! Issues, validates and revokes opaque bearer tokens. Live sessions are keyed
//! by the SHA-256 of the token, so the map never holds a usable token.

use super::types::{Session, UserId};
use crate::error::{AuthError, AuthResult};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::Utc;
use parking_lot::Mutex;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

/// Token byte length before encoding (32 bytes = 43 base64 chars)
const TOKEN_BYTES: usize = 32;

type TokenKey = [u8; 32];

/// Owns the set of live sessions
pub struct SessionManager {
    sessions: Mutex<HashMap<TokenKey, Session>>,
    idle_timeout: Option<chrono::Duration>,
}

impl SessionManager {
    /// Create a session manager; `idle_timeout` of `None` means sessions live
    /// until logout
    pub fn new(idle_timeout: Option<Duration>) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            idle_timeout: idle_timeout.and_then(|d| chrono::Duration::from_std(d).ok()),
        }
    }

    /// Record a new session for `user_id` and return its token
    pub fn create(&self, user_id: UserId, username: &str) -> String {
        let mut sessions = self.sessions.lock();
        loop {
            let token = generate_token();
            let key = token_key(&token);
            if sessions.contains_key(&key) {
                continue;
            }
            sessions.insert(key, Session::new(user_id, username));
            debug!(user_id = %user_id, live = sessions.len(), "Session created");
            return token;
        }
    }

    /// Resolve a token to a snapshot of its session and refresh `last_seen`
    ///
    /// Every protected access passes through here, so this is also where idle
    /// sessions are expired.
    pub fn validate(&self, token: &str) -> AuthResult<Session> {
        let key = token_key(token);
        let now = Utc::now();
        let mut sessions = self.sessions.lock();

        match sessions.get_mut(&key) {
            None => return Err(AuthError::InvalidSession),
            Some(session) => {
                let idle = self
                    .idle_timeout
                    .map_or(false, |timeout| session.is_idle(timeout, now));
                if !idle {
                    session.last_seen = now;
                    return Ok(session.clone());
                }
            }
        }

        if let Some(session) = sessions.remove(&key) {
            debug!(user_id = %session.user_id, "Session expired after idle timeout");
        }
        Err(AuthError::InvalidSession)
    }

    /// Remove a session and return it; fails when the token is not live
    pub fn invalidate(&self, token: &str) -> AuthResult<Session> {
        let key = token_key(token);
        let mut sessions = self.sessions.lock();
        match sessions.remove(&key) {
            Some(session) => {
                debug!(user_id = %session.user_id, live = sessions.len(), "Session invalidated");
                Ok(session)
            }
            None => Err(AuthError::InvalidSession),
        }
    }

    /// Number of live sessions
    pub fn active_count(&self) -> usize {
        self.sessions.lock().len()
    }

    /// Drop sessions idle longer than the configured timeout
    pub fn purge_expired(&self) -> usize {
        let Some(timeout) = self.idle_timeout else {
            return 0;
        };
        let now = Utc::now();
        let mut sessions = self.sessions.lock();
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_idle(timeout, now));
        before - sessions.len()
    }

    /// Drop every live session
    pub fn clear(&self) -> usize {
        let mut sessions = self.sessions.lock();
        let count = sessions.len();
        sessions.clear();
        count
    }
}

fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

fn token_key(token: &str) -> TokenKey {
    Sha256::digest(token.as_bytes()).into()
}
