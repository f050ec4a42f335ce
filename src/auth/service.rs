//! Auth Service
//!
//! Orchestrates registration, login, logout and the status query over the
//! hasher, credential store and session manager. Hashing and storage calls run
//! on the blocking pool; neither holds a lock shared with the other.

use super::guard::AccessGuard;
use super::hasher::PasswordHasher;
use super::session::SessionManager;
use super::store::{CreateOutcome, CredentialStore};
use super::types::{LoginGrant, Logout, Registration, Session, StatusReport, UserId};
use crate::config::PolicyConfig;
use crate::error::{AuthError, AuthResult};
use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Account and session workflows
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn CredentialStore>,
    hasher: PasswordHasher,
    sessions: Arc<SessionManager>,
    guard: AccessGuard,
    policy: PolicyConfig,
}

impl AuthService {
    /// Create a service over an existing store and session manager
    pub fn new(
        store: Arc<dyn CredentialStore>,
        hasher: PasswordHasher,
        sessions: Arc<SessionManager>,
        policy: PolicyConfig,
    ) -> Self {
        let guard = AccessGuard::new(Arc::clone(&sessions));
        Self {
            store,
            hasher,
            sessions,
            guard,
            policy,
        }
    }

    /// Register a new user
    pub async fn register(&self, username: &str, password: &str) -> AuthResult<Registration> {
        let username = username.trim().to_string();

        if username.chars().count() < self.policy.min_username_len {
            return Err(AuthError::Validation(format!(
                "Username must be at least {} characters",
                self.policy.min_username_len
            )));
        }

        if password.chars().count() < self.policy.min_password_len {
            return Err(AuthError::Validation(format!(
                "Password must be at least {} characters",
                self.policy.min_password_len
            )));
        }

        let hasher = self.hasher.clone();
        let password = password.to_string();
        let digest = blocking(move || hasher.hash(&password)).await?;

        let name = username.clone();
        let outcome = self.with_store(move |store| store.create(&name, &digest)).await?;

        match outcome {
            CreateOutcome::Created(user) => {
                info!(user_id = %user.id, username = %user.username, "User registered");
                Ok(Registration {
                    user_id: user.id,
                    username: user.username,
                    created_at: user.created_at,
                })
            }
            CreateOutcome::Duplicate => {
                debug!(username = %username, "Registration rejected: username taken");
                Err(AuthError::DuplicateUsername)
            }
        }
    }

    /// Verify credentials and open a session
    pub async fn login(&self, username: &str, password: &str) -> AuthResult<LoginGrant> {
        let username = username.trim().to_string();
        if username.is_empty() || password.is_empty() {
            return Err(AuthError::Validation(
                "Username and password are required".to_string(),
            ));
        }

        let name = username.clone();
        let found = self
            .with_store(move |store| store.find_by_username(&name))
            .await?;

        let hasher = self.hasher.clone();
        let password = password.to_string();

        // A miss still pays for one verification so it takes as long as a
        // wrong password.
        let Some(user) = found else {
            blocking(move || {
                hasher.verify_decoy(&password);
                Ok(())
            })
            .await?;
            debug!(username = %username, "Login failed: unknown user");
            return Err(AuthError::UserNotFound);
        };

        let digest = user.password_digest.clone();
        let verified = blocking(move || Ok(hasher.verify(&password, &digest))).await?;

        if !verified {
            warn!(user_id = %user.id, username = %user.username, "Login failed: bad password");
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.sessions.create(user.id, &user.username);
        info!(user_id = %user.id, username = %user.username, "User logged in");

        Ok(LoginGrant {
            token,
            username: user.username,
            user_id: user.id,
            authenticated_at: Utc::now(),
        })
    }

    /// Close the session behind `token`
    pub async fn logout(&self, token: &str) -> AuthResult<Logout> {
        let session = self.sessions.invalidate(token)?;

        info!(user_id = %session.user_id, "User logged out");
        Ok(Logout {
            username: session.username,
            logged_out_at: Utc::now(),
        })
    }

    /// Resolve a token to its user, or `Unauthorized`
    pub fn check_session(&self, token: Option<&str>) -> AuthResult<UserId> {
        self.guard.check(token)
    }

    /// Resolve a token to a snapshot of its live session, or `Unauthorized`
    pub fn authorize(&self, token: Option<&str>) -> AuthResult<Session> {
        self.guard.authorize(token)
    }

    /// Run a protected operation for the token's user
    pub async fn protected<T, F, Fut>(&self, token: Option<&str>, op: F) -> AuthResult<T>
    where
        F: FnOnce(UserId) -> Fut,
        Fut: Future<Output = T>,
    {
        self.guard.run_async(token, op).await
    }

    /// Registered user and task counts
    pub async fn status(&self) -> AuthResult<StatusReport> {
        self.with_store(|store| {
            Ok(StatusReport {
                registered_user_count: store.count()?,
                task_count: store.task_count()?,
            })
        })
        .await
    }

    /// Number of live sessions
    pub fn active_sessions(&self) -> usize {
        self.sessions.active_count()
    }

    pub fn policy(&self) -> &PolicyConfig {
        &self.policy
    }

    async fn with_store<T, F>(&self, op: F) -> AuthResult<T>
    where
        F: FnOnce(&dyn CredentialStore) -> Result<T, crate::error::StorageError> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        blocking(move || op(store.as_ref()).map_err(AuthError::from)).await
    }
}

async fn blocking<T, F>(op: F) -> AuthResult<T>
where
    F: FnOnce() -> AuthResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(op)
        .await
        .map_err(|e| AuthError::Internal(format!("blocking task failed: {}", e)))?
}
