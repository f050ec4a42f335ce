//! Error Types
//!
//! Typed failures returned by the authentication core. Infrastructure code
//! (configuration, server startup) uses `anyhow` through [`crate::Result`].

use thiserror::Error;

/// Persistence-layer fault
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

/// Failures of the account and session operations
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Username is already taken")]
    DuplicateUsername,

    #[error("User not found")]
    UserNotFound,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid session")]
    InvalidSession,

    #[error("Unauthorized - a valid session is required")]
    Unauthorized,

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Short machine-readable code for the error kind
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::Validation(_) => "validation_error",
            AuthError::DuplicateUsername => "duplicate_username",
            AuthError::UserNotFound => "user_not_found",
            AuthError::InvalidCredentials => "invalid_credentials",
            AuthError::InvalidSession => "invalid_session",
            AuthError::Unauthorized => "unauthorized",
            AuthError::Storage(_) => "storage_error",
            AuthError::Hashing(_) | AuthError::Internal(_) => "internal_error",
        }
    }

    /// Whether the caller can recover by changing its input
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            AuthError::Storage(_) | AuthError::Hashing(_) | AuthError::Internal(_)
        )
    }
}

/// Result type for the authentication core
pub type AuthResult<T> = std::result::Result<T, AuthError>;
