//! SessionGate Library
//!
//! Account registration, password login and bearer-session access control
//! backed by SQLite, with an axum HTTP front end.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod metrics;
pub mod shutdown;

pub use auth::AuthService;
pub use config::Config;
pub use error::{AuthError, AuthResult, StorageError};
pub use shutdown::ShutdownCoordinator;

/// Common error type for the binary and setup paths
pub type Result<T> = anyhow::Result<T>;
