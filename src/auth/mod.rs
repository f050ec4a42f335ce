//! Authentication Module
//!
//! Account registration, password login and session-gated access.
//!
//! - `PasswordHasher`: Argon2id digests with per-call salt and tunable cost
//! - `CredentialStore`: user table with an atomic uniqueness check
//! - `SessionManager`: opaque bearer tokens and the live session set
//! - `AccessGuard`: runs protected operations only for valid sessions
//! - `AuthService`: the register / login / logout / status workflows

pub mod guard;
pub mod hasher;
pub mod service;
pub mod session;
pub mod store;
pub mod types;

pub use guard::AccessGuard;
pub use hasher::PasswordHasher;
pub use service::AuthService;
pub use session::SessionManager;
pub use store::{CreateOutcome, CredentialStore, SqliteCredentialStore};
pub use types::{LoginGrant, Logout, Registration, Session, StatusReport, User, UserId};
