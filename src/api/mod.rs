//! HTTP API Module
//!
//! REST boundary over the auth service: registration, login, logout and the
//! session-protected task area.

pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod types;

pub use handlers::AppState;
pub use routes::AuthApi;
pub use server::ApiServer;
pub use types::*;
