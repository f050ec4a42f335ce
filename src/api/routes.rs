//! HTTP API Routes

use super::{handlers::*, middleware::require_session};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Account and session API router
pub struct AuthApi;

impl AuthApi {
    /// Create the API router
    pub fn create_router(state: AppState) -> Router {
        // Public routes (no session required)
        let public_routes = Router::new()
            .route("/", get(index))
            .route("/health", get(health_check))
            .route("/register", post(register))
            .route("/login", post(login))
            .route("/logout", post(logout).get(logout))
            .route("/status", get(status))
            .route("/metrics", get(metrics));

        // Protected routes (live session required)
        let protected_routes = Router::new()
            .route("/tasks", get(tasks))
            .layer(middleware::from_fn_with_state(state.clone(), require_session));

        public_routes
            .merge(protected_routes)
            .with_state(state)
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AuthService, PasswordHasher, SessionManager, SqliteCredentialStore};
    use crate::config::{HashingConfig, PolicyConfig};
    use crate::metrics::Metrics;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use std::sync::Arc;
    use tower::ServiceExt;

    fn create_test_state() -> AppState {
        let hasher = PasswordHasher::new(&HashingConfig {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        })
        .unwrap();
        let auth = AuthService::new(
            Arc::new(SqliteCredentialStore::in_memory().unwrap()),
            hasher,
            Arc::new(SessionManager::new(None)),
            PolicyConfig::default(),
        );
        AppState::new(auth, Arc::new(Metrics::new().unwrap()), true)
    }

    #[tokio::test]
    async fn test_public_health_endpoint() {
        let app = AuthApi::create_router(create_test_state());

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_protected_endpoint_requires_session() {
        let state = create_test_state();
        let app = AuthApi::create_router(state.clone());

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/tasks").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/tasks")
                    .header(header::AUTHORIZATION, "Bearer not-a-real-token")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        assert_eq!(state.metrics.get_access_denied(), 2);
    }

    #[tokio::test]
    async fn test_metrics_disabled() {
        let mut state = create_test_state();
        state.metrics_enabled = false;
        let app = AuthApi::create_router(state);

        let response = app
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
