//! HTTP API Handlers

use super::middleware::{bearer_token, CurrentUser};
use super::types::*;
use crate::auth::AuthService;
use crate::error::AuthError;
use crate::metrics::Metrics;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Shared application state for handlers
#[derive(Clone)]
pub struct AppState {
    pub auth: AuthService,
    pub metrics: Arc<Metrics>,
    pub start_time: Instant,
    pub metrics_enabled: bool,
}

impl AppState {
    pub fn new(auth: AuthService, metrics: Arc<Metrics>, metrics_enabled: bool) -> Self {
        Self {
            auth,
            metrics,
            start_time: Instant::now(),
            metrics_enabled,
        }
    }

    fn api_error(&self, err: AuthError) -> ApiError {
        ApiError::from_auth(err, self.auth.policy().conceal_unknown_users)
    }
}

type ApiResult<T> = Result<(StatusCode, Json<ApiResponse<T>>), ApiError>;

fn credentials(
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<(String, String), ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        ApiError::bad_request(format!("Invalid request body: {}", rejection.body_text()))
    })?;

    match (request.username, request.password) {
        (Some(username), Some(password)) => Ok((username, password)),
        _ => Err(ApiError::bad_request(
            "Missing required fields: username and password",
        )),
    }
}

/// Service banner
pub async fn index() -> Json<ApiResponse<ServiceInfo>> {
    let endpoint = |method: &str, path: &str, description: &str, requires_session: bool| {
        EndpointInfo {
            method: method.to_string(),
            path: path.to_string(),
            description: description.to_string(),
            requires_session,
        }
    };

    Json(ApiResponse::success(ServiceInfo {
        name: "sessiongate".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        endpoints: vec![
            endpoint("POST", "/register", "Register a new user", false),
            endpoint("POST", "/login", "Log in and receive a session token", false),
            endpoint("GET", "/tasks", "Protected task area", true),
            endpoint("POST", "/logout", "Close the current session", false),
            endpoint("GET", "/status", "User and task counts", false),
            endpoint("GET", "/health", "Liveness check", false),
        ],
    }))
}

/// Health check handler
pub async fn health_check() -> Json<ApiResponse<HealthStatus>> {
    Json(ApiResponse::success(HealthStatus {
        status: "healthy".to_string(),
        timestamp: Utc::now(),
    }))
}

/// Register a new user
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> ApiResult<crate::auth::Registration> {
    let (username, password) = credentials(payload)?;

    let registration = state
        .auth
        .register(&username, &password)
        .await
        .map_err(|e| state.api_error(e))?;

    state.metrics.record_registration();
    Ok((StatusCode::CREATED, Json(ApiResponse::success(registration))))
}

/// Verify credentials and open a session
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> ApiResult<crate::auth::LoginGrant> {
    let (username, password) = credentials(payload)?;

    match state.auth.login(&username, &password).await {
        Ok(grant) => {
            state.metrics.record_login(true);
            Ok((StatusCode::OK, Json(ApiResponse::success(grant))))
        }
        Err(e) => {
            state.metrics.record_login(false);
            Err(state.api_error(e))
        }
    }
}

/// Close the caller's session
///
/// Logging out without a live session is not an error here: the response
/// reports `had_session: false`.
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<LogoutResponse> {
    let outcome = match bearer_token(&headers) {
        Some(token) => state.auth.logout(token).await,
        None => Err(AuthError::InvalidSession),
    };

    let response = match outcome {
        Ok(logout) => {
            state.metrics.record_logout();
            LogoutResponse {
                had_session: true,
                message: format!("Session closed for {}", logout.username),
                username: Some(logout.username),
                logged_out_at: logout.logged_out_at,
            }
        }
        Err(AuthError::InvalidSession) => LogoutResponse {
            had_session: false,
            username: None,
            logged_out_at: Utc::now(),
            message: "No active session".to_string(),
        },
        Err(e) => return Err(state.api_error(e)),
    };

    Ok((StatusCode::OK, Json(ApiResponse::success(response))))
}

/// Protected task area
pub async fn tasks(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> ApiResult<TasksResponse> {
    let status = state.auth.status().await.map_err(|e| state.api_error(e))?;

    info!(user_id = %current.user_id, "Task area accessed");

    Ok((
        StatusCode::OK,
        Json(ApiResponse::success(TasksResponse {
            user_id: current.user_id,
            message: format!("Welcome, {}!", current.username),
            username: current.username,
            session_started: current.session_started,
            task_count: status.task_count,
        })),
    ))
}

/// User and task counts
pub async fn status(State(state): State<AppState>) -> ApiResult<StatusResponse> {
    let report = state.auth.status().await.map_err(|e| state.api_error(e))?;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::success(StatusResponse {
            status: "OK".to_string(),
            database: "connected".to_string(),
            registered_user_count: report.registered_user_count,
            task_count: report.task_count,
            active_sessions: state.auth.active_sessions(),
            uptime_seconds: state.start_time.elapsed().as_secs(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: Utc::now(),
        })),
    ))
}

/// Prometheus exposition
pub async fn metrics(State(state): State<AppState>) -> Response {
    if !state.metrics_enabled {
        return ApiError::new(StatusCode::NOT_FOUND, "Metrics are disabled", "not_found")
            .into_response();
    }

    state.metrics.set_active_sessions(state.auth.active_sessions());
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.export_prometheus(),
    )
        .into_response()
}
