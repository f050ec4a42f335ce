//! HTTP API Types

use crate::auth::UserId;
use crate::error::AuthError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// API response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            code: None,
            timestamp: Utc::now(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            code: None,
            timestamp: Utc::now(),
        }
    }

    pub fn error_with_code(message: String, code: &str) -> Self {
        Self {
            code: Some(code.to_string()),
            ..Self::error(message)
        }
    }
}

/// Credential payload for `/register` and `/login`
///
/// Fields are optional so a missing one is reported as a validation error
/// rather than a deserialization failure.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct CredentialsRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// `/logout` response
#[derive(Debug, Serialize, Deserialize)]
pub struct LogoutResponse {
    pub had_session: bool,
    pub username: Option<String>,
    pub logged_out_at: DateTime<Utc>,
    pub message: String,
}

/// `/tasks` response for an authenticated caller
#[derive(Debug, Serialize, Deserialize)]
pub struct TasksResponse {
    pub user_id: UserId,
    pub username: String,
    pub message: String,
    pub session_started: DateTime<Utc>,
    pub task_count: u64,
}

/// `/status` response
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    pub database: String,
    pub registered_user_count: u64,
    pub task_count: u64,
    pub active_sessions: usize,
    pub uptime_seconds: u64,
    pub version: String,
    pub timestamp: DateTime<Utc>,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

/// One entry of the service banner
#[derive(Debug, Serialize, Deserialize)]
pub struct EndpointInfo {
    pub method: String,
    pub path: String,
    pub description: String,
    pub requires_session: bool,
}

/// `/` response
#[derive(Debug, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub name: String,
    pub version: String,
    pub endpoints: Vec<EndpointInfo>,
}

/// Error rendered as an `ApiResponse` with a matching status code
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub code: &'static str,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>, code: &'static str) -> Self {
        Self {
            status,
            message: message.into(),
            code,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message, "validation_error")
    }

    /// Map a core error to its HTTP form
    ///
    /// With `conceal_unknown_users` an unknown username looks exactly like a
    /// wrong password.
    pub fn from_auth(err: AuthError, conceal_unknown_users: bool) -> Self {
        let status = match &err {
            AuthError::Validation(_) => StatusCode::BAD_REQUEST,
            AuthError::DuplicateUsername => StatusCode::CONFLICT,
            AuthError::UserNotFound if conceal_unknown_users => StatusCode::UNAUTHORIZED,
            AuthError::UserNotFound => StatusCode::NOT_FOUND,
            AuthError::InvalidCredentials
            | AuthError::InvalidSession
            | AuthError::Unauthorized => StatusCode::UNAUTHORIZED,
            AuthError::Storage(_) | AuthError::Hashing(_) | AuthError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        if conceal_unknown_users && matches!(err, AuthError::UserNotFound) {
            let concealed = AuthError::InvalidCredentials;
            return Self::new(status, concealed.to_string(), concealed.code());
        }

        // Internal details stay in the logs.
        let message = if err.is_client_error() {
            err.to_string()
        } else {
            tracing::error!("Request failed: {}", err);
            "Internal server error".to_string()
        };
        Self::new(status, message, err.code())
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        Self::from_auth(err, false)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiResponse::<()>::error_with_code(self.message, self.code);
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageError;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::from(AuthError::Validation("x".into())).status,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::from(AuthError::DuplicateUsername).status, StatusCode::CONFLICT);
        assert_eq!(ApiError::from(AuthError::UserNotFound).status, StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::from(AuthError::InvalidCredentials).status,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ApiError::from(AuthError::Unauthorized).status, StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_concealed_unknown_user() {
        let concealed = ApiError::from_auth(AuthError::UserNotFound, true);
        let wrong_password = ApiError::from_auth(AuthError::InvalidCredentials, true);
        assert_eq!(concealed.status, wrong_password.status);
        assert_eq!(concealed.message, wrong_password.message);
        assert_eq!(concealed.code, wrong_password.code);
    }

    #[test]
    fn test_storage_details_are_hidden() {
        let err = ApiError::from(AuthError::Storage(StorageError::Corrupt(
            "users row 7".to_string(),
        )));
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.message.contains("users row"));
    }
}
