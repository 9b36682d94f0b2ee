use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// ErrorBody
///
/// The single JSON shape written for every rejected request: `{"error": "<message>"}`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

/// AuthError
///
/// Every way the gateway chain can reject a request. The first stage that fails writes
/// its variant directly to the response; no later stage runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Authorization header not in request")]
    MissingHeader,
    #[error("Bearer not included in Authorization header")]
    MalformedHeader,
    #[error("Token is not valid")]
    InvalidToken,
    #[error("Unable to Verify JWT")]
    KeySetUnavailable,
    #[error("Unable to extract user ID")]
    IdentityUnavailable,
    #[error("User not authenticated")]
    NotAuthenticated,
    #[error("Invalid user id")]
    InvalidUserId,
    #[error("User not found")]
    UserNotFound,
    #[error("Insufficient permissions")]
    InsufficientPermissions,
    #[error("Unable to check permissions")]
    PermissionCheckFailed,
    #[error("Admin privileges required")]
    AdminRequired,
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::MissingHeader
            | AuthError::MalformedHeader
            | AuthError::InvalidToken
            | AuthError::KeySetUnavailable
            | AuthError::NotAuthenticated
            | AuthError::InvalidUserId
            | AuthError::UserNotFound => StatusCode::UNAUTHORIZED,
            AuthError::InsufficientPermissions | AuthError::AdminRequired => {
                StatusCode::FORBIDDEN
            }
            // A verified token without a readable subject, or an unreachable database,
            // is a server fault rather than the caller's.
            AuthError::IdentityUnavailable | AuthError::PermissionCheckFailed => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

/// ApiError
///
/// Failures of the administrative handlers (roles, permissions, role assignment).
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("Resource not found")]
    NotFound,
    #[error("{0}")]
    Conflict(String),
    #[error("Database error")]
    Internal,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<crate::repository::RepositoryError> for ApiError {
    fn from(err: crate::repository::RepositoryError) -> Self {
        match err {
            crate::repository::RepositoryError::Conflict(message) => ApiError::Conflict(message),
            crate::repository::RepositoryError::Database(e) => {
                tracing::error!(error = ?e, "repository failure");
                ApiError::Internal
            }
            crate::repository::RepositoryError::Unavailable => {
                tracing::error!("repository unavailable");
                ApiError::Internal
            }
        }
    }
}
