//! Application error types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::models::{ErrorBody, ErrorDetail};
use strata_core::auth::AuthError;

/// Convenience alias for handler return types.
pub type AppResult<T> = Result<T, AppError>;

/// The one message every credential rejection carries.
///
/// Wrong password, unknown account, reused refresh token, and wrong API key
/// are indistinguishable to the caller; the specific reason stays in logs.
pub const GENERIC_CREDENTIAL_MESSAGE: &str = "Invalid credentials";

/// Application-level errors with HTTP status mapping.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Too many requests: {0}")]
    TooManyRequests(String),

    #[error("Internal server error")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Validation(m) => (StatusCode::BAD_REQUEST, "validation_error", m.as_str()),
            AppError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, "unauthorized", m.as_str()),
            AppError::Forbidden(m) => (StatusCode::FORBIDDEN, "forbidden", m.as_str()),
            AppError::NotFound(m) => (StatusCode::NOT_FOUND, "not_found", m.as_str()),
            AppError::TooManyRequests(m) => {
                (StatusCode::TOO_MANY_REQUESTS, "too_many_requests", m.as_str())
            }
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "Internal server error",
            ),
        };
        let body = Json(ErrorBody {
            success: false,
            error: ErrorDetail {
                code: code.to_string(),
                message: message.to_string(),
            },
        });
        (status, body).into_response()
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::CredentialError
            | AuthError::InvalidRefreshToken
            | AuthError::ReuseDetected
            | AuthError::UserNotFound
            | AuthError::TokenError(_) => {
                AppError::Unauthorized(GENERIC_CREDENTIAL_MESSAGE.into())
            }
            AuthError::Suspended => AppError::Forbidden("Account suspended".into()),
            AuthError::RateLimited => {
                AppError::TooManyRequests("Too many attempts, try again later".into())
            }
            AuthError::ValidationError(m) => AppError::Validation(m),
            AuthError::DbError(e) => AppError::Internal(e.to_string()),
            AuthError::Internal(m) => AppError::Internal(m),
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => AppError::NotFound("row not found".into()),
            _ => AppError::Internal(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn credential_rejections_collapse_to_one_message() {
        for err in [
            AuthError::CredentialError,
            AuthError::InvalidRefreshToken,
            AuthError::ReuseDetected,
            AuthError::UserNotFound,
        ] {
            let app_err = AppError::from(err);
            match app_err {
                AppError::Unauthorized(m) => assert_eq!(m, GENERIC_CREDENTIAL_MESSAGE),
                other => panic!("expected Unauthorized, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn internal_errors_never_leak_details() {
        let response = AppError::Internal("pg password in here".into()).into_response();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"]["code"], "internal_error");
        assert_eq!(json["error"]["message"], "Internal server error");
    }

    #[tokio::test]
    async fn envelope_shape_is_uniform() {
        let response = AppError::Forbidden("Admin access required".into()).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"]["code"], "forbidden");
    }
}
