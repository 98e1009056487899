//! Authentication and authorization logic.
//!
//! Provides password hashing, token issuance/verification, refresh-token
//! rotation, API key verification, rate limiting, and the user-status cache.

pub mod api_keys;
pub mod config;
pub mod digest;
pub mod password;
pub mod rate_limit;
pub mod rotation;
pub mod status_cache;
pub mod store;
pub mod tokens;

use thiserror::Error;

/// Authentication errors.
///
/// Variants are deliberately more specific than what callers may expose:
/// the HTTP layer collapses every credential rejection into one generic
/// message, while the variant (and server-side logs) keeps the real reason.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    CredentialError,

    #[error("Invalid refresh token")]
    InvalidRefreshToken,

    #[error("Refresh token reuse detected")]
    ReuseDetected,

    #[error("User not found")]
    UserNotFound,

    #[error("Account suspended")]
    Suspended,

    #[error("Too many attempts")]
    RateLimited,

    #[error("Token error: {0}")]
    TokenError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DbError(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}
