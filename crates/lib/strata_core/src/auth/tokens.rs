//! Token service: signed, expiring access and refresh tokens (HS256).
//!
//! The two token classes are signed with distinct secrets, so a token of one
//! class never verifies as the other. Verification failures are uniform:
//! callers see `None` whether the token is expired, malformed, or forged.

use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};

use super::AuthError;
use crate::models::auth::{AccessClaims, RefreshClaims, User};

/// Access token lifetime: 15 minutes.
pub const ACCESS_TOKEN_EXPIRY_SECS: i64 = 15 * 60;

/// Refresh token lifetime: 7 days (matches the refresh cookie max-age).
pub const REFRESH_TOKEN_EXPIRY_DAYS: i64 = 7;

/// Generate a signed access token for a user (HS256, 15 min expiry).
pub fn issue_access_token(user: &User, secret: &[u8]) -> Result<String, AuthError> {
    let now = Utc::now();
    let claims = AccessClaims {
        sub: user.id.clone(),
        email: user.email.clone(),
        role: user.role,
        exp: (now + Duration::seconds(ACCESS_TOKEN_EXPIRY_SECS)).timestamp(),
        iat: now.timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret),
    )
    .map_err(|e| AuthError::TokenError(format!("jwt encode: {e}")))
}

/// Verify an access token, returning the claims on success.
pub fn verify_access_token(token: &str, secret: &[u8]) -> Option<AccessClaims> {
    let key = DecodingKey::from_secret(secret);
    let mut validation = Validation::default();
    validation.validate_exp = true;
    decode::<AccessClaims>(token, &key, &validation)
        .ok()
        .map(|data| data.claims)
}

/// Generate a signed refresh token bound to a family (HS256, 7 day expiry).
pub fn issue_refresh_token(user_id: &str, family: &str, secret: &[u8]) -> Result<String, AuthError> {
    let now = Utc::now();
    let claims = RefreshClaims {
        sub: user_id.to_string(),
        family: family.to_string(),
        exp: (now + Duration::days(REFRESH_TOKEN_EXPIRY_DAYS)).timestamp(),
        iat: now.timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret),
    )
    .map_err(|e| AuthError::TokenError(format!("jwt encode: {e}")))
}

/// Verify a refresh token, returning the claims on success.
pub fn verify_refresh_token(token: &str, secret: &[u8]) -> Option<RefreshClaims> {
    let key = DecodingKey::from_secret(secret);
    let mut validation = Validation::default();
    validation.validate_exp = true;
    decode::<RefreshClaims>(token, &key, &validation)
        .ok()
        .map(|data| data.claims)
}
