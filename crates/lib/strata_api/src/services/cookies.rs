//! Cookie service — the httpOnly refresh-token cookie.
//!
//! The refresh token only travels on the auth path prefix; every other
//! route sees just the access token in the Authorization header.

use axum_extra::extract::cookie::{Cookie, SameSite};
use time::Duration;

/// Cookie name for the refresh token.
pub const REFRESH_COOKIE: &str = "strata_refresh";

/// Path prefix the refresh cookie is scoped to.
pub const AUTH_COOKIE_PATH: &str = "/api/auth";

/// Refresh cookie lifetime: 7 days, matching the token expiry.
pub const REFRESH_COOKIE_MAX_AGE_DAYS: i64 = 7;

/// Build the httpOnly cookie carrying a refresh token.
pub fn refresh_cookie(token: &str, production: bool) -> Cookie<'static> {
    Cookie::build((REFRESH_COOKIE.to_string(), token.to_string()))
        .http_only(true)
        .secure(production)
        .same_site(SameSite::Strict)
        .path(AUTH_COOKIE_PATH.to_string())
        .max_age(Duration::days(REFRESH_COOKIE_MAX_AGE_DAYS))
        .build()
}

/// Build an expired cookie that clears the refresh token.
pub fn clear_refresh_cookie(production: bool) -> Cookie<'static> {
    Cookie::build((REFRESH_COOKIE.to_string(), String::new()))
        .http_only(true)
        .secure(production)
        .same_site(SameSite::Strict)
        .path(AUTH_COOKIE_PATH.to_string())
        .max_age(Duration::ZERO)
        .build()
}
