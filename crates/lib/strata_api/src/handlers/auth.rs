//! Authentication request handlers.
//!
//! The refresh token travels in an httpOnly cookie for browsers; non-browser
//! clients may send it in the JSON body instead, so refresh/logout read the
//! body leniently rather than requiring one.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum_extra::extract::cookie::CookieJar;

use crate::AppState;
use crate::error::{AppError, AppResult, GENERIC_CREDENTIAL_MESSAGE};
use crate::models::{
    LoginRequest, LogoutResponse, RefreshRequest, RegisterRequest, SuccessBody, TokenResponse,
};
use crate::services::{auth, cookies};

/// Client IP as reported by a fronting proxy.
fn forwarded_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|ip| ip.trim().to_string())
        .filter(|ip| !ip.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Refresh token from the cookie, falling back to the request body.
fn presented_refresh_token(jar: &CookieJar, body: &Bytes) -> Option<String> {
    jar.get(cookies::REFRESH_COOKIE)
        .map(|c| c.value().to_string())
        .or_else(|| {
            serde_json::from_slice::<RefreshRequest>(body)
                .ok()
                .and_then(|r| r.refresh_token)
        })
}

/// `POST /api/auth/login` — authenticate with email + password.
pub async fn login_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
    Json(body): Json<LoginRequest>,
) -> AppResult<(CookieJar, Json<SuccessBody<TokenResponse>>)> {
    let client_ip = forwarded_ip(&headers);
    let resp = auth::login(&state, &body.email, &body.password, &client_ip).await?;
    let jar = jar.add(cookies::refresh_cookie(
        &resp.refresh_token,
        state.config.auth.production,
    ));
    Ok((jar, Json(SuccessBody::new(resp))))
}

/// `POST /api/auth/register` — create a new user account.
pub async fn register_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<RegisterRequest>,
) -> AppResult<(CookieJar, Json<SuccessBody<TokenResponse>>)> {
    let resp = auth::register(&state, &body.email, &body.password, body.name.as_deref()).await?;
    let jar = jar.add(cookies::refresh_cookie(
        &resp.refresh_token,
        state.config.auth.production,
    ));
    Ok((jar, Json(SuccessBody::new(resp))))
}

/// `POST /api/auth/refresh` — exchange a refresh token for a new pair.
pub async fn refresh_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Bytes,
) -> AppResult<(CookieJar, Json<SuccessBody<TokenResponse>>)> {
    let token = presented_refresh_token(&jar, &body)
        .ok_or_else(|| AppError::Unauthorized(GENERIC_CREDENTIAL_MESSAGE.into()))?;
    let resp = auth::refresh(&state, &token).await?;
    let jar = jar.add(cookies::refresh_cookie(
        &resp.refresh_token,
        state.config.auth.production,
    ));
    Ok((jar, Json(SuccessBody::new(resp))))
}

/// `POST /api/auth/logout` — best-effort family revocation; always succeeds.
pub async fn logout_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Bytes,
) -> (CookieJar, Json<SuccessBody<LogoutResponse>>) {
    let token = presented_refresh_token(&jar, &body);
    let resp = auth::logout(&state, token.as_deref()).await;
    let jar = jar.add(cookies::clear_refresh_cookie(state.config.auth.production));
    (jar, Json(SuccessBody::new(resp)))
}
