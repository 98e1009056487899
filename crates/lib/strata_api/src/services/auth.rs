//! Authentication service — login/register/logout flows over `strata_core`.

use tracing::{debug, info, warn};

use crate::AppState;
use crate::error::{AppError, AppResult, GENERIC_CREDENTIAL_MESSAGE};
use crate::models::{AuthUser, LogoutResponse, TokenResponse};
use strata_core::auth::rotation::{self, SessionTokens};
use strata_core::auth::tokens::ACCESS_TOKEN_EXPIRY_SECS;
use strata_core::auth::{AuthError, password};
use strata_core::models::auth::{Role, User};

/// Build a `TokenResponse` from user data plus a fresh token pair.
fn build_token_response(user: &User, pair: SessionTokens) -> TokenResponse {
    TokenResponse {
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
        token_type: "Bearer".to_string(),
        expires_in: ACCESS_TOKEN_EXPIRY_SECS,
        user: AuthUser::from(user),
    }
}

/// Authenticate with email + password, opening a fresh token family.
///
/// Attempts are rate limited per client IP; a successful login clears the
/// counter so a password-manager retry storm doesn't lock the account's IP.
pub async fn login(
    state: &AppState,
    email: &str,
    password_attempt: &str,
    client_ip: &str,
) -> AppResult<TokenResponse> {
    let limiter_key = format!("login:{client_ip}");
    if !state.limiter.allow(&limiter_key) {
        warn!(client_ip, "login attempt rate limited");
        return Err(AppError::from(AuthError::RateLimited));
    }

    let row = state.store.find_user_by_email(email).await?;
    let Some(row) = row else {
        debug!(email, "login: unknown email");
        return Err(AppError::Unauthorized(GENERIC_CREDENTIAL_MESSAGE.into()));
    };
    let Some(password_hash) = row.password_hash.as_deref() else {
        debug!(email, "login: account has no password credential");
        return Err(AppError::Unauthorized(GENERIC_CREDENTIAL_MESSAGE.into()));
    };

    if !password::verify_password(password_attempt, password_hash)? {
        debug!(email, "login: wrong password");
        return Err(AppError::Unauthorized(GENERIC_CREDENTIAL_MESSAGE.into()));
    }

    if !row.user.is_active {
        return Err(AppError::from(AuthError::Suspended));
    }

    state.limiter.reset(&limiter_key);

    let pair = rotation::start_family(state.store.as_ref(), &state.config.auth, &row.user).await?;
    Ok(build_token_response(&row.user, pair))
}

/// Register a new user account and log it in.
pub async fn register(
    state: &AppState,
    email: &str,
    password_raw: &str,
    name: Option<&str>,
) -> AppResult<TokenResponse> {
    if password_raw.len() < 8 {
        return Err(AppError::Validation(
            "Password must be at least 8 characters".into(),
        ));
    }
    if !email.contains('@') {
        return Err(AppError::Validation("Invalid email address".into()));
    }
    if state.store.email_exists(email).await? {
        return Err(AppError::Validation("Email already registered".into()));
    }

    let password_hash = password::hash_password(password_raw)?;
    let user = state
        .store
        .insert_user(email, name, &password_hash, Role::User)
        .await?;
    info!(user_id = %user.id, "user registered");

    let pair = rotation::start_family(state.store.as_ref(), &state.config.auth, &user).await?;
    Ok(build_token_response(&user, pair))
}

/// Exchange a refresh token for a new pair (single-use rotation).
///
/// Every rejection reason — expired, forged, reused, orphaned — collapses
/// into the same generic 401 on the way out (`From<AuthError>`).
pub async fn refresh(state: &AppState, refresh_token: &str) -> AppResult<TokenResponse> {
    let rotated =
        rotation::rotate(state.store.as_ref(), &state.config.auth, refresh_token).await?;
    Ok(build_token_response(
        &rotated.user,
        SessionTokens {
            access_token: rotated.access_token,
            refresh_token: rotated.refresh_token,
        },
    ))
}

/// Best-effort logout: revoke the presented token's whole family.
///
/// Always reports success — storage trouble or an invalid token must not
/// turn logout into a session-validity oracle.
pub async fn logout(state: &AppState, refresh_token: Option<&str>) -> LogoutResponse {
    if let Some(token) = refresh_token {
        match rotation::revoke_family(state.store.as_ref(), &state.config.auth, token).await {
            Ok(revoked) => debug!(revoked, "logout revoked family tokens"),
            Err(e) => warn!(error = %e, "logout revocation failed"),
        }
    }
    LogoutResponse { logged_out: true }
}
