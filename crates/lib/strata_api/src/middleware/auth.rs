//! Authentication middleware — the gate every protected request passes.
//!
//! Bearer credentials are sniffed by shape: the literal `sk_live_` prefix
//! selects the API-key path, anything else is treated as a JWT. On the JWT
//! path the *current* account state is consulted through the status cache:
//! the role used for authorization is the stored one, so a demotion or
//! suspension takes effect within one cache TTL without re-login. When that
//! check cannot be performed the gate fails open and trusts the token —
//! availability over strict freshness.

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};

use crate::AppState;
use crate::error::{AppError, GENERIC_CREDENTIAL_MESSAGE};
use strata_core::auth::api_keys::looks_like_api_key;
use strata_core::auth::status_cache::StatusLookup;
use strata_core::auth::tokens::verify_access_token;
use strata_core::models::auth::{Principal, Role};

/// A bearer credential, classified by shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    Jwt(String),
    ApiKey(String),
}

impl Credential {
    /// Classify a bearer value. API keys carry a fixed literal prefix; no
    /// other credential can legally start with it.
    pub fn parse(bearer: &str) -> Self {
        if looks_like_api_key(bearer) {
            Credential::ApiKey(bearer.to_string())
        } else {
            Credential::Jwt(bearer.to_string())
        }
    }
}

/// Key used to store the resolved [`Principal`] in request extensions.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Principal);

/// Best-effort client IP: `X-Forwarded-For` first, then the socket peer.
pub fn client_ip(request: &Request) -> String {
    request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|ip| ip.trim().to_string())
        .filter(|ip| !ip.is_empty())
        .or_else(|| {
            request
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ci| ci.0.ip().to_string())
        })
        .unwrap_or_else(|| "unknown".to_string())
}

/// Axum middleware: authenticates the request and injects [`CurrentUser`].
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing authorization header".into()))?;

    let bearer = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Unauthorized("Invalid authorization scheme".into()))?;

    let principal = match Credential::parse(bearer) {
        Credential::ApiKey(key) => {
            let ip = client_ip(&request);
            let auth = state
                .api_keys
                .authenticate(state.store.as_ref(), &key, &ip)
                .await?;
            Principal {
                user_id: auth.user.id,
                email: auth.user.email,
                role: auth.user.role,
                scopes: Some(auth.permissions),
            }
        }
        Credential::Jwt(token) => {
            let claims =
                verify_access_token(&token, state.config.auth.access_token_secret.as_bytes())
                    .ok_or_else(|| {
                        AppError::Unauthorized(GENERIC_CREDENTIAL_MESSAGE.into())
                    })?;

            match state
                .status_cache
                .lookup(state.store.as_ref(), &claims.sub)
                .await
            {
                StatusLookup::Found {
                    is_active: false, ..
                } => {
                    return Err(AppError::Forbidden("Account suspended".into()));
                }
                StatusLookup::Found { role, .. } => Principal {
                    user_id: claims.sub,
                    email: claims.email,
                    role,
                    scopes: None,
                },
                StatusLookup::NotFound => {
                    debug!(user_id = %claims.sub, "token subject no longer exists");
                    return Err(AppError::Unauthorized(GENERIC_CREDENTIAL_MESSAGE.into()));
                }
                StatusLookup::Unavailable => {
                    warn!(user_id = %claims.sub, "status check unavailable; trusting token role");
                    Principal {
                        user_id: claims.sub,
                        email: claims.email,
                        role: claims.role,
                        scopes: None,
                    }
                }
            }
        }
    };

    request.extensions_mut().insert(CurrentUser(principal));
    Ok(next.run(request).await)
}

/// Layered after [`require_auth`]: the resolved role must be admin.
pub async fn require_admin(request: Request, next: Next) -> Result<Response, AppError> {
    let principal = current_principal(&request)?;
    if principal.role != Role::Admin {
        return Err(AppError::Forbidden("Admin access required".into()));
    }
    Ok(next.run(request).await)
}

/// Layered after [`require_auth`]: API-key principals need every required
/// scope (or the blanket `admin` permission); JWT principals bypass.
pub async fn require_scopes(
    required: &'static [&'static str],
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let principal = current_principal(&request)?;
    if let Some(scopes) = &principal.scopes {
        let has_admin = scopes.iter().any(|s| s == "admin");
        let satisfied =
            has_admin || required.iter().all(|r| scopes.iter().any(|s| s == r));
        if !satisfied {
            debug!(user_id = %principal.user_id, ?required, "scope check failed");
            return Err(AppError::Forbidden("Insufficient scope".into()));
        }
    }
    Ok(next.run(request).await)
}

fn current_principal(request: &Request) -> Result<Principal, AppError> {
    request
        .extensions()
        .get::<CurrentUser>()
        .map(|u| u.0.clone())
        .ok_or_else(|| AppError::Internal("auth middleware not applied".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_sniffing_dispatches_by_prefix() {
        assert_eq!(
            Credential::parse("sk_live_abc"),
            Credential::ApiKey("sk_live_abc".into())
        );
        assert_eq!(
            Credential::parse("eyJhbGciOi.payload.sig"),
            Credential::Jwt("eyJhbGciOi.payload.sig".into())
        );
    }
}
