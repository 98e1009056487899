//! Auth configuration, validated once at startup.
//!
//! Misconfiguration is a boot-time failure, not a first-request failure:
//! a production environment with a missing, placeholder, or short secret
//! refuses to start. Development environments fall back to fixed well-known
//! secrets with a one-time warning.

use std::sync::Once;

use tracing::warn;

use super::AuthError;

/// Built-in development fallback for the access-token secret.
pub const DEV_ACCESS_TOKEN_SECRET: &str = "strata-dev-access-secret-change-in-production";

/// Built-in development fallback for the refresh-token secret.
pub const DEV_REFRESH_TOKEN_SECRET: &str = "strata-dev-refresh-secret-change-in-production";

/// Minimum length accepted for a production secret.
pub const MIN_SECRET_LEN: usize = 32;

static DEV_FALLBACK_WARNING: Once = Once::new();

/// Validated auth configuration.
///
/// Access and refresh tokens are signed with distinct secrets so that a
/// token of one class can never verify as the other. The API-key lookup
/// secret is independent of both and only gates whether key-based auth is
/// enabled at all in production.
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub access_token_secret: String,
    pub refresh_token_secret: String,
    /// Dedicated secret gating API-key auth in production; `None` or a
    /// too-short value disables the capability there.
    pub api_key_lookup_secret: Option<String>,
    pub production: bool,
}

impl AuthConfig {
    /// Reads configuration from environment variables.
    ///
    /// | Variable                | Production            | Development            |
    /// |-------------------------|-----------------------|------------------------|
    /// | `APP_ENV`               | `production` / `prod` | anything else          |
    /// | `ACCESS_TOKEN_SECRET`   | required, ≥ 32 chars  | fixed fallback if unset|
    /// | `REFRESH_TOKEN_SECRET`  | required, ≥ 32 chars  | fixed fallback if unset|
    /// | `API_KEY_LOOKUP_SECRET` | gates API-key auth    | optional               |
    pub fn from_env() -> Result<Self, AuthError> {
        let production = matches!(
            std::env::var("APP_ENV").as_deref(),
            Ok("production") | Ok("prod")
        );
        Self::from_vars(
            std::env::var("ACCESS_TOKEN_SECRET").ok(),
            std::env::var("REFRESH_TOKEN_SECRET").ok(),
            std::env::var("API_KEY_LOOKUP_SECRET").ok(),
            production,
        )
    }

    /// Validate raw secret values into a usable config.
    pub fn from_vars(
        access: Option<String>,
        refresh: Option<String>,
        api_key_lookup: Option<String>,
        production: bool,
    ) -> Result<Self, AuthError> {
        let access_token_secret = resolve_secret(
            "ACCESS_TOKEN_SECRET",
            access,
            DEV_ACCESS_TOKEN_SECRET,
            production,
        )?;
        let refresh_token_secret = resolve_secret(
            "REFRESH_TOKEN_SECRET",
            refresh,
            DEV_REFRESH_TOKEN_SECRET,
            production,
        )?;

        // Identical secrets would let refresh tokens verify as access tokens.
        if access_token_secret == refresh_token_secret {
            return Err(AuthError::ValidationError(
                "ACCESS_TOKEN_SECRET and REFRESH_TOKEN_SECRET must differ".into(),
            ));
        }

        let api_key_lookup_secret = api_key_lookup.filter(|s| !s.is_empty());
        if production
            && !api_key_lookup_secret
                .as_deref()
                .is_some_and(|s| s.len() >= MIN_SECRET_LEN)
        {
            warn!(
                "API_KEY_LOOKUP_SECRET missing or shorter than {MIN_SECRET_LEN} chars; \
                 API key authentication is disabled"
            );
        }

        Ok(Self {
            access_token_secret,
            refresh_token_secret,
            api_key_lookup_secret,
            production,
        })
    }

    /// Whether API-key authentication is enabled.
    ///
    /// Always on in development; in production only with an explicitly
    /// configured lookup secret of sufficient length.
    pub fn api_keys_enabled(&self) -> bool {
        if self.production {
            self.api_key_lookup_secret
                .as_deref()
                .is_some_and(|s| s.len() >= MIN_SECRET_LEN)
        } else {
            true
        }
    }
}

fn resolve_secret(
    name: &str,
    value: Option<String>,
    dev_fallback: &str,
    production: bool,
) -> Result<String, AuthError> {
    match value.filter(|s| !s.is_empty()) {
        Some(secret) => {
            if production && secret == dev_fallback {
                return Err(AuthError::ValidationError(format!(
                    "{name} is set to the development placeholder; configure a real secret"
                )));
            }
            if production && secret.len() < MIN_SECRET_LEN {
                return Err(AuthError::ValidationError(format!(
                    "{name} must be at least {MIN_SECRET_LEN} characters in production"
                )));
            }
            Ok(secret)
        }
        None if production => Err(AuthError::ValidationError(format!(
            "{name} must be set in production"
        ))),
        None => {
            DEV_FALLBACK_WARNING.call_once(|| {
                warn!(
                    "token secrets not configured; using built-in development fallbacks \
                     (set ACCESS_TOKEN_SECRET and REFRESH_TOKEN_SECRET)"
                );
            });
            Ok(dev_fallback.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn long_secret(tag: &str) -> String {
        format!("{tag}-{}", "s".repeat(MIN_SECRET_LEN))
    }

    #[test]
    fn development_falls_back_when_unset() {
        let config = AuthConfig::from_vars(None, None, None, false).unwrap();
        assert_eq!(config.access_token_secret, DEV_ACCESS_TOKEN_SECRET);
        assert_eq!(config.refresh_token_secret, DEV_REFRESH_TOKEN_SECRET);
        assert!(config.api_keys_enabled());
    }

    #[test]
    fn production_rejects_missing_secret() {
        let err = AuthConfig::from_vars(None, Some(long_secret("r")), None, true);
        assert!(err.is_err());
    }

    #[test]
    fn production_rejects_placeholder_secret() {
        let err = AuthConfig::from_vars(
            Some(DEV_ACCESS_TOKEN_SECRET.into()),
            Some(long_secret("r")),
            None,
            true,
        );
        assert!(err.is_err());
    }

    #[test]
    fn production_rejects_short_secret() {
        let err = AuthConfig::from_vars(
            Some("short".into()),
            Some(long_secret("r")),
            None,
            true,
        );
        assert!(err.is_err());
    }

    #[test]
    fn identical_secrets_rejected() {
        let secret = long_secret("same");
        let err = AuthConfig::from_vars(Some(secret.clone()), Some(secret), None, false);
        assert!(err.is_err());
    }

    #[test]
    fn production_accepts_real_secrets() {
        let config = AuthConfig::from_vars(
            Some(long_secret("a")),
            Some(long_secret("r")),
            Some(long_secret("k")),
            true,
        )
        .unwrap();
        assert!(config.production);
        assert!(config.api_keys_enabled());
    }

    #[test]
    fn api_keys_disabled_in_production_without_lookup_secret() {
        let config = AuthConfig::from_vars(
            Some(long_secret("a")),
            Some(long_secret("r")),
            None,
            true,
        )
        .unwrap();
        assert!(!config.api_keys_enabled());

        let config = AuthConfig::from_vars(
            Some(long_secret("a")),
            Some(long_secret("r")),
            Some("short".into()),
            true,
        )
        .unwrap();
        assert!(!config.api_keys_enabled());
    }
}
