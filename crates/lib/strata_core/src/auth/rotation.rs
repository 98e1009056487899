//! Refresh-token rotation with family-wide reuse detection.
//!
//! Every refresh token belongs to a family created at login/register and
//! preserved across rotations. Rotating with the current token revokes just
//! that token and issues a successor in the same family. Presenting a token
//! that matches no live record — a replayed, already-rotated token or a
//! forgery — revokes the entire family, forcing re-login. A stolen token
//! used after the legitimate client has rotated therefore kills the chain.

use chrono::{Duration, Utc};
use tracing::warn;

use super::config::AuthConfig;
use super::store::AuthStore;
use super::{AuthError, digest, tokens};
use crate::models::auth::{RefreshTokenRecord, User};
use crate::uuid::uuidv7;

/// A freshly issued access/refresh pair.
#[derive(Debug, Clone)]
pub struct SessionTokens {
    pub access_token: String,
    pub refresh_token: String,
}

/// Result of a successful rotation.
#[derive(Debug, Clone)]
pub struct RotatedTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub user: User,
}

/// Open a new login chain: fresh family, fresh token pair, digest persisted.
pub async fn start_family(
    store: &dyn AuthStore,
    config: &AuthConfig,
    user: &User,
) -> Result<SessionTokens, AuthError> {
    let family = uuidv7();
    issue_into_family(store, config, user, &family).await
}

async fn issue_into_family(
    store: &dyn AuthStore,
    config: &AuthConfig,
    user: &User,
    family: &str,
) -> Result<SessionTokens, AuthError> {
    let access_token = tokens::issue_access_token(user, config.access_token_secret.as_bytes())?;
    let refresh_token =
        tokens::issue_refresh_token(&user.id, family, config.refresh_token_secret.as_bytes())?;

    store
        .insert_refresh_token(RefreshTokenRecord {
            id: uuidv7(),
            user_id: user.id.clone(),
            family: family.to_string(),
            token_digest: digest::digest_secret(&refresh_token)?,
            expires_at: Utc::now() + Duration::days(tokens::REFRESH_TOKEN_EXPIRY_DAYS),
            revoked_at: None,
        })
        .await?;

    Ok(SessionTokens {
        access_token,
        refresh_token,
    })
}

/// Exchange a refresh token for a new pair, or kill its family.
///
/// Storage failures propagate; this path never fails open, since trusting an
/// unverifiable refresh claim would defeat reuse detection.
pub async fn rotate(
    store: &dyn AuthStore,
    config: &AuthConfig,
    candidate: &str,
) -> Result<RotatedTokens, AuthError> {
    // Signature/expiry check before any storage work.
    let claims = tokens::verify_refresh_token(candidate, config.refresh_token_secret.as_bytes())
        .ok_or(AuthError::InvalidRefreshToken)?;

    // Load every live record in the family and digest-compare the candidate
    // against each one. Digests are salted, so comparison goes through the
    // hasher's verify rather than a string compare.
    let records = store.family_refresh_tokens(&claims.family).await?;
    let mut matched: Option<&RefreshTokenRecord> = None;
    for record in &records {
        if digest::verify_secret(candidate, &record.token_digest)? && matched.is_none() {
            matched = Some(record);
        }
    }

    let current = match matched {
        // A record the rotation already consumed, or no record at all:
        // replay or forgery. Kill the whole family. Legitimate holders get
        // logged out too; that availability loss is the point.
        Some(record) if record.revoked_at.is_some() => None,
        None => None,
        Some(record) => Some(record),
    };
    let Some(current) = current else {
        let revoked = store.revoke_refresh_family(&claims.family).await?;
        warn!(
            family = %claims.family,
            user_id = %claims.sub,
            revoked,
            "refresh token reuse detected; family revoked"
        );
        return Err(AuthError::ReuseDetected);
    };

    // Consume the matched record before issuing anything.
    store.revoke_refresh_token(&current.id).await?;

    // An account deleted between issuance and refresh must not yield usable
    // credentials, even though the digest matched.
    let user = store
        .find_user_by_id(&claims.sub)
        .await?
        .ok_or(AuthError::UserNotFound)?;
    if !user.is_active {
        return Err(AuthError::Suspended);
    }

    let pair = issue_into_family(store, config, &user, &claims.family).await?;
    Ok(RotatedTokens {
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
        user,
    })
}

/// Best-effort family revocation for logout.
///
/// An invalid or unknown token reports `0` revoked rather than an error, so
/// logout cannot be used to probe session validity.
pub async fn revoke_family(
    store: &dyn AuthStore,
    config: &AuthConfig,
    candidate: &str,
) -> Result<u64, AuthError> {
    match tokens::verify_refresh_token(candidate, config.refresh_token_secret.as_bytes()) {
        Some(claims) => store.revoke_refresh_family(&claims.family).await,
        None => Ok(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::store::memory::MemoryStore;
    use crate::models::auth::Role;

    fn test_config() -> AuthConfig {
        AuthConfig::from_vars(None, None, None, false).unwrap()
    }

    async fn seeded_user(store: &MemoryStore) -> User {
        store
            .insert_user("ada@example.com", Some("Ada"), "hash", Role::User)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn rotation_succeeds_once_and_stays_in_family() {
        let store = MemoryStore::new();
        let config = test_config();
        let user = seeded_user(&store).await;

        let initial = start_family(&store, &config, &user).await.unwrap();
        let first = tokens::verify_refresh_token(
            &initial.refresh_token,
            config.refresh_token_secret.as_bytes(),
        )
        .unwrap();

        let rotated = rotate(&store, &config, &initial.refresh_token)
            .await
            .unwrap();
        let second = tokens::verify_refresh_token(
            &rotated.refresh_token,
            config.refresh_token_secret.as_bytes(),
        )
        .unwrap();

        assert_eq!(second.family, first.family, "rotation preserves the family");
        assert_eq!(rotated.user.id, user.id);
        assert!(
            tokens::verify_access_token(
                &rotated.access_token,
                config.access_token_secret.as_bytes()
            )
            .is_some()
        );
    }

    #[tokio::test]
    async fn stale_token_reuse_revokes_the_whole_family() {
        let store = MemoryStore::new();
        let config = test_config();
        let user = seeded_user(&store).await;

        let initial = start_family(&store, &config, &user).await.unwrap();
        let rotated = rotate(&store, &config, &initial.refresh_token)
            .await
            .unwrap();

        // Replay of the consumed token trips family revocation.
        let err = rotate(&store, &config, &initial.refresh_token)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::ReuseDetected));

        // The freshly issued token is now dead too.
        let err = rotate(&store, &config, &rotated.refresh_token)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::ReuseDetected));

        let family = tokens::verify_refresh_token(
            &initial.refresh_token,
            config.refresh_token_secret.as_bytes(),
        )
        .unwrap()
        .family;
        assert!(
            store
                .all_family_tokens(&family)
                .iter()
                .all(|r| r.revoked_at.is_some()),
            "every record in the family is revoked"
        );
    }

    #[tokio::test]
    async fn unknown_family_rejects_without_issuing() {
        let store = MemoryStore::new();
        let config = test_config();

        // Well-signed token whose family has no stored records.
        let orphan = tokens::issue_refresh_token(
            "ghost-user",
            &uuidv7(),
            config.refresh_token_secret.as_bytes(),
        )
        .unwrap();

        let err = rotate(&store, &config, &orphan).await.unwrap_err();
        assert!(matches!(err, AuthError::ReuseDetected));
    }

    #[tokio::test]
    async fn garbage_token_rejected_before_storage() {
        let store = MemoryStore::new();
        let config = test_config();
        let err = rotate(&store, &config, "not-a-jwt").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidRefreshToken));
    }

    #[tokio::test]
    async fn deleted_user_gets_no_tokens() {
        let store = MemoryStore::new();
        let config = test_config();
        let user = seeded_user(&store).await;

        let initial = start_family(&store, &config, &user).await.unwrap();
        store.delete_user(&user.id);

        let err = rotate(&store, &config, &initial.refresh_token)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::UserNotFound));

        // The matched record was still consumed.
        let family = tokens::verify_refresh_token(
            &initial.refresh_token,
            config.refresh_token_secret.as_bytes(),
        )
        .unwrap()
        .family;
        assert!(
            store
                .all_family_tokens(&family)
                .iter()
                .all(|r| r.revoked_at.is_some())
        );
    }

    #[tokio::test]
    async fn suspended_user_gets_no_tokens() {
        let store = MemoryStore::new();
        let config = test_config();
        let user = seeded_user(&store).await;

        let initial = start_family(&store, &config, &user).await.unwrap();
        store.set_user_active(&user.id, false).await.unwrap();

        let err = rotate(&store, &config, &initial.refresh_token)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Suspended));
    }

    #[tokio::test]
    async fn revoke_family_is_silent_for_invalid_tokens() {
        let store = MemoryStore::new();
        let config = test_config();
        assert_eq!(revoke_family(&store, &config, "junk").await.unwrap(), 0);

        let user = seeded_user(&store).await;
        let initial = start_family(&store, &config, &user).await.unwrap();
        assert_eq!(
            revoke_family(&store, &config, &initial.refresh_token)
                .await
                .unwrap(),
            1
        );
        // Second call finds nothing left to revoke.
        assert_eq!(
            revoke_family(&store, &config, &initial.refresh_token)
                .await
                .unwrap(),
            0
        );
    }
}
