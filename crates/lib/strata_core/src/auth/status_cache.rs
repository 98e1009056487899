//! Read-through cache of live account status (active flag + current role).
//!
//! The middleware consults this on every JWT-authenticated request so that a
//! suspension or demotion takes effect within one TTL window instead of at
//! token expiry. Entries are evicted by TTL or by explicit invalidation from
//! whatever code mutates a user's role or active flag.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::warn;

use super::store::AuthStore;
use crate::models::auth::Role;

/// Default entry TTL: 30 seconds.
pub const DEFAULT_STATUS_TTL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy)]
struct StatusEntry {
    is_active: bool,
    role: Role,
    fetched_at: Instant,
}

/// Result of a status lookup.
///
/// `Unavailable` means the backing store errored; the caller decides whether
/// to fail open (the middleware trusts the token) or closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLookup {
    Found { is_active: bool, role: Role },
    NotFound,
    Unavailable,
}

/// Process-wide account-status cache, keyed by user ID.
#[derive(Debug)]
pub struct UserStatusCache {
    entries: DashMap<String, StatusEntry>,
    ttl: Duration,
}

impl Default for UserStatusCache {
    fn default() -> Self {
        Self::new()
    }
}

impl UserStatusCache {
    /// Create a cache with the default 30 s TTL.
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_STATUS_TTL)
    }

    /// Create a cache with a custom TTL. Tests use short TTLs.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Fetch current status, via cache when fresh, the store otherwise.
    pub async fn lookup(&self, store: &dyn AuthStore, user_id: &str) -> StatusLookup {
        if let Some(entry) = self.entries.get(user_id) {
            if entry.fetched_at.elapsed() < self.ttl {
                return StatusLookup::Found {
                    is_active: entry.is_active,
                    role: entry.role,
                };
            }
        }

        match store.find_user_by_id(user_id).await {
            Ok(Some(user)) => {
                self.entries.insert(
                    user_id.to_string(),
                    StatusEntry {
                        is_active: user.is_active,
                        role: user.role,
                        fetched_at: Instant::now(),
                    },
                );
                StatusLookup::Found {
                    is_active: user.is_active,
                    role: user.role,
                }
            }
            Ok(None) => {
                self.entries.remove(user_id);
                StatusLookup::NotFound
            }
            Err(e) => {
                warn!(user_id, error = %e, "user status lookup failed");
                StatusLookup::Unavailable
            }
        }
    }

    /// Drop the entry for one user, forcing a store read on next lookup.
    pub fn invalidate(&self, user_id: &str) {
        self.entries.remove(user_id);
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthError;
    use crate::auth::store::memory::MemoryStore;
    use crate::models::auth::{User, UserWithPassword};

    /// Store double whose reads always fail.
    struct FailingStore;

    #[async_trait::async_trait]
    impl AuthStore for FailingStore {
        async fn find_user_by_id(&self, _user_id: &str) -> Result<Option<User>, AuthError> {
            Err(AuthError::Internal("store down".into()))
        }

        async fn find_user_by_email(
            &self,
            _email: &str,
        ) -> Result<Option<UserWithPassword>, AuthError> {
            Err(AuthError::Internal("store down".into()))
        }

        async fn email_exists(&self, _email: &str) -> Result<bool, AuthError> {
            Err(AuthError::Internal("store down".into()))
        }

        async fn insert_user(
            &self,
            _email: &str,
            _name: Option<&str>,
            _password_hash: &str,
            _role: Role,
        ) -> Result<User, AuthError> {
            Err(AuthError::Internal("store down".into()))
        }

        async fn set_user_role(&self, _user_id: &str, _role: Role) -> Result<bool, AuthError> {
            Err(AuthError::Internal("store down".into()))
        }

        async fn set_user_active(
            &self,
            _user_id: &str,
            _is_active: bool,
        ) -> Result<bool, AuthError> {
            Err(AuthError::Internal("store down".into()))
        }

        async fn insert_refresh_token(
            &self,
            _record: crate::models::auth::RefreshTokenRecord,
        ) -> Result<(), AuthError> {
            Err(AuthError::Internal("store down".into()))
        }

        async fn family_refresh_tokens(
            &self,
            _family: &str,
        ) -> Result<Vec<crate::models::auth::RefreshTokenRecord>, AuthError> {
            Err(AuthError::Internal("store down".into()))
        }

        async fn revoke_refresh_token(&self, _token_id: &str) -> Result<(), AuthError> {
            Err(AuthError::Internal("store down".into()))
        }

        async fn revoke_refresh_family(&self, _family: &str) -> Result<u64, AuthError> {
            Err(AuthError::Internal("store down".into()))
        }

        async fn insert_api_key(
            &self,
            _record: crate::models::auth::ApiKeyRecord,
        ) -> Result<(), AuthError> {
            Err(AuthError::Internal("store down".into()))
        }

        async fn api_keys_by_prefix(
            &self,
            _key_prefix: &str,
        ) -> Result<Vec<crate::models::auth::ApiKeyRecord>, AuthError> {
            Err(AuthError::Internal("store down".into()))
        }

        async fn touch_api_key(&self, _key_id: &str) -> Result<(), AuthError> {
            Err(AuthError::Internal("store down".into()))
        }
    }

    #[tokio::test]
    async fn lookup_caches_until_ttl() {
        let store = MemoryStore::new();
        let user = store
            .insert_user("ada@example.com", None, "hash", Role::User)
            .await
            .unwrap();

        let cache = UserStatusCache::with_ttl(Duration::from_secs(60));
        assert_eq!(
            cache.lookup(&store, &user.id).await,
            StatusLookup::Found {
                is_active: true,
                role: Role::User
            }
        );

        // Mutate the store behind the cache's back; the stale entry wins.
        store.set_user_role(&user.id, Role::Admin).await.unwrap();
        assert_eq!(
            cache.lookup(&store, &user.id).await,
            StatusLookup::Found {
                is_active: true,
                role: Role::User
            }
        );
    }

    #[tokio::test]
    async fn expired_entry_is_refetched() {
        let store = MemoryStore::new();
        let user = store
            .insert_user("ada@example.com", None, "hash", Role::User)
            .await
            .unwrap();

        let cache = UserStatusCache::with_ttl(Duration::ZERO);
        cache.lookup(&store, &user.id).await;
        store.set_user_active(&user.id, false).await.unwrap();

        assert_eq!(
            cache.lookup(&store, &user.id).await,
            StatusLookup::Found {
                is_active: false,
                role: Role::User
            }
        );
    }

    #[tokio::test]
    async fn invalidate_forces_fresh_read() {
        let store = MemoryStore::new();
        let user = store
            .insert_user("ada@example.com", None, "hash", Role::User)
            .await
            .unwrap();

        let cache = UserStatusCache::with_ttl(Duration::from_secs(60));
        cache.lookup(&store, &user.id).await;
        store.set_user_role(&user.id, Role::Admin).await.unwrap();
        cache.invalidate(&user.id);

        assert_eq!(
            cache.lookup(&store, &user.id).await,
            StatusLookup::Found {
                is_active: true,
                role: Role::Admin
            }
        );
    }

    #[tokio::test]
    async fn unknown_user_is_not_found() {
        let store = MemoryStore::new();
        let cache = UserStatusCache::new();
        assert_eq!(cache.lookup(&store, "missing").await, StatusLookup::NotFound);
    }

    #[tokio::test]
    async fn store_error_is_unavailable() {
        let cache = UserStatusCache::new();
        assert_eq!(
            cache.lookup(&FailingStore, "u1").await,
            StatusLookup::Unavailable
        );
    }

    #[tokio::test]
    async fn clear_drops_all_entries() {
        let store = MemoryStore::new();
        let user = store
            .insert_user("ada@example.com", None, "hash", Role::User)
            .await
            .unwrap();

        let cache = UserStatusCache::with_ttl(Duration::from_secs(60));
        cache.lookup(&store, &user.id).await;
        store.set_user_active(&user.id, false).await.unwrap();
        cache.clear();

        assert_eq!(
            cache.lookup(&store, &user.id).await,
            StatusLookup::Found {
                is_active: false,
                role: Role::User
            }
        );
    }
}
