//! In-memory `AuthStore` used by tests and demos.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;

use super::AuthStore;
use crate::auth::AuthError;
use crate::models::auth::{ApiKeyRecord, RefreshTokenRecord, Role, User, UserWithPassword};
use crate::uuid::uuidv7;

/// Map-backed store with the same visible semantics as the Postgres store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: DashMap<String, UserWithPassword>,
    refresh_tokens: DashMap<String, RefreshTokenRecord>,
    api_keys: DashMap<String, ApiKeyRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Direct record access for test assertions.
    pub fn refresh_token(&self, token_id: &str) -> Option<RefreshTokenRecord> {
        self.refresh_tokens.get(token_id).map(|r| r.clone())
    }

    /// Direct record access for test assertions.
    pub fn api_key(&self, key_id: &str) -> Option<ApiKeyRecord> {
        self.api_keys.get(key_id).map(|r| r.clone())
    }

    /// Snapshot of every record in a family, expired ones included.
    pub fn all_family_tokens(&self, family: &str) -> Vec<RefreshTokenRecord> {
        self.refresh_tokens
            .iter()
            .filter(|r| r.family == family)
            .map(|r| r.clone())
            .collect()
    }

    /// Mark a stored key revoked (management-surface stand-in for tests).
    pub fn revoke_api_key(&self, key_id: &str) {
        if let Some(mut record) = self.api_keys.get_mut(key_id) {
            record.revoked_at = Some(Utc::now());
        }
    }

    /// Remove a user entirely (account-deletion stand-in for tests).
    pub fn delete_user(&self, user_id: &str) {
        self.users.remove(user_id);
    }
}

#[async_trait]
impl AuthStore for MemoryStore {
    async fn find_user_by_id(&self, user_id: &str) -> Result<Option<User>, AuthError> {
        Ok(self.users.get(user_id).map(|u| u.user.clone()))
    }

    async fn find_user_by_email(
        &self,
        email: &str,
    ) -> Result<Option<UserWithPassword>, AuthError> {
        Ok(self
            .users
            .iter()
            .find(|u| u.user.email == email)
            .map(|u| u.clone()))
    }

    async fn email_exists(&self, email: &str) -> Result<bool, AuthError> {
        Ok(self.users.iter().any(|u| u.user.email == email))
    }

    async fn insert_user(
        &self,
        email: &str,
        name: Option<&str>,
        password_hash: &str,
        role: Role,
    ) -> Result<User, AuthError> {
        let user = User {
            id: uuidv7(),
            email: email.to_string(),
            name: name.map(|n| n.to_string()),
            role,
            is_active: true,
        };
        self.users.insert(
            user.id.clone(),
            UserWithPassword {
                user: user.clone(),
                password_hash: Some(password_hash.to_string()),
            },
        );
        Ok(user)
    }

    async fn set_user_role(&self, user_id: &str, role: Role) -> Result<bool, AuthError> {
        match self.users.get_mut(user_id) {
            Some(mut entry) => {
                entry.user.role = role;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn set_user_active(&self, user_id: &str, is_active: bool) -> Result<bool, AuthError> {
        match self.users.get_mut(user_id) {
            Some(mut entry) => {
                entry.user.is_active = is_active;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn insert_refresh_token(&self, record: RefreshTokenRecord) -> Result<(), AuthError> {
        self.refresh_tokens.insert(record.id.clone(), record);
        Ok(())
    }

    async fn family_refresh_tokens(
        &self,
        family: &str,
    ) -> Result<Vec<RefreshTokenRecord>, AuthError> {
        let now = Utc::now();
        let mut records: Vec<RefreshTokenRecord> = self
            .refresh_tokens
            .iter()
            .filter(|r| r.family == family && r.expires_at > now)
            .map(|r| r.clone())
            .collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(records)
    }

    async fn revoke_refresh_token(&self, token_id: &str) -> Result<(), AuthError> {
        if let Some(mut record) = self.refresh_tokens.get_mut(token_id) {
            if record.revoked_at.is_none() {
                record.revoked_at = Some(Utc::now());
            }
        }
        Ok(())
    }

    async fn revoke_refresh_family(&self, family: &str) -> Result<u64, AuthError> {
        let now = Utc::now();
        let mut revoked = 0;
        for mut record in self.refresh_tokens.iter_mut() {
            if record.family == family && record.revoked_at.is_none() {
                record.revoked_at = Some(now);
                revoked += 1;
            }
        }
        Ok(revoked)
    }

    async fn insert_api_key(&self, record: ApiKeyRecord) -> Result<(), AuthError> {
        self.api_keys.insert(record.id.clone(), record);
        Ok(())
    }

    async fn api_keys_by_prefix(&self, key_prefix: &str) -> Result<Vec<ApiKeyRecord>, AuthError> {
        let mut records: Vec<ApiKeyRecord> = self
            .api_keys
            .iter()
            .filter(|r| r.key_prefix == key_prefix && r.revoked_at.is_none())
            .map(|r| r.clone())
            .collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(records)
    }

    async fn touch_api_key(&self, key_id: &str) -> Result<(), AuthError> {
        if let Some(mut record) = self.api_keys.get_mut(key_id) {
            record.last_used_at = Some(Utc::now());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn user_lifecycle() {
        let store = MemoryStore::new();
        let user = store
            .insert_user("ada@example.com", Some("Ada"), "hash", Role::User)
            .await
            .unwrap();

        assert!(store.email_exists("ada@example.com").await.unwrap());
        assert!(store.set_user_role(&user.id, Role::Admin).await.unwrap());
        assert!(store.set_user_active(&user.id, false).await.unwrap());

        let found = store.find_user_by_id(&user.id).await.unwrap().unwrap();
        assert_eq!(found.role, Role::Admin);
        assert!(!found.is_active);

        assert!(!store.set_user_role("missing", Role::User).await.unwrap());
    }

    #[tokio::test]
    async fn family_queries_exclude_expired_records() {
        let store = MemoryStore::new();
        let fresh = RefreshTokenRecord {
            id: uuidv7(),
            user_id: "u1".into(),
            family: "f1".into(),
            token_digest: "d1".into(),
            expires_at: Utc::now() + chrono::Duration::days(1),
            revoked_at: None,
        };
        let expired = RefreshTokenRecord {
            id: uuidv7(),
            expires_at: Utc::now() - chrono::Duration::days(1),
            ..fresh.clone()
        };
        store.insert_refresh_token(fresh.clone()).await.unwrap();
        store.insert_refresh_token(expired).await.unwrap();

        let records = store.family_refresh_tokens("f1").await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, fresh.id);
    }

    #[tokio::test]
    async fn family_revocation_only_touches_unrevoked() {
        let store = MemoryStore::new();
        for _ in 0..2 {
            store
                .insert_refresh_token(RefreshTokenRecord {
                    id: uuidv7(),
                    user_id: "u1".into(),
                    family: "f1".into(),
                    token_digest: "d".into(),
                    expires_at: Utc::now() + chrono::Duration::days(1),
                    revoked_at: None,
                })
                .await
                .unwrap();
        }
        assert_eq!(store.revoke_refresh_family("f1").await.unwrap(), 2);
        assert_eq!(store.revoke_refresh_family("f1").await.unwrap(), 0);
    }
}
