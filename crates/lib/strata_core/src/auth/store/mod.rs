//! Storage abstraction for the auth core.
//!
//! Persistence is an external collaborator: the core only needs a handful of
//! find/insert/update operations, expressed here as the [`AuthStore`] trait.
//! [`postgres::PgStore`] backs production; [`memory::MemoryStore`] backs
//! tests and demos.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use super::AuthError;
use crate::models::auth::{ApiKeyRecord, RefreshTokenRecord, Role, User, UserWithPassword};

/// The storage operations the auth core depends on.
#[async_trait]
pub trait AuthStore: Send + Sync {
    async fn find_user_by_id(&self, user_id: &str) -> Result<Option<User>, AuthError>;

    async fn find_user_by_email(&self, email: &str)
    -> Result<Option<UserWithPassword>, AuthError>;

    async fn email_exists(&self, email: &str) -> Result<bool, AuthError>;

    async fn insert_user(
        &self,
        email: &str,
        name: Option<&str>,
        password_hash: &str,
        role: Role,
    ) -> Result<User, AuthError>;

    /// Returns `false` when no such user exists.
    async fn set_user_role(&self, user_id: &str, role: Role) -> Result<bool, AuthError>;

    /// Returns `false` when no such user exists.
    async fn set_user_active(&self, user_id: &str, is_active: bool) -> Result<bool, AuthError>;

    async fn insert_refresh_token(&self, record: RefreshTokenRecord) -> Result<(), AuthError>;

    /// All non-expired records in a family, regardless of revocation state.
    async fn family_refresh_tokens(
        &self,
        family: &str,
    ) -> Result<Vec<RefreshTokenRecord>, AuthError>;

    async fn revoke_refresh_token(&self, token_id: &str) -> Result<(), AuthError>;

    /// Revoke every unrevoked record in a family; returns how many were hit.
    async fn revoke_refresh_family(&self, family: &str) -> Result<u64, AuthError>;

    async fn insert_api_key(&self, record: ApiKeyRecord) -> Result<(), AuthError>;

    /// All non-revoked key records sharing a presented prefix.
    async fn api_keys_by_prefix(&self, key_prefix: &str) -> Result<Vec<ApiKeyRecord>, AuthError>;

    async fn touch_api_key(&self, key_id: &str) -> Result<(), AuthError>;
}
