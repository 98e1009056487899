//! Postgres `AuthStore` backed by sqlx.

use async_trait::async_trait;
use sqlx::PgPool;

use super::AuthStore;
use crate::auth::AuthError;
use crate::models::auth::{ApiKeyRecord, RefreshTokenRecord, Role, User, UserWithPassword};

type UserRow = (String, String, Option<String>, String, bool);

type RefreshRow = (
    String,
    String,
    String,
    String,
    chrono::DateTime<chrono::Utc>,
    Option<chrono::DateTime<chrono::Utc>>,
);

type ApiKeyRow = (
    String,
    String,
    String,
    String,
    Vec<String>,
    Option<chrono::DateTime<chrono::Utc>>,
    Option<chrono::DateTime<chrono::Utc>>,
    Option<chrono::DateTime<chrono::Utc>>,
);

fn user_from_row((id, email, name, role, is_active): UserRow) -> User {
    User {
        id,
        email,
        name,
        role: Role::from_str_or_user(&role),
        is_active,
    }
}

fn refresh_from_row(
    (id, user_id, family, token_digest, expires_at, revoked_at): RefreshRow,
) -> RefreshTokenRecord {
    RefreshTokenRecord {
        id,
        user_id,
        family,
        token_digest,
        expires_at,
        revoked_at,
    }
}

fn api_key_from_row(
    (id, user_id, key_prefix, key_hash, permissions, expires_at, revoked_at, last_used_at): ApiKeyRow,
) -> ApiKeyRecord {
    ApiKeyRecord {
        id,
        user_id,
        key_prefix,
        key_hash,
        permissions,
        expires_at,
        revoked_at,
        last_used_at,
    }
}

/// sqlx-backed store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl AuthStore for PgStore {
    async fn find_user_by_id(&self, user_id: &str) -> Result<Option<User>, AuthError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id::text, email, name, role, is_active FROM users WHERE id = $1::uuid",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(user_from_row))
    }

    async fn find_user_by_email(
        &self,
        email: &str,
    ) -> Result<Option<UserWithPassword>, AuthError> {
        let row = sqlx::query_as::<_, (String, String, Option<String>, String, bool, Option<String>)>(
            "SELECT id::text, email, name, role, is_active, password_hash \
             FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(id, email, name, role, is_active, password_hash)| UserWithPassword {
            user: user_from_row((id, email, name, role, is_active)),
            password_hash,
        }))
    }

    async fn email_exists(&self, email: &str) -> Result<bool, AuthError> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
                .bind(email)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn insert_user(
        &self,
        email: &str,
        name: Option<&str>,
        password_hash: &str,
        role: Role,
    ) -> Result<User, AuthError> {
        let row = sqlx::query_as::<_, UserRow>(
            "INSERT INTO users (email, name, password_hash, role) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id::text, email, name, role, is_active",
        )
        .bind(email)
        .bind(name)
        .bind(password_hash)
        .bind(role.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(user_from_row(row))
    }

    async fn set_user_role(&self, user_id: &str, role: Role) -> Result<bool, AuthError> {
        let result = sqlx::query("UPDATE users SET role = $2 WHERE id = $1::uuid")
            .bind(user_id)
            .bind(role.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_user_active(&self, user_id: &str, is_active: bool) -> Result<bool, AuthError> {
        let result = sqlx::query("UPDATE users SET is_active = $2 WHERE id = $1::uuid")
            .bind(user_id)
            .bind(is_active)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_refresh_token(&self, record: RefreshTokenRecord) -> Result<(), AuthError> {
        sqlx::query(
            "INSERT INTO refresh_tokens (id, user_id, family, token_digest, expires_at) \
             VALUES ($1::uuid, $2::uuid, $3::uuid, $4, $5)",
        )
        .bind(&record.id)
        .bind(&record.user_id)
        .bind(&record.family)
        .bind(&record.token_digest)
        .bind(record.expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn family_refresh_tokens(
        &self,
        family: &str,
    ) -> Result<Vec<RefreshTokenRecord>, AuthError> {
        let rows = sqlx::query_as::<_, RefreshRow>(
            "SELECT id::text, user_id::text, family::text, token_digest, expires_at, revoked_at \
             FROM refresh_tokens \
             WHERE family = $1::uuid AND expires_at > now() \
             ORDER BY id",
        )
        .bind(family)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(refresh_from_row).collect())
    }

    async fn revoke_refresh_token(&self, token_id: &str) -> Result<(), AuthError> {
        sqlx::query(
            "UPDATE refresh_tokens SET revoked_at = now() \
             WHERE id = $1::uuid AND revoked_at IS NULL",
        )
        .bind(token_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn revoke_refresh_family(&self, family: &str) -> Result<u64, AuthError> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET revoked_at = now() \
             WHERE family = $1::uuid AND revoked_at IS NULL",
        )
        .bind(family)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn insert_api_key(&self, record: ApiKeyRecord) -> Result<(), AuthError> {
        sqlx::query(
            "INSERT INTO api_keys \
             (id, user_id, key_prefix, key_hash, permissions, expires_at) \
             VALUES ($1::uuid, $2::uuid, $3, $4, $5, $6)",
        )
        .bind(&record.id)
        .bind(&record.user_id)
        .bind(&record.key_prefix)
        .bind(&record.key_hash)
        .bind(&record.permissions)
        .bind(record.expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn api_keys_by_prefix(&self, key_prefix: &str) -> Result<Vec<ApiKeyRecord>, AuthError> {
        let rows = sqlx::query_as::<_, ApiKeyRow>(
            "SELECT id::text, user_id::text, key_prefix, key_hash, permissions, \
                    expires_at, revoked_at, last_used_at \
             FROM api_keys \
             WHERE key_prefix = $1 AND revoked_at IS NULL \
             ORDER BY id",
        )
        .bind(key_prefix)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(api_key_from_row).collect())
    }

    async fn touch_api_key(&self, key_id: &str) -> Result<(), AuthError> {
        sqlx::query("UPDATE api_keys SET last_used_at = now() WHERE id = $1::uuid")
            .bind(key_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
