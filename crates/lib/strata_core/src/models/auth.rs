//! Authentication domain models.
//!
//! These are internal domain models, distinct from the API request/response
//! types in `strata_api` (which carry `#[serde(rename)]` for camelCase etc.).

use serde::{Deserialize, Serialize};

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    /// Stable string form used in storage and API payloads.
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    /// Parse the stored string form. Unknown values map to `User`.
    pub fn from_str_or_user(s: &str) -> Self {
        match s {
            "admin" => Role::Admin,
            _ => Role::User,
        }
    }
}

/// Domain user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub role: Role,
    pub is_active: bool,
}

/// User with password hash (for internal auth flows).
#[derive(Debug, Clone)]
pub struct UserWithPassword {
    pub user: User,
    pub password_hash: Option<String>,
}

/// The authenticated identity attached to a request.
///
/// `scopes` is `Some` only when the request authenticated with an API key;
/// JWT-authenticated requests carry `None` and bypass scope checks.
#[derive(Debug, Clone)]
pub struct Principal {
    pub user_id: String,
    pub email: String,
    pub role: Role,
    pub scopes: Option<Vec<String>>,
}

/// JWT claims embedded in access tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject — user ID (standard JWT `sub` claim).
    pub sub: String,
    /// User email.
    pub email: String,
    /// Role at issuance time. Authorization uses the *current* stored role;
    /// this claim is only trusted when the status check is unavailable.
    pub role: Role,
    /// Expiry (unix timestamp).
    pub exp: i64,
    /// Issued at (unix timestamp).
    pub iat: i64,
}

/// JWT claims embedded in refresh tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    /// Subject — user ID.
    pub sub: String,
    /// Family ID shared by every token issued in one login chain.
    pub family: String,
    /// Expiry (unix timestamp).
    pub exp: i64,
    /// Issued at (unix timestamp).
    pub iat: i64,
}

/// Refresh token record stored in the database.
///
/// Records are never deleted by the auth core; revocation sets `revoked_at`
/// and the row is retained for replay detection and audit.
#[derive(Debug, Clone)]
pub struct RefreshTokenRecord {
    pub id: String,
    pub user_id: String,
    pub family: String,
    pub token_digest: String,
    pub expires_at: chrono::DateTime<chrono::Utc>,
    pub revoked_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// API key record stored in the database.
///
/// Only the 12-char prefix and the salted digest persist; the plaintext key
/// is shown to the holder exactly once at mint time.
#[derive(Debug, Clone)]
pub struct ApiKeyRecord {
    pub id: String,
    pub user_id: String,
    pub key_prefix: String,
    pub key_hash: String,
    pub permissions: Vec<String>,
    pub expires_at: Option<chrono::DateTime<chrono::Utc>>,
    pub revoked_at: Option<chrono::DateTime<chrono::Utc>>,
    pub last_used_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_storage_form() {
        assert_eq!(Role::from_str_or_user(Role::Admin.as_str()), Role::Admin);
        assert_eq!(Role::from_str_or_user(Role::User.as_str()), Role::User);
        assert_eq!(Role::from_str_or_user("garbage"), Role::User);
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
    }
}
