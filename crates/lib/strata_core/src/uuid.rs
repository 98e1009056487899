//! Time-ordered record IDs.
//!
//! Refresh-token and API-key rows are read back in creation order when a
//! family is audited, so their IDs are UUIDv7 generated app-side (Postgres
//! only auto-generates v4). Users keep `gen_random_uuid()` since ordering
//! is irrelevant there. Everything downstream handles IDs as strings, so
//! the helper returns the canonical text form directly.

use uuid::Uuid;

/// A fresh UUIDv7 in canonical string form.
pub fn uuidv7() -> String {
    Uuid::now_v7().to_string()
}
