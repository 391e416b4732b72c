//! Profiles: the application-owned record extending an identity with a
//! unique username.
//!
//! DESIGN
//! ======
//! Persistence sits behind the [`ProfileStore`] trait: a point lookup by
//! `uid`, an equality query on `username`, and an overwriting `put`. The
//! Postgres adapter lives in [`pg`]; tests use an in-memory store.

pub mod pg;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

pub use pg::PgProfileStore;

// =============================================================================
// ERROR
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ProfileStoreError {
    /// The username was claimed by another profile between check and write.
    #[error("username {0} is already taken")]
    UsernameConflict(String),
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
    #[error("profile store unavailable: {0}")]
    Unavailable(String),
}

impl ProfileStoreError {
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::UsernameConflict(_) => "E_USERNAME_CONFLICT",
            Self::Db(_) | Self::Unavailable(_) => "E_PROFILE_STORE",
        }
    }
}

// =============================================================================
// USER PROFILE
// =============================================================================

/// One profile per identity, keyed by the identity's `uid`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub uid: String,
    pub username: String,
    pub email: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl UserProfile {
    #[must_use]
    pub fn new(uid: impl Into<String>, username: impl Into<String>, email: impl Into<String>) -> Self {
        Self { uid: uid.into(), username: username.into(), email: email.into(), created_at: OffsetDateTime::now_utc() }
    }
}

// =============================================================================
// PROFILE STORE TRAIT
// =============================================================================

/// Profile persistence as consumed by the session layer.
#[async_trait::async_trait]
pub trait ProfileStore: Send + Sync {
    /// Point lookup by primary key.
    async fn get(&self, uid: &str) -> Result<Option<UserProfile>, ProfileStoreError>;

    /// All profiles whose `username` equals `username` exactly.
    async fn find_by_username(&self, username: &str) -> Result<Vec<UserProfile>, ProfileStoreError>;

    /// Create or overwrite the profile keyed by `profile.uid`.
    async fn put(&self, profile: &UserProfile) -> Result<(), ProfileStoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_serializes_created_at_as_rfc3339() {
        let profile = UserProfile {
            uid: "u1".into(),
            username: "janedoe".into(),
            email: "jane.doe@example.com".into(),
            created_at: OffsetDateTime::UNIX_EPOCH,
        };
        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(json["created_at"], "1970-01-01T00:00:00Z");
        assert_eq!(json["username"], "janedoe");
    }

    #[test]
    fn profile_new_stamps_now() {
        let before = OffsetDateTime::now_utc();
        let profile = UserProfile::new("u1", "bob", "bob@example.com");
        assert!(profile.created_at >= before);
        assert_eq!(profile.uid, "u1");
    }

    #[test]
    fn error_codes() {
        assert_eq!(ProfileStoreError::UsernameConflict("x".into()).error_code(), "E_USERNAME_CONFLICT");
        assert_eq!(ProfileStoreError::Unavailable("down".into()).error_code(), "E_PROFILE_STORE");
    }
}
