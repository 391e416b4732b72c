//! Postgres-backed profile store.
//!
//! `username` carries a unique index, so the check-then-write race in
//! username allocation surfaces here as [`ProfileStoreError::UsernameConflict`]
//! instead of a silent duplicate.

use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use super::{ProfileStore, ProfileStoreError, UserProfile};

#[derive(Clone)]
pub struct PgProfileStore {
    pool: PgPool,
}

impl PgProfileStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn profile_from_row(row: &PgRow) -> UserProfile {
    UserProfile {
        uid: row.get("uid"),
        username: row.get("username"),
        email: row.get("email"),
        created_at: row.get("created_at"),
    }
}

fn map_write_error(err: sqlx::Error, username: &str) -> ProfileStoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            ProfileStoreError::UsernameConflict(username.to_owned())
        }
        _ => ProfileStoreError::Db(err),
    }
}

#[async_trait::async_trait]
impl ProfileStore for PgProfileStore {
    async fn get(&self, uid: &str) -> Result<Option<UserProfile>, ProfileStoreError> {
        let row = sqlx::query("SELECT uid, username, email, created_at FROM profiles WHERE uid = $1")
            .bind(uid)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(profile_from_row))
    }

    async fn find_by_username(&self, username: &str) -> Result<Vec<UserProfile>, ProfileStoreError> {
        let rows = sqlx::query("SELECT uid, username, email, created_at FROM profiles WHERE username = $1")
            .bind(username)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(profile_from_row).collect())
    }

    async fn put(&self, profile: &UserProfile) -> Result<(), ProfileStoreError> {
        sqlx::query(
            r"INSERT INTO profiles (uid, username, email, created_at)
              VALUES ($1, $2, $3, $4)
              ON CONFLICT (uid) DO UPDATE
                  SET username = EXCLUDED.username,
                      email = EXCLUDED.email,
                      created_at = EXCLUDED.created_at",
        )
        .bind(&profile.uid)
        .bind(&profile.username)
        .bind(&profile.email)
        .bind(profile.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, &profile.username))?;
        Ok(())
    }
}

#[cfg(all(test, feature = "live-db-tests"))]
#[path = "pg_test.rs"]
mod tests;
