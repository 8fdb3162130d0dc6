use axum::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::fmt;
use std::str::FromStr;
use tracing::info;

use crate::models::jwt::RefreshTokenRecord;
use crate::models::user::{NewUser, User};

#[cfg(test)]
pub mod memory;
pub mod sqlite;

pub use sqlite::SqliteStore;

#[derive(Debug)]
pub enum StoreError {
    Database(sqlx::Error),
    /// A unique constraint was violated (duplicate email, duplicate token).
    Conflict,
    Unavailable(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Database(e) => write!(f, "database error: {}", e),
            StoreError::Conflict => write!(f, "record already exists"),
            StoreError::Unavailable(msg) => write!(f, "store unavailable: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Database(e) => Some(e),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => StoreError::Conflict,
            _ => StoreError::Database(err),
        }
    }
}

/// Users and refresh-token rows, as seen by the authentication layer.
///
/// Timestamps passed in and out are unix seconds. `revoke_refresh_token` is
/// idempotent and `rotate_refresh_token` must revoke-and-insert atomically.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_user_by_id(&self, id: &str) -> Result<Option<User>, StoreError>;

    async fn insert_user(&self, user: NewUser) -> Result<User, StoreError>;

    async fn find_active_refresh_token(
        &self,
        token: &str,
    ) -> Result<Option<RefreshTokenRecord>, StoreError>;

    async fn insert_refresh_token(
        &self,
        user_id: &str,
        token: &str,
        expires_at: i64,
    ) -> Result<(), StoreError>;

    /// Returns `true` when this call moved the token from active to revoked.
    async fn revoke_refresh_token(&self, token: &str) -> Result<bool, StoreError>;

    /// Revoke `old` only if it is still active for `user_id`, and persist `new`
    /// in the same unit. Returns `false` (and writes nothing) if `old` was
    /// already revoked, expired, or unknown.
    async fn rotate_refresh_token(
        &self,
        old: &str,
        user_id: &str,
        new: &str,
        expires_at: i64,
        now: i64,
    ) -> Result<bool, StoreError>;

    async fn revoke_user_refresh_tokens(&self, user_id: &str) -> Result<u64, StoreError>;
}

pub async fn create_db_pool(db_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(db_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    // Run migrations
    sqlx::migrate!("./migrations").run(&pool).await?;

    info!(url = %db_url, "Database ready");
    Ok(pool)
}
