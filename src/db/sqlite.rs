use axum::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::{CredentialStore, StoreError};
use crate::models::jwt::RefreshTokenRecord;
use crate::models::user::{normalize_email, NewUser, User};

const USER_COLUMNS: &str = "id, email, password_hash, name, role, created_at, updated_at";

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Hard-delete refresh tokens that are expired or revoked.
    #[instrument(skip(self))]
    pub async fn purge_refresh_tokens(&self) -> Result<u64, StoreError> {
        let now = Utc::now().timestamp();
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE revoked = 1 OR expires_at < ?")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to purge refresh tokens");
                StoreError::from(e)
            })?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl CredentialStore for SqliteStore {
    #[instrument(skip(self))]
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let query = format!("SELECT {} FROM users WHERE email = ?", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&query)
            .bind(normalize_email(email))
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    #[instrument(skip(self))]
    async fn find_user_by_id(&self, id: &str) -> Result<Option<User>, StoreError> {
        let query = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    #[instrument(skip(self, user))]
    async fn insert_user(&self, user: NewUser) -> Result<User, StoreError> {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4().to_string(),
            email: normalize_email(&user.email),
            password_hash: user.password_hash,
            name: user.name,
            role: user.role,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            "INSERT INTO users (id, email, password_hash, name, role, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.name)
        .bind(user.role)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;

        info!(user_id = %user.id, "Created user");
        Ok(user)
    }

    #[instrument(skip(self, token))]
    async fn find_active_refresh_token(
        &self,
        token: &str,
    ) -> Result<Option<RefreshTokenRecord>, StoreError> {
        let row: Option<(String, i64, bool)> = sqlx::query_as(
            "SELECT user_id, expires_at, revoked FROM refresh_tokens WHERE token = ?",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        if row.is_none() {
            warn!("Refresh token not found");
        }

        Ok(row.map(|(user_id, expires_at, revoked)| RefreshTokenRecord {
            user_id,
            expires_at,
            revoked,
        }))
    }

    #[instrument(skip(self, token))]
    async fn insert_refresh_token(
        &self,
        user_id: &str,
        token: &str,
        expires_at: i64,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO refresh_tokens (token, user_id, expires_at, revoked, created_at) \
             VALUES (?, ?, ?, 0, ?)",
        )
        .bind(token)
        .bind(user_id)
        .bind(expires_at)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to store refresh token");
            StoreError::from(e)
        })?;

        info!(user_id = %user_id, "Stored refresh token");
        Ok(())
    }

    #[instrument(skip(self, token))]
    async fn revoke_refresh_token(&self, token: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE refresh_tokens SET revoked = 1 WHERE token = ? AND revoked = 0")
            .bind(token)
            .execute(&self.pool)
            .await?;

        let revoked = result.rows_affected() > 0;
        if revoked {
            info!("Revoked refresh token");
        }
        Ok(revoked)
    }

    #[instrument(skip(self, old, new))]
    async fn rotate_refresh_token(
        &self,
        old: &str,
        user_id: &str,
        new: &str,
        expires_at: i64,
        now: i64,
    ) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE refresh_tokens SET revoked = 1 \
             WHERE token = ? AND user_id = ? AND revoked = 0 AND expires_at >= ?",
        )
        .bind(old)
        .bind(user_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() != 1 {
            tx.rollback().await?;
            warn!(user_id = %user_id, "Refresh token was no longer active during rotation");
            return Ok(false);
        }

        sqlx::query(
            "INSERT INTO refresh_tokens (token, user_id, expires_at, revoked, created_at) \
             VALUES (?, ?, ?, 0, ?)",
        )
        .bind(new)
        .bind(user_id)
        .bind(expires_at)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(user_id = %user_id, "Rotated refresh token");
        Ok(true)
    }

    #[instrument(skip(self))]
    async fn revoke_user_refresh_tokens(&self, user_id: &str) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET revoked = 1 WHERE user_id = ? AND revoked = 0",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        info!(user_id = %user_id, count = result.rows_affected(), "Revoked all user refresh tokens");
        Ok(result.rows_affected())
    }
}
