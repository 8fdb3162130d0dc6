use axum::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{CredentialStore, StoreError};
use crate::models::jwt::RefreshTokenRecord;
use crate::models::user::{normalize_email, NewUser, User};

#[derive(Default)]
struct Inner {
    users: HashMap<String, User>,
    refresh_tokens: HashMap<String, RefreshTokenRecord>,
}

/// In-process credential store used by unit tests.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    offline: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with `StoreError::Unavailable`.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.check_online()?;
        let email = normalize_email(email);
        let inner = self.inner.lock().await;
        Ok(inner.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_id(&self, id: &str) -> Result<Option<User>, StoreError> {
        self.check_online()?;
        Ok(self.inner.lock().await.users.get(id).cloned())
    }

    async fn insert_user(&self, user: NewUser) -> Result<User, StoreError> {
        self.check_online()?;
        let mut inner = self.inner.lock().await;
        let email = normalize_email(&user.email);
        if inner.users.values().any(|u| u.email == email) {
            return Err(StoreError::Conflict);
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4().to_string(),
            email,
            password_hash: user.password_hash,
            name: user.name,
            role: user.role,
            created_at: now,
            updated_at: now,
        };
        inner.users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn find_active_refresh_token(
        &self,
        token: &str,
    ) -> Result<Option<RefreshTokenRecord>, StoreError> {
        self.check_online()?;
        Ok(self.inner.lock().await.refresh_tokens.get(token).cloned())
    }

    async fn insert_refresh_token(
        &self,
        user_id: &str,
        token: &str,
        expires_at: i64,
    ) -> Result<(), StoreError> {
        self.check_online()?;
        let mut inner = self.inner.lock().await;
        if inner.refresh_tokens.contains_key(token) {
            return Err(StoreError::Conflict);
        }
        inner.refresh_tokens.insert(
            token.to_string(),
            RefreshTokenRecord {
                user_id: user_id.to_string(),
                expires_at,
                revoked: false,
            },
        );
        Ok(())
    }

    async fn revoke_refresh_token(&self, token: &str) -> Result<bool, StoreError> {
        self.check_online()?;
        let mut inner = self.inner.lock().await;
        match inner.refresh_tokens.get_mut(token) {
            Some(record) if !record.revoked => {
                record.revoked = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn rotate_refresh_token(
        &self,
        old: &str,
        user_id: &str,
        new: &str,
        expires_at: i64,
        now: i64,
    ) -> Result<bool, StoreError> {
        self.check_online()?;
        let mut inner = self.inner.lock().await;

        let active = inner
            .refresh_tokens
            .get(old)
            .is_some_and(|r| r.user_id == user_id && r.is_active(now));
        if !active || inner.refresh_tokens.contains_key(new) {
            return Ok(false);
        }

        if let Some(record) = inner.refresh_tokens.get_mut(old) {
            record.revoked = true;
        }
        inner.refresh_tokens.insert(
            new.to_string(),
            RefreshTokenRecord {
                user_id: user_id.to_string(),
                expires_at,
                revoked: false,
            },
        );
        Ok(true)
    }

    async fn revoke_user_refresh_tokens(&self, user_id: &str) -> Result<u64, StoreError> {
        self.check_online()?;
        let mut inner = self.inner.lock().await;
        let mut count = 0;
        for record in inner.refresh_tokens.values_mut() {
            if record.user_id == user_id && !record.revoked {
                record.revoked = true;
                count += 1;
            }
        }
        Ok(count)
    }
}
