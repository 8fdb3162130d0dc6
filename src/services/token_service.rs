// src/services/token_service.rs
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use std::fmt;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::config::TokenTtls;
use crate::db::{CredentialStore, StoreError};
use crate::models::jwt::{AccessClaims, IssueOptions, IssuedTokens, TokenClaims};
use crate::models::user::User;

const REFRESH_TOKEN_BYTES: usize = 32;

#[derive(Debug)]
pub enum TokenError {
    /// Bad signature, malformed payload, expired, unknown or revoked.
    Invalid,
    StorageUnavailable(StoreError),
    Signing(jsonwebtoken::errors::Error),
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenError::Invalid => write!(f, "invalid token"),
            TokenError::StorageUnavailable(e) => write!(f, "token storage unavailable: {}", e),
            TokenError::Signing(e) => write!(f, "failed to sign token: {}", e),
        }
    }
}

impl std::error::Error for TokenError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TokenError::Invalid => None,
            TokenError::StorageUnavailable(e) => Some(e),
            TokenError::Signing(e) => Some(e),
        }
    }
}

impl From<StoreError> for TokenError {
    fn from(err: StoreError) -> Self {
        TokenError::StorageUnavailable(err)
    }
}

/// Issues, verifies, rotates and revokes access/refresh token pairs.
///
/// Access tokens are HS256 JWTs checked locally. Refresh tokens are opaque
/// random strings whose state lives in the credential store.
pub struct TokenManager<S> {
    store: Arc<S>,
    enc_key: EncodingKey,
    dec_key: DecodingKey,
    ttls: TokenTtls,
}

impl<S> Clone for TokenManager<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            enc_key: self.enc_key.clone(),
            dec_key: self.dec_key.clone(),
            ttls: self.ttls,
        }
    }
}

impl<S: CredentialStore> TokenManager<S> {
    pub fn new(store: Arc<S>, secret: &[u8], ttls: TokenTtls) -> Self {
        Self {
            store,
            enc_key: EncodingKey::from_secret(secret),
            dec_key: DecodingKey::from_secret(secret),
            ttls,
        }
    }

    /* ---------- PUBLIC API ---------- */

    /// Mint a new pair for `user`. Nothing is persisted.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub fn issue(&self, user: &User, options: IssueOptions) -> Result<IssuedTokens, TokenError> {
        let now = Utc::now().timestamp();
        let access_expires_at = now + self.ttls.access(options.remember_me).num_seconds();
        let refresh_expires_at = now + self.ttls.refresh(options.remember_me).num_seconds();

        let access_token = self.create_jwt(&AccessClaims::new(user, now, access_expires_at))?;

        Ok(IssuedTokens {
            access_token,
            access_expires_at,
            refresh_token: generate_refresh_token(),
            refresh_expires_at,
            issued_at: now,
        })
    }

    /// Issue a pair and persist its refresh half.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn issue_and_store(
        &self,
        user: &User,
        options: IssueOptions,
    ) -> Result<IssuedTokens, TokenError> {
        let tokens = self.issue(user, options)?;
        self.store
            .insert_refresh_token(&user.id, &tokens.refresh_token, tokens.refresh_expires_at)
            .await?;
        Ok(tokens)
    }

    /// Check signature and expiry of an access token.
    pub fn verify_access(&self, token: &str) -> Result<TokenClaims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;

        decode::<AccessClaims>(token, &self.dec_key, &validation)
            .map(|data| data.claims.into())
            .map_err(|_| TokenError::Invalid)
    }

    /// Resolve a refresh token to the user it belongs to.
    #[instrument(skip(self, token))]
    pub async fn verify_refresh(&self, token: &str) -> Result<String, TokenError> {
        let record = self
            .store
            .find_active_refresh_token(token)
            .await?
            .ok_or(TokenError::Invalid)?;

        if !record.is_active(Utc::now().timestamp()) {
            return Err(TokenError::Invalid);
        }

        Ok(record.user_id)
    }

    /// Exchange a live refresh token for a brand-new pair.
    ///  1. `old` must be active and belong to `user`
    ///  2. `old` is revoked and the new refresh token stored in one step
    ///  3. losing a concurrent rotation yields `Invalid`
    #[instrument(skip(self, old, user), fields(user_id = %user.id))]
    pub async fn rotate(&self, old: &str, user: &User) -> Result<IssuedTokens, TokenError> {
        let owner = self.verify_refresh(old).await?;
        if owner != user.id {
            warn!("Refresh token presented for a different user");
            return Err(TokenError::Invalid);
        }

        let tokens = self.issue(user, IssueOptions::default())?;
        let rotated = self
            .store
            .rotate_refresh_token(
                old,
                &user.id,
                &tokens.refresh_token,
                tokens.refresh_expires_at,
                tokens.issued_at,
            )
            .await?;

        if !rotated {
            return Err(TokenError::Invalid);
        }

        info!("Refresh token rotated");
        Ok(tokens)
    }

    /// Revoke a refresh token. Unknown and already revoked tokens are fine.
    #[instrument(skip(self, token))]
    pub async fn revoke(&self, token: &str) -> Result<(), TokenError> {
        self.store.revoke_refresh_token(token).await?;
        Ok(())
    }

    /// Revoke every active refresh token of a user.
    #[instrument(skip(self))]
    pub async fn revoke_all(&self, user_id: &str) -> Result<u64, TokenError> {
        Ok(self.store.revoke_user_refresh_tokens(user_id).await?)
    }

    /* ---------- PRIVATE HELPERS ---------- */

    fn create_jwt<T: serde::Serialize>(&self, claims: &T) -> Result<String, TokenError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.enc_key).map_err(TokenError::Signing)
    }
}

fn generate_refresh_token() -> String {
    let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
