// src/models/jwt.rs
use serde::{Deserialize, Serialize};

use crate::models::user::{User, UserRole};

/// Claims carried inside a signed access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: String,    // user id
    pub email: String,
    pub name: String,
    pub role: UserRole,
    pub iat: i64,       // issued at
    pub exp: i64,       // expiration time
}

impl AccessClaims {
    pub fn new(user: &User, issued_at: i64, expires_at: i64) -> Self {
        Self {
            sub: user.id.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
            iat: issued_at,
            exp: expires_at,
        }
    }
}

/// Identity recovered from a verified access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenClaims {
    pub user_id: String,
    pub email: String,
    pub name: String,
    pub role: UserRole,
}

impl From<AccessClaims> for TokenClaims {
    fn from(claims: AccessClaims) -> Self {
        Self {
            user_id: claims.sub,
            email: claims.email,
            name: claims.name,
            role: claims.role,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IssueOptions {
    pub remember_me: bool,
}

impl IssueOptions {
    pub fn remember(remember_me: bool) -> Self {
        Self { remember_me }
    }
}

/// A freshly minted token pair. All timestamps are unix seconds.
#[derive(Debug, Clone)]
pub struct IssuedTokens {
    pub access_token: String,
    pub access_expires_at: i64,
    pub refresh_token: String,
    pub refresh_expires_at: i64,
    pub issued_at: i64,
}

/// Persisted state of a refresh token, as returned by the credential store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshTokenRecord {
    pub user_id: String,
    pub expires_at: i64,
    pub revoked: bool,
}

impl RefreshTokenRecord {
    pub fn is_active(&self, now: i64) -> bool {
        !self.revoked && now <= self.expires_at
    }
}
