use bcrypt::{hash, verify, DEFAULT_COST};
use std::fmt;
use std::sync::{Arc, OnceLock};
use tracing::{info, instrument, warn};

use crate::db::{CredentialStore, StoreError};
use crate::models::jwt::{IssueOptions, IssuedTokens};
use crate::models::user::{NewUser, User, UserRole};
use crate::services::token_service::{TokenError, TokenManager};

const MIN_PASSWORD_LENGTH: usize = 8;
const PLACEHOLDER_PASSWORD: &str = "campaign-auth-placeholder-password";

pub struct AuthService<S> {
    store: Arc<S>,
    tokens: TokenManager<S>,
}

impl<S> Clone for AuthService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            tokens: self.tokens.clone(),
        }
    }
}

#[derive(Debug)]
pub enum AuthError {
    InvalidCredentials,
    EmailTaken,
    Validation(String),
    PasswordHashError,
    Token(TokenError),
    Store(StoreError),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::InvalidCredentials => write!(f, "invalid email or password"),
            AuthError::EmailTaken => write!(f, "email is already registered"),
            AuthError::Validation(msg) => write!(f, "{}", msg),
            AuthError::PasswordHashError => write!(f, "failed to process password"),
            AuthError::Token(e) => write!(f, "{}", e),
            AuthError::Store(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for AuthError {}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        AuthError::Store(err)
    }
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        AuthError::Token(err)
    }
}

/// Hash verified against when the email is unknown, so that login costs one
/// bcrypt check whether or not the account exists.
fn placeholder_hash() -> Result<&'static str, AuthError> {
    static HASH: OnceLock<Option<String>> = OnceLock::new();
    HASH.get_or_init(|| hash(PLACEHOLDER_PASSWORD, DEFAULT_COST).ok())
        .as_deref()
        .ok_or(AuthError::PasswordHashError)
}

fn check_password(password: &str, stored_hash: Option<&str>) -> Result<bool, AuthError> {
    match stored_hash {
        Some(stored) => verify(password, stored).map_err(|_| AuthError::PasswordHashError),
        None => {
            verify(password, placeholder_hash()?).map_err(|_| AuthError::PasswordHashError)?;
            Ok(false)
        }
    }
}

impl<S: CredentialStore> AuthService<S> {
    pub fn new(store: Arc<S>, tokens: TokenManager<S>) -> Self {
        // Pay for the placeholder hash up front rather than on the first unknown email.
        if placeholder_hash().is_err() {
            warn!("Failed to prepare placeholder password hash");
        }
        Self { store, tokens }
    }

    #[instrument(skip(self, password))]
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
        remember_me: bool,
    ) -> Result<(User, IssuedTokens), AuthError> {
        let name = name.trim();
        let email = email.trim();
        if name.is_empty() {
            return Err(AuthError::Validation("name is required".to_string()));
        }
        if !email.contains('@') {
            return Err(AuthError::Validation("a valid email is required".to_string()));
        }
        if password.len() < MIN_PASSWORD_LENGTH {
            return Err(AuthError::Validation(format!(
                "password must be at least {} characters",
                MIN_PASSWORD_LENGTH
            )));
        }

        let password_hash = hash(password, DEFAULT_COST).map_err(|_| AuthError::PasswordHashError)?;

        let user = self
            .store
            .insert_user(NewUser {
                email: email.to_string(),
                password_hash,
                name: name.to_string(),
                role: UserRole::Marketing,
            })
            .await
            .map_err(|e| match e {
                StoreError::Conflict => AuthError::EmailTaken,
                other => AuthError::Store(other),
            })?;

        let tokens = self
            .tokens
            .issue_and_store(&user, IssueOptions::remember(remember_me))
            .await?;

        info!(user_id = %user.id, role = %user.role, "User registered");
        Ok((user, tokens))
    }

    #[instrument(skip(self, password))]
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        remember_me: bool,
    ) -> Result<(User, IssuedTokens), AuthError> {
        let user = self.store.find_user_by_email(email).await?;

        let password_matches =
            check_password(password, user.as_ref().map(|u| u.password_hash.as_str()))?;

        let user = match user {
            Some(user) if password_matches => user,
            Some(user) => {
                warn!(user_id = %user.id, "Login with wrong password");
                return Err(AuthError::InvalidCredentials);
            }
            None => {
                warn!("Login for unknown email");
                return Err(AuthError::InvalidCredentials);
            }
        };

        let tokens = self
            .tokens
            .issue_and_store(&user, IssueOptions::remember(remember_me))
            .await?;

        info!(user_id = %user.id, role = %user.role, remember_me, "User logged in");
        Ok((user, tokens))
    }

    #[instrument(skip(self, refresh_token))]
    pub async fn refresh(&self, refresh_token: &str) -> Result<(User, IssuedTokens), AuthError> {
        let user_id = self.tokens.verify_refresh(refresh_token).await?;

        let user = self
            .store
            .find_user_by_id(&user_id)
            .await?
            .ok_or(AuthError::Token(TokenError::Invalid))?;

        let tokens = self.tokens.rotate(refresh_token, &user).await?;
        Ok((user, tokens))
    }

    #[instrument(skip(self, refresh_token))]
    pub async fn logout(&self, refresh_token: Option<&str>) -> Result<(), AuthError> {
        if let Some(token) = refresh_token {
            self.tokens.revoke(token).await?;
        }
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn logout_all(&self, user_id: &str) -> Result<u64, AuthError> {
        let count = self.tokens.revoke_all(user_id).await?;
        info!(user_id = %user_id, count, "Signed out of all sessions");
        Ok(count)
    }

    #[instrument(skip(self, access_token))]
    pub async fn current_user(&self, access_token: &str) -> Result<User, AuthError> {
        let claims = self.tokens.verify_access(access_token)?;

        // Find user by ID
        let user = self
            .store
            .find_user_by_id(&claims.user_id)
            .await?
            .ok_or(AuthError::Token(TokenError::Invalid))?;

        Ok(user)
    }
}
