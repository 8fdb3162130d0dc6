use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use crate::services::{auth_service::AuthError, token_service::TokenError};

pub mod auth;
pub mod user;

/// HTTP face of an [`AuthError`].
#[derive(Debug)]
pub struct ApiError(pub AuthError);

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError(err)
    }
}

impl ApiError {
    fn status_and_message(&self) -> (StatusCode, String) {
        match &self.0 {
            AuthError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, "Invalid email or password".to_string())
            }
            AuthError::Token(TokenError::Invalid) => {
                (StatusCode::UNAUTHORIZED, "Invalid or expired session".to_string())
            }
            AuthError::EmailTaken => (StatusCode::CONFLICT, self.0.to_string()),
            AuthError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AuthError::Store(_) | AuthError::Token(TokenError::StorageUnavailable(_)) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Service temporarily unavailable".to_string(),
            ),
            AuthError::PasswordHashError | AuthError::Token(TokenError::Signing(_)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        if status.is_server_error() {
            error!(error = %self.0, "Request failed");
        }

        (status, Json(json!({ "error": message }))).into_response()
    }
}
