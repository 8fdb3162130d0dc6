use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tower_cookies::Cookies;

use crate::{
    api::ApiError,
    models::user::UserResponse,
    services::{auth_service::AuthError, cookie_service::CookieService, token_service::TokenError},
    AppState,
};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    name: String,
    email: String,
    password: String,
    #[serde(default)]
    remember_me: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    email: String,
    password: String,
    #[serde(default)]
    remember_me: bool,
}

#[derive(Serialize)]
pub struct AuthResponse {
    message: &'static str,
    user: UserResponse,
}

#[derive(Serialize)]
pub struct MessageResponse {
    message: &'static str,
}

pub async fn register(
    State(state): State<AppState>,
    cookies: Cookies,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let (user, tokens) = state
        .auth
        .register(&payload.name, &payload.email, &payload.password, payload.remember_me)
        .await?;

    state.cookies.set_auth_cookies(&cookies, &tokens);

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "Registration successful",
            user: UserResponse::from(&user),
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    cookies: Cookies,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let (user, tokens) = state
        .auth
        .login(&payload.email, &payload.password, payload.remember_me)
        .await?;

    state.cookies.set_auth_cookies(&cookies, &tokens);

    Ok(Json(AuthResponse {
        message: "Login successful",
        user: UserResponse::from(&user),
    }))
}

pub async fn refresh(
    State(state): State<AppState>,
    cookies: Cookies,
) -> Result<Json<AuthResponse>, ApiError> {
    let Some(refresh_token) = CookieService::refresh_token(&cookies) else {
        state.cookies.clear_auth_cookies(&cookies);
        return Err(ApiError(AuthError::Token(TokenError::Invalid)));
    };

    match state.auth.refresh(&refresh_token).await {
        Ok((user, tokens)) => {
            state.cookies.set_auth_cookies(&cookies, &tokens);
            Ok(Json(AuthResponse {
                message: "Tokens refreshed successfully",
                user: UserResponse::from(&user),
            }))
        }
        Err(err @ AuthError::Token(TokenError::Invalid)) => {
            state.cookies.clear_auth_cookies(&cookies);
            Err(err.into())
        }
        Err(err) => Err(err.into()),
    }
}

pub async fn logout(
    State(state): State<AppState>,
    cookies: Cookies,
) -> Result<Json<MessageResponse>, ApiError> {
    let refresh_token = CookieService::refresh_token(&cookies);
    state.auth.logout(refresh_token.as_deref()).await?;

    state.cookies.clear_auth_cookies(&cookies);

    Ok(Json(MessageResponse {
        message: "Logged out",
    }))
}
