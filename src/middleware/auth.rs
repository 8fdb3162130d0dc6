use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use http::header::AUTHORIZATION;
use tower_cookies::Cookies;

use crate::{
    api::ApiError,
    models::user::User,
    services::{auth_service::AuthError, cookie_service::CookieService, token_service::TokenError},
    AppState,
};

#[derive(Clone)]
pub struct CurrentUser(pub User);

pub async fn auth_middleware(
    State(state): State<AppState>,
    cookies: Cookies,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    // Bearer header wins over the cookie
    let token = bearer_token(&request)
        .or_else(|| CookieService::access_token(&cookies))
        .ok_or(ApiError(AuthError::Token(TokenError::Invalid)))?;

    let user = state.auth.current_user(&token).await?;

    // Add the user to request extensions
    request.extensions_mut().insert(CurrentUser(user));

    // Continue with the request
    Ok(next.run(request).await)
}

fn bearer_token(request: &Request<Body>) -> Option<String> {
    request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}
