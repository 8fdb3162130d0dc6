use axum::{
    extract::{Extension, State},
    Json,
};
use serde::Serialize;
use tower_cookies::Cookies;

use crate::{
    api::ApiError,
    middleware::auth::CurrentUser,
    models::user::UserResponse,
    AppState,
};

#[derive(Serialize)]
pub struct LogoutAllResponse {
    message: &'static str,
    revoked: u64,
}

pub async fn get_current_user(Extension(current_user): Extension<CurrentUser>) -> Json<UserResponse> {
    Json(UserResponse::from(&current_user.0))
}

pub async fn logout_all(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    cookies: Cookies,
) -> Result<Json<LogoutAllResponse>, ApiError> {
    let revoked = state.auth.logout_all(&current_user.0.id).await?;

    state.cookies.clear_auth_cookies(&cookies);

    Ok(Json(LogoutAllResponse {
        message: "Signed out of all sessions",
        revoked,
    }))
}
