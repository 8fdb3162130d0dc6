use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_cookies::CookieManagerLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod api;
mod cleanup;
mod config;
mod db;
mod middleware;
mod models;
mod services;
#[cfg(test)]
mod tests;

use config::Config;
use db::SqliteStore;
use services::{auth_service::AuthService, cookie_service::CookieService, token_service::TokenManager};

#[derive(Clone)]
pub struct AppState {
    pub auth: AuthService<SqliteStore>,
    pub cookies: CookieService,
}

impl AppState {
    pub fn new(pool: SqlitePool, config: &Config) -> Self {
        let store = Arc::new(SqliteStore::new(pool));
        let tokens = TokenManager::new(store.clone(), &config.jwt_secret, config.ttls);

        Self {
            auth: AuthService::new(store, tokens),
            cookies: CookieService::new(config.secure_cookies),
        }
    }
}

#[derive(Serialize)]
struct Message {
    message: String,
}

async fn health() -> Json<Message> {
    Json(Message {
        message: "campaign-auth is running".to_string(),
    })
}

pub fn create_router(state: AppState) -> Router {
    // Create a CORS layer
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let protected = Router::new()
        .route("/me", get(api::user::get_current_user))
        .route("/logout/all", post(api::user::logout_all))
        .route_layer(from_fn_with_state(state.clone(), middleware::auth::auth_middleware));

    Router::new()
        .route("/", get(health))
        .route("/register", post(api::auth::register))
        .route("/login", post(api::auth::login))
        .route("/refresh", post(api::auth::refresh))
        .route("/logout", post(api::auth::logout))
        .merge(protected)
        .layer(CookieManagerLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("campaign_auth=info,tower_http=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() {
    init_tracing();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            std::process::exit(1);
        }
    };
    info!(?config, "Configuration loaded");

    let pool = match db::create_db_pool(&config.database_url).await {
        Ok(pool) => pool,
        Err(e) => {
            error!(error = %e, "Failed to open database");
            std::process::exit(1);
        }
    };

    let cleanup = cleanup::spawn_cleanup_scheduler(SqliteStore::new(pool.clone()));

    let app = create_router(AppState::new(pool.clone(), &config));

    let listener = match tokio::net::TcpListener::bind(&config.bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(address = %config.bind_addr, error = %e, "Failed to bind");
            std::process::exit(1);
        }
    };
    info!(address = %config.bind_addr, "listening");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!(error = %e, "Server error");
    }

    cleanup.abort();
    pool.close().await;
    info!("Shut down cleanly");
}
