use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, HeaderMap},
};
use tower::ServiceExt;
use serde_json::Value;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tracing::{info, Level};
use std::sync::Once;

use crate::config::{Config, TokenTtls};
use crate::{create_router, AppState};

static INIT: Once = Once::new();

pub const TEST_SECRET: &str = "test-secret-key-for-testing-0123456789";

/// Initialize logging exactly once
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_test_writer()
            .with_target(false)
            .with_max_level(Level::ERROR)
            .init();
    });
}

pub async fn setup_test_db() -> SqlitePool {
    init_tracing();
    info!("Setting up test database");

    // A single long-lived connection keeps the in-memory database alive
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create test database");

    // Run migrations
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    info!("Test database setup complete");
    pool
}

pub fn test_config() -> Config {
    Config {
        database_url: "sqlite::memory:".to_string(),
        bind_addr: "127.0.0.1:0".to_string(),
        jwt_secret: TEST_SECRET.as_bytes().to_vec(),
        secure_cookies: false,
        ttls: TokenTtls::default(),
    }
}

pub fn create_test_app(pool: SqlitePool) -> Router {
    info!("Creating test application");
    create_router(AppState::new(pool, &test_config()))
}

pub async fn test_request(
    app: Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
    headers: Option<HeaderMap>,
) -> (StatusCode, String, HeaderMap) {
    info!(method = %method, uri = %uri, "Making test request");

    let body = if let Some(json) = body {
        Body::from(serde_json::to_string(&json).unwrap())
    } else {
        Body::empty()
    };

    let mut request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");

    // Add custom headers if provided
    if let Some(custom_headers) = headers {
        for (key, value) in custom_headers.iter() {
            request = request.header(key, value);
        }
    }

    let request = request.body(body).unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = String::from_utf8(
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    ).unwrap();

    info!(status = %status, body = %body, "Test response received");
    (status, body, headers)
}

/// Collect `name=value` pairs from every non-empty `Set-Cookie` header.
pub fn cookie_pairs(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .get_all("set-cookie")
        .iter()
        .filter_map(|c| c.to_str().ok())
        .filter_map(|c| c.split(';').next())
        .filter_map(|pair| pair.split_once('='))
        .filter(|(_, value)| !value.is_empty())
        .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
        .collect()
}

/// Build a request `cookie` header out of a response's `Set-Cookie` headers.
pub fn cookie_header(headers: &HeaderMap) -> HeaderMap {
    let value = cookie_pairs(headers)
        .into_iter()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect::<Vec<_>>()
        .join("; ");

    let mut out = HeaderMap::new();
    out.insert("cookie", value.parse().unwrap());
    out
}

pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    cookie_pairs(headers)
        .into_iter()
        .find(|(n, _)| n == name)
        .map(|(_, v)| v)
}
