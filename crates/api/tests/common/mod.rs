//! Common test utilities for integration tests.
//!
//! The relay app runs against the in-memory store, so these tests need no
//! external services.

// Not every helper is used by every test binary.
#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request},
    Router,
};
use persistence::MemoryStore;
use relay_api::{
    app::{create_app, Stores},
    config::{Config, DatabaseConfig, LoggingConfig, SecurityConfig, ServerConfig},
};

pub const TEST_CLIENT_KEY: &str = "integration-test-key";

/// Test configuration using the in-memory store and one client key.
pub fn test_config() -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            request_timeout_secs: 30,
            max_body_size: 65_536,
        },
        database: DatabaseConfig {
            url: "memory://".to_string(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout_secs: 10,
            idle_timeout_secs: 600,
        },
        logging: LoggingConfig {
            level: "debug".to_string(),
            format: "pretty".to_string(),
        },
        security: SecurityConfig {
            client_keys: vec![TEST_CLIENT_KEY.to_string()],
            cors_origins: vec![],
            rate_limit_per_minute: 0,
        },
    }
}

/// App plus a handle on its store for direct assertions.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
}

pub fn create_test_app(config: Config) -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let router = create_app(config, Stores::from_memory(store.clone()));
    TestApp { router, store }
}

/// Build a POST request with a JSON body and the test client key.
pub fn json_request(uri: &str, body: serde_json::Value) -> Request<Body> {
    json_request_with_key(uri, body, TEST_CLIENT_KEY)
}

pub fn json_request_with_key(uri: &str, body: serde_json::Value, key: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header("X-Client-Id", key)
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

/// Build a POST request without authentication.
pub fn json_request_without_key(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Parse response body as JSON.
pub async fn parse_response_body(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null)
}

/// Location payload in the string-valued shape devices send.
pub fn location_body(instance_id: &str, device_id: &str, lat: f64, lon: f64) -> serde_json::Value {
    serde_json::json!({
        "latitude": lat.to_string(),
        "longitude": lon.to_string(),
        "instanceId": instance_id,
        "deviceId": device_id,
    })
}
