#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use mama::api::AppState;
use mama::config::Config;
use mama::db::{EventLog, EventLogFilter};
use serde_json::Value;
use tower::ServiceExt;

pub const SERVER_KEY: &str = "test-server-api-key";
pub const ROOT_USER: &str = "root";
pub const ROOT_PASSWORD: &str = "root-password";

pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    db_path: PathBuf,
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.db_path);
    }
}

/// Config pointing at a fresh SQLite file, with cheap password hashing.
pub fn test_config() -> (Config, PathBuf) {
    let db_path = std::env::temp_dir().join(format!("mama-test-{}.db", uuid::Uuid::new_v4()));

    let mut config = Config::default();
    config.general.database_url = format!("sqlite://{}?mode=rwc", db_path.display());
    config.auth.jwt_secret = "test-jwt-secret".to_string();
    config.auth.server_api_key = SERVER_KEY.to_string();
    config.auth.bootstrap_admin_username = ROOT_USER.to_string();
    config.auth.bootstrap_admin_password = ROOT_PASSWORD.to_string();
    config.security.argon2_memory_cost_kib = 1024;
    config.security.argon2_time_cost = 1;
    config.server.static_dir = std::env::temp_dir()
        .join("mama-test-static-missing")
        .display()
        .to_string();

    (config, db_path)
}

pub async fn spawn_app() -> TestApp {
    let (config, db_path) = test_config();
    spawn_app_with(config, db_path).await
}

pub async fn spawn_app_with(config: Config, db_path: PathBuf) -> TestApp {
    let state = mama::api::create_app_state_from_config(config, None)
        .await
        .expect("Failed to create app state");

    state
        .shared
        .auth_service
        .ensure_bootstrap_admin()
        .await
        .expect("Failed to create bootstrap admin");

    TestApp {
        router: mama::api::router(state.clone()),
        state,
        db_path,
    }
}

pub fn get(uri: &str, auth: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    builder.body(Body::empty()).unwrap()
}

pub fn json_request(method: &str, uri: &str, auth: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    builder
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }

    pub async fn login(&self, username: &str, password: &str) -> (StatusCode, Value) {
        let form = format!("username={username}&password={password}");
        let request = Request::builder()
            .method("POST")
            .uri("/login")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(form))
            .unwrap();
        self.send(request).await
    }

    /// Bearer header value for the given admin.
    pub async fn auth_header(&self, username: &str, password: &str) -> String {
        let (status, body) = self.login(username, password).await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        bearer(body["access_token"].as_str().unwrap())
    }

    pub async fn root_auth(&self) -> String {
        self.auth_header(ROOT_USER, ROOT_PASSWORD).await
    }

    /// Creates a regular admin directly in the store and returns its bearer header.
    pub async fn regular_admin_auth(&self, username: &str) -> String {
        let password = "regular-password";
        self.state
            .store()
            .create_admin(username, password, false, &self.state.config().security)
            .await
            .unwrap()
            .expect("admin already exists");
        self.auth_header(username, password).await
    }

    pub async fn create_user(&self, auth: &str, body: Value) -> (StatusCode, Value) {
        self.send(json_request("POST", "/users", Some(auth), &body))
            .await
    }

    /// Waits until the audit listener has persisted at least `expected` matching rows.
    pub async fn wait_for_events(&self, filter: &EventLogFilter, expected: usize) -> Vec<EventLog> {
        for _ in 0..100 {
            let logs = self
                .state
                .store()
                .query_event_logs(filter, 2000)
                .await
                .unwrap();
            if logs.len() >= expected {
                return logs;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("timed out waiting for {expected} event logs matching {filter:?}");
    }
}
