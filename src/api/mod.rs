use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::db::Store;
use crate::services::{AuthService, UserService};
use crate::state::SharedState;

mod assets;
pub mod auth;
mod error;
mod event_logs;
mod health;
mod keys;
mod models;
mod observability;
mod types;
mod users;
mod validation;

pub use error::ApiError;
pub use types::*;

use metrics_exporter_prometheus::PrometheusHandle;

#[derive(Clone)]
pub struct AppState {
    pub shared: Arc<SharedState>,

    pub start_time: std::time::Instant,

    pub prometheus_handle: Option<PrometheusHandle>,
}

impl AppState {
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    #[must_use]
    pub fn store(&self) -> &Store {
        &self.shared.store
    }

    #[must_use]
    pub fn auth(&self) -> &Arc<dyn AuthService> {
        &self.shared.auth_service
    }

    #[must_use]
    pub fn users(&self) -> &Arc<dyn UserService> {
        &self.shared.user_service
    }
}

#[must_use]
pub fn create_app_state(
    shared: Arc<SharedState>,
    prometheus_handle: Option<PrometheusHandle>,
) -> Arc<AppState> {
    Arc::new(AppState {
        shared,
        start_time: std::time::Instant::now(),
        prometheus_handle,
    })
}

pub async fn create_app_state_from_config(
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let shared = Arc::new(SharedState::new(config).await?);
    Ok(create_app_state(shared, prometheus_handle))
}

pub fn router(state: Arc<AppState>) -> Router {
    let (static_dir, cors_origins) = {
        let config = state.config();
        (
            config.server.static_dir.clone(),
            config.server.cors_allowed_origins.clone(),
        )
    };

    let api_router = Router::new()
        .merge(create_admin_router(state.clone()))
        .merge(create_server_key_router(state.clone()))
        .route("/login", post(auth::login))
        .route("/health", get(health::health))
        .route("/health/ready", get(health::health_ready))
        .with_state(state);

    let cors_layer = if cors_origins.iter().any(|origin| origin == "*") {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    api_router
        .nest_service("/static", assets::static_service(&static_dir))
        .fallback_service(assets::spa_service(&static_dir))
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(middleware::from_fn(observability::security_headers_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(observability::request_log_middleware))
}

/// Routes that require an admin bearer token.
fn create_admin_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/me", get(auth::me))
        .route("/change-password", post(auth::change_password))
        .route("/create-admin", post(auth::create_admin))
        .route("/set-admin-password", post(auth::set_admin_password))
        .route(
            "/users",
            get(users::list_users)
                .post(users::create_user)
                .delete(users::delete_users),
        )
        .route("/users/batch", post(users::create_users_batch))
        .route(
            "/users/{user_id}",
            get(users::get_user).put(users::update_user),
        )
        .route("/users/{user_id}/key-models", get(users::get_key_models))
        .route("/models", get(models::list_models))
        .route("/event-logs", get(event_logs::list_event_logs))
        .route("/metrics", get(observability::get_metrics))
        .route_layer(middleware::from_fn_with_state(state, auth::require_admin))
}

/// Routes used by downstream services holding the static server API key.
fn create_server_key_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/key/{user_id}", get(keys::get_user_key))
        .route("/key/info", post(keys::get_keys))
        .route_layer(middleware::from_fn_with_state(
            state,
            auth::require_server_api_key,
        ))
}
