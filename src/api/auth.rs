use axum::{
    Extension, Form, Json,
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use serde::Deserialize;
use std::sync::Arc;

use super::validation::validate_username;
use super::{ApiError, AppState, MessageResponse};
use crate::services::{AdminIdentity, AuthError, IssuedToken};

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials | AuthError::Validation(_) | AuthError::AdminExists(_) => {
                Self::validation(err.to_string())
            }
            AuthError::InvalidToken | AuthError::InvalidApiKey => {
                Self::Unauthorized(err.to_string())
            }
            AuthError::Forbidden => Self::Forbidden(err.to_string()),
            AuthError::AdminNotFound(_) => Self::NotFound(err.to_string()),
            AuthError::Database(msg) => Self::DatabaseError(msg),
            AuthError::Internal(msg) => Self::internal(msg),
        }
    }
}

// ============================================================================
// Request Types
// ============================================================================

#[derive(Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

#[derive(Deserialize)]
pub struct AdminCreateRequest {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct SetAdminPasswordRequest {
    pub username: String,
    pub new_password: String,
}

// ============================================================================
// Middleware
// ============================================================================

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

/// Requires a valid admin bearer token and exposes the admin as an
/// [`AdminIdentity`] request extension.
pub async fn require_admin(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(request.headers()).ok_or(AuthError::InvalidToken)?;
    let admin = state.auth().authenticate(&token).await?;

    request.extensions_mut().insert(admin.clone());

    let mut response = next.run(request).await;
    // Lets the request log name the acting admin.
    response.extensions_mut().insert(admin);
    Ok(response)
}

/// Requires the static server API key in the `Authorization` header.
pub async fn require_server_api_key(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let presented = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    state.auth().verify_server_api_key(presented)?;

    Ok(next.run(request).await)
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /login
pub async fn login(
    State(state): State<Arc<AppState>>,
    Form(form): Form<LoginForm>,
) -> Result<Json<IssuedToken>, ApiError> {
    let token = state.auth().login(form.username.trim(), &form.password).await?;
    Ok(Json(token))
}

/// GET /me
pub async fn me(Extension(admin): Extension<AdminIdentity>) -> Json<AdminIdentity> {
    Json(admin)
}

/// POST /change-password
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AdminIdentity>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .auth()
        .change_password(&admin, &payload.old_password, &payload.new_password)
        .await?;

    Ok(Json(MessageResponse::new("Password changed successfully")))
}

/// POST /create-admin
pub async fn create_admin(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AdminIdentity>,
    Json(payload): Json<AdminCreateRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let username = validate_username(&payload.username)?;

    let created = state
        .auth()
        .create_admin(&admin, username, &payload.password)
        .await?;

    Ok(Json(MessageResponse::new(format!(
        "Admin '{}' created successfully",
        created.username
    ))))
}

/// POST /set-admin-password
pub async fn set_admin_password(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AdminIdentity>,
    Json(payload): Json<SetAdminPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .auth()
        .set_admin_password(&admin, payload.username.trim(), &payload.new_password)
        .await?;

    Ok(Json(MessageResponse::new(format!(
        "Password updated for admin '{}'",
        payload.username.trim()
    ))))
}
