use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::validation::{normalize_names, validate_organization, validate_user_id};
use super::{ApiError, AppState, UserDto};
use crate::services::{AdminIdentity, CreateUser, UserError, UserUpdate};

impl From<UserError> for ApiError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::NotFound(_) | UserError::UsersNotFound(_) => Self::NotFound(err.to_string()),
            UserError::AlreadyExists(_)
            | UserError::DuplicateInRequest(_)
            | UserError::Validation(_) => Self::validation(err.to_string()),
            UserError::Gateway(msg) => Self::litellm_error(msg),
            UserError::Database(msg) => Self::DatabaseError(msg),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    pub organization: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BatchCreateRequest {
    pub users: Vec<CreateUser>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteUsersRequest {
    pub user_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct DeleteUsersResponse {
    pub msg: String,
    pub deleted: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct KeyModelsResponse {
    pub user_id: String,
    pub models: Vec<String>,
}

fn normalize_create(user: CreateUser) -> Result<CreateUser, ApiError> {
    Ok(CreateUser {
        user_id: validate_user_id(&user.user_id)?.to_string(),
        organization: validate_organization(user.organization)?,
        allowed_models: normalize_names("Model", &user.allowed_models)?,
        allowed_services: normalize_names("Service", &user.allowed_services)?,
        ..user
    })
}

fn normalize_update(update: UserUpdate) -> Result<UserUpdate, ApiError> {
    Ok(UserUpdate {
        organization: validate_organization(update.organization)?,
        allowed_models: update
            .allowed_models
            .map(|names| normalize_names("Model", &names))
            .transpose()?,
        allowed_services: update
            .allowed_services
            .map(|names| normalize_names("Service", &names))
            .transpose()?,
        ..update
    })
}

/// GET /users
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListUsersQuery>,
) -> Result<Json<Vec<UserDto>>, ApiError> {
    let organization = query
        .organization
        .as_deref()
        .map(str::trim)
        .filter(|org| !org.is_empty());

    let users = state.users().list_users(organization).await?;
    Ok(Json(users.into_iter().map(UserDto::from).collect()))
}

/// GET /users/{user_id}
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<UserDto>, ApiError> {
    let user = state.users().get_user(&user_id).await?;
    Ok(Json(user.into()))
}

/// POST /users
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AdminIdentity>,
    Json(payload): Json<CreateUser>,
) -> Result<Json<UserDto>, ApiError> {
    let user = normalize_create(payload)?;

    let created = state
        .users()
        .create_users(&admin.username, vec![user])
        .await
        .map_err(|e| match e {
            // Single creates name no ids; only the batch route lists them.
            UserError::AlreadyExists(_) => ApiError::validation("User ID already exists"),
            other => other.into(),
        })?
        .pop()
        .ok_or_else(|| ApiError::internal("User creation returned no rows"))?;

    Ok(Json(created.into()))
}

/// POST /users/batch
pub async fn create_users_batch(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AdminIdentity>,
    Json(payload): Json<BatchCreateRequest>,
) -> Result<Json<Vec<UserDto>>, ApiError> {
    let users = payload
        .users
        .into_iter()
        .map(normalize_create)
        .collect::<Result<Vec<_>, _>>()?;

    let created = state.users().create_users(&admin.username, users).await?;
    Ok(Json(created.into_iter().map(UserDto::from).collect()))
}

/// PUT /users/{user_id}
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AdminIdentity>,
    Path(user_id): Path<String>,
    Json(payload): Json<UserUpdate>,
) -> Result<Json<UserDto>, ApiError> {
    let update = normalize_update(payload)?;

    let updated = state
        .users()
        .update_user(&admin.username, &user_id, update)
        .await?;

    Ok(Json(updated.into()))
}

/// DELETE /users
pub async fn delete_users(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AdminIdentity>,
    Json(payload): Json<DeleteUsersRequest>,
) -> Result<Json<DeleteUsersResponse>, ApiError> {
    let user_ids: Vec<String> = payload
        .user_ids
        .iter()
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .collect();

    let deleted = state.users().delete_users(&admin.username, user_ids).await?;

    Ok(Json(DeleteUsersResponse {
        msg: format!("Deleted {} user(s)", deleted.len()),
        deleted,
    }))
}

/// GET /users/{user_id}/key-models
pub async fn get_key_models(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<KeyModelsResponse>, ApiError> {
    let models = state.users().key_models(&user_id).await?;
    Ok(Json(KeyModelsResponse { user_id, models }))
}
