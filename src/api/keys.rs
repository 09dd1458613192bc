use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{ApiError, AppState, UserKeyDto};

#[derive(Debug, Deserialize)]
pub struct KeyInfoRequest {
    #[serde(default)]
    pub user_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct KeyResponse {
    pub key: String,
}

/// GET /key/{user_id}
pub async fn get_user_key(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<KeyResponse>, ApiError> {
    let key = state.users().get_key(&user_id).await?;
    Ok(Json(KeyResponse { key }))
}

/// POST /key/info
pub async fn get_keys(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<KeyInfoRequest>,
) -> Result<Json<Vec<UserKeyDto>>, ApiError> {
    let keys = state.users().get_keys(&payload.user_ids).await?;

    Ok(Json(
        keys.into_iter()
            .map(|(user_id, user_key)| UserKeyDto { user_id, user_key })
            .collect(),
    ))
}
