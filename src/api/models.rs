use axum::{Json, extract::State};
use serde_json::Value;
use std::sync::Arc;

use super::{ApiError, AppState};

/// GET /models
pub async fn list_models(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Value>>, ApiError> {
    let models = state.users().available_models().await?;
    Ok(Json(models))
}
