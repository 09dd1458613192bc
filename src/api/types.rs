use serde::{Deserialize, Serialize};

use crate::db::{EventLog, ManagedUser};

/// Error body shared by every failing endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub msg: String,
}

impl MessageResponse {
    pub fn new(msg: impl Into<String>) -> Self {
        Self { msg: msg.into() }
    }
}

#[derive(Debug, Serialize)]
pub struct UserDto {
    pub id: i32,
    pub user_id: String,
    pub organization: Option<String>,
    pub key_value: String,
    pub extra_info: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub allowed_models: Vec<String>,
    pub allowed_services: Vec<String>,
}

impl From<ManagedUser> for UserDto {
    fn from(user: ManagedUser) -> Self {
        Self {
            id: user.id,
            user_id: user.user_id,
            organization: user.organization,
            key_value: user.key_value,
            extra_info: user.extra_info,
            created_at: user.created_at,
            updated_at: user.updated_at,
            allowed_models: user.allowed_models,
            allowed_services: user.allowed_services,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserKeyDto {
    pub user_id: String,
    pub user_key: String,
}

#[derive(Debug, Serialize)]
pub struct EventLogDto {
    pub id: i32,
    pub admin_id: Option<String>,
    pub admin_username: Option<String>,
    pub user_id: Option<String>,
    pub event_type: String,
    pub event_detail: Option<String>,
    pub result: Option<String>,
    pub created_at: String,
}

impl From<EventLog> for EventLogDto {
    fn from(model: EventLog) -> Self {
        Self {
            id: model.id,
            admin_username: model.admin_id.clone(),
            admin_id: model.admin_id,
            user_id: model.user_id,
            event_type: model.event_type,
            event_detail: model.event_detail,
            result: model.result,
            created_at: model.created_at,
        }
    }
}
