//! Domain service for managed users and their access keys.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::clients::litellm::LiteLlmError;
use crate::db::ManagedUser;
use crate::domain::events::id_list;

#[derive(Debug, Error)]
pub enum UserError {
    #[error("User not found")]
    NotFound(String),

    #[error("User ID already exists: {}", id_list(.0))]
    AlreadyExists(Vec<String>),

    #[error("Duplicate user IDs in request: {}", id_list(.0))]
    DuplicateInRequest(Vec<String>),

    #[error("Users not found: {}", id_list(.0))]
    UsersNotFound(Vec<String>),

    #[error("{0}")]
    Validation(String),

    #[error("Key provisioning failed: {0}")]
    Gateway(String),

    #[error("Database error: {0}")]
    Database(String),
}

/// Store failures arrive as `anyhow` errors from the repositories.
impl From<anyhow::Error> for UserError {
    fn from(err: anyhow::Error) -> Self {
        Self::Database(format!("{err:#}"))
    }
}

impl From<LiteLlmError> for UserError {
    fn from(err: LiteLlmError) -> Self {
        Self::Gateway(err.to_string())
    }
}

/// A user to create. The key is provisioned by the service.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUser {
    pub user_id: String,
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default)]
    pub extra_info: Option<String>,
    #[serde(default)]
    pub allowed_models: Vec<String>,
    #[serde(default)]
    pub allowed_services: Vec<String>,
}

/// Partial update; absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserUpdate {
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default)]
    pub extra_info: Option<String>,
    #[serde(default)]
    pub allowed_models: Option<Vec<String>>,
    #[serde(default)]
    pub allowed_services: Option<Vec<String>>,
    /// Renames the key on the gateway. Ignored with local keys.
    #[serde(default)]
    pub key_alias: Option<String>,
}

#[async_trait::async_trait]
pub trait UserService: Send + Sync {
    async fn list_users(&self, organization: Option<&str>) -> Result<Vec<ManagedUser>, UserError>;

    async fn get_user(&self, user_id: &str) -> Result<ManagedUser, UserError>;

    /// Creates every user or none.
    ///
    /// # Errors
    ///
    /// Returns [`UserError::DuplicateInRequest`] or [`UserError::AlreadyExists`]
    /// before anything is provisioned, and [`UserError::Gateway`] after
    /// revoking any keys already issued when provisioning fails.
    async fn create_users(
        &self,
        admin: &str,
        users: Vec<CreateUser>,
    ) -> Result<Vec<ManagedUser>, UserError>;

    async fn update_user(
        &self,
        admin: &str,
        user_id: &str,
        update: UserUpdate,
    ) -> Result<ManagedUser, UserError>;

    /// Deletes the users and revokes their keys. Returns the deleted ids.
    ///
    /// # Errors
    ///
    /// Returns [`UserError::UsersNotFound`] without deleting anything if any
    /// id is unknown.
    async fn delete_users(&self, admin: &str, user_ids: Vec<String>)
    -> Result<Vec<String>, UserError>;

    async fn get_key(&self, user_id: &str) -> Result<String, UserError>;

    /// `(user_id, key)` for the ids that exist, in request order.
    async fn get_keys(&self, user_ids: &[String]) -> Result<Vec<(String, String)>, UserError>;

    async fn key_models(&self, user_id: &str) -> Result<Vec<String>, UserError>;

    /// Gateway model entries, passed through as returned.
    async fn available_models(&self) -> Result<Vec<Value>, UserError>;
}
