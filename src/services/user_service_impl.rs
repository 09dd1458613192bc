//! `SeaORM` implementation of the `UserService` trait.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, warn};

use crate::db::{ManagedUser, NewUser, Store, UserChanges};
use crate::domain::events::{AuditEvent, EventType, id_list};
use crate::services::audit::AuditLog;
use crate::services::key_provisioner::KeyProvisioner;
use crate::services::user_service::{CreateUser, UserError, UserService, UserUpdate};

pub struct SeaOrmUserService {
    store: Store,
    audit: AuditLog,
    keys: Arc<dyn KeyProvisioner>,
}

impl SeaOrmUserService {
    #[must_use]
    pub fn new(store: Store, audit: AuditLog, keys: Arc<dyn KeyProvisioner>) -> Self {
        Self { store, audit, keys }
    }

    fn record_failure(
        &self,
        event_type: EventType,
        admin: &str,
        user_ids: &[String],
        detail: impl Into<String>,
    ) {
        self.audit.record(
            AuditEvent::failure(event_type, detail)
                .by(admin)
                .for_single_user(user_ids),
        );
    }

    /// Revokes keys issued during a failed operation. Failures are only logged.
    async fn revoke_all(&self, keys: &[String]) {
        if !self.keys.is_remote() {
            return;
        }
        for key in keys {
            if let Err(e) = self.keys.revoke(key).await {
                warn!(error = %e, "Failed to revoke gateway key");
            }
        }
    }
}

/// Ids appearing more than once, in first-seen order.
fn repeated_ids(ids: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut repeated = Vec::new();
    for id in ids {
        if !seen.insert(id.as_str()) && !repeated.contains(id) {
            repeated.push(id.clone());
        }
    }
    repeated
}

#[async_trait]
impl UserService for SeaOrmUserService {
    async fn list_users(&self, organization: Option<&str>) -> Result<Vec<ManagedUser>, UserError> {
        Ok(self.store.list_users(organization).await?)
    }

    async fn get_user(&self, user_id: &str) -> Result<ManagedUser, UserError> {
        self.store
            .get_user(user_id)
            .await?
            .ok_or_else(|| UserError::NotFound(user_id.to_string()))
    }

    async fn create_users(
        &self,
        admin: &str,
        users: Vec<CreateUser>,
    ) -> Result<Vec<ManagedUser>, UserError> {
        if users.is_empty() {
            self.record_failure(
                EventType::UserCreate,
                admin,
                &[],
                "Failed to create users - no users provided",
            );
            return Err(UserError::Validation("No users provided".to_string()));
        }

        let ids: Vec<String> = users.iter().map(|u| u.user_id.clone()).collect();

        let repeated = repeated_ids(&ids);
        if !repeated.is_empty() {
            self.audit.record(
                AuditEvent::failure(
                    EventType::UserCreate,
                    format!("Failed to create users - duplicates in request: {}", id_list(&repeated)),
                )
                .by(admin)
                .for_single_user(&repeated),
            );
            return Err(UserError::DuplicateInRequest(repeated));
        }

        let existing = self.store.find_existing_user_ids(&ids).await?;
        if !existing.is_empty() {
            self.audit.record(
                AuditEvent::failure(
                    EventType::UserCreate,
                    format!("Failed to create users - duplicates found: {}", id_list(&existing)),
                )
                .by(admin)
                .for_single_user(&existing),
            );
            return Err(UserError::AlreadyExists(existing));
        }

        let mut new_users = Vec::with_capacity(users.len());
        for user in users {
            match self.keys.provision(&user.user_id, &user.allowed_models).await {
                Ok(key_value) => new_users.push(NewUser {
                    user_id: user.user_id,
                    organization: user.organization,
                    key_value,
                    extra_info: user.extra_info,
                    allowed_models: user.allowed_models,
                    allowed_services: user.allowed_services,
                }),
                Err(e) => {
                    let issued: Vec<String> = new_users.iter().map(|u| u.key_value.clone()).collect();
                    self.revoke_all(&issued).await;
                    self.audit.record(
                        AuditEvent::failure(
                            EventType::UserCreate,
                            format!("Failed to create users - key provisioning failed for {}: {e}", user.user_id),
                        )
                        .by(admin)
                        .for_single_user(&ids),
                    );
                    return Err(e.into());
                }
            }
        }

        let created = match self.store.create_users(&new_users).await {
            Ok(created) => created,
            Err(e) => {
                let issued: Vec<String> = new_users.iter().map(|u| u.key_value.clone()).collect();
                self.revoke_all(&issued).await;
                self.audit.record(
                    AuditEvent::failure(
                        EventType::UserCreate,
                        format!("Failed to create users {}: {e}", id_list(&ids)),
                    )
                    .by(admin)
                    .for_single_user(&ids),
                );
                return Err(e.into());
            }
        };

        info!(count = created.len(), admin, "Created users");
        self.audit.record(
            AuditEvent::success(
                EventType::UserCreate,
                format!("Users created successfully: {}", id_list(&ids)),
            )
            .by(admin)
            .for_single_user(&ids),
        );

        Ok(created)
    }

    async fn update_user(
        &self,
        admin: &str,
        user_id: &str,
        update: UserUpdate,
    ) -> Result<ManagedUser, UserError> {
        let Some(current) = self.store.get_user(user_id).await? else {
            self.audit.record(
                AuditEvent::failure(
                    EventType::UserUpdate,
                    format!("Failed to update user - user not found: {user_id}"),
                )
                .by(admin)
                .for_user(user_id),
            );
            return Err(UserError::NotFound(user_id.to_string()));
        };

        if self.keys.is_remote() {
            let gateway_result = async {
                if let Some(models) = &update.allowed_models
                    && *models != current.allowed_models
                {
                    self.keys.update_models(&current.key_value, models).await?;
                }
                if let Some(alias) = &update.key_alias {
                    self.keys.update_alias(&current.key_value, alias).await?;
                }
                Ok::<_, crate::clients::litellm::LiteLlmError>(())
            }
            .await;

            if let Err(e) = gateway_result {
                self.audit.record(
                    AuditEvent::failure(
                        EventType::UserUpdate,
                        format!("Failed to update user {user_id} - gateway error: {e}"),
                    )
                    .by(admin)
                    .for_user(user_id),
                );
                return Err(e.into());
            }
        }

        let changes = UserChanges {
            organization: update.organization,
            extra_info: update.extra_info,
            allowed_models: update.allowed_models,
            allowed_services: update.allowed_services,
        };

        let updated = match self.store.update_user(user_id, &changes).await {
            Ok(Some(updated)) => updated,
            Ok(None) => {
                self.record_failure(
                    EventType::UserUpdate,
                    admin,
                    &[user_id.to_string()],
                    format!("Failed to update user - user not found: {user_id}"),
                );
                return Err(UserError::NotFound(user_id.to_string()));
            }
            Err(e) => {
                if self.keys.is_remote() {
                    warn!(
                        user_id,
                        "Gateway key was updated but the stored user was not; they are out of step"
                    );
                }
                self.record_failure(
                    EventType::UserUpdate,
                    admin,
                    &[user_id.to_string()],
                    format!("Failed to update user {user_id}: {e:#}"),
                );
                return Err(e.into());
            }
        };

        self.audit.record(
            AuditEvent::success(
                EventType::UserUpdate,
                format!("User updated successfully: {user_id}"),
            )
            .by(admin)
            .for_user(user_id),
        );

        Ok(updated)
    }

    async fn delete_users(
        &self,
        admin: &str,
        user_ids: Vec<String>,
    ) -> Result<Vec<String>, UserError> {
        if user_ids.is_empty() {
            self.record_failure(
                EventType::UserDelete,
                admin,
                &[],
                "Failed to delete users - no user IDs provided",
            );
            return Err(UserError::Validation("No user IDs provided".to_string()));
        }

        let mut ids = Vec::with_capacity(user_ids.len());
        for id in user_ids {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }

        let existing = self.store.find_existing_user_ids(&ids).await?;
        let missing: Vec<String> = ids
            .iter()
            .filter(|id| !existing.contains(id))
            .cloned()
            .collect();

        if !missing.is_empty() {
            self.audit.record(
                AuditEvent::failure(
                    EventType::UserDelete,
                    format!("Failed to delete users - users not found: {}", id_list(&missing)),
                )
                .by(admin)
                .for_single_user(&ids),
            );
            return Err(UserError::UsersNotFound(missing));
        }

        if self.keys.is_remote() {
            let keys = match self.store.get_keys(&ids).await {
                Ok(keys) => keys,
                Err(e) => {
                    self.record_failure(
                        EventType::UserDelete,
                        admin,
                        &ids,
                        format!("Failed to delete users {}: {e:#}", id_list(&ids)),
                    );
                    return Err(e.into());
                }
            };
            let keys: Vec<String> = keys.into_iter().map(|(_, key)| key).collect();
            self.revoke_all(&keys).await;
        }

        let deleted = match self.store.delete_users(&ids).await {
            Ok(deleted) => deleted,
            Err(e) => {
                self.record_failure(
                    EventType::UserDelete,
                    admin,
                    &ids,
                    format!("Failed to delete users {}: {e:#}", id_list(&ids)),
                );
                return Err(e.into());
            }
        };
        info!(deleted, admin, "Deleted users");

        self.audit.record(
            AuditEvent::success(
                EventType::UserDelete,
                format!("Users deleted successfully: {}", id_list(&ids)),
            )
            .by(admin)
            .for_single_user(&ids),
        );

        Ok(ids)
    }

    async fn get_key(&self, user_id: &str) -> Result<String, UserError> {
        self.store
            .get_keys(&[user_id.to_string()])
            .await?
            .pop()
            .map(|(_, key)| key)
            .ok_or_else(|| UserError::NotFound(user_id.to_string()))
    }

    async fn get_keys(&self, user_ids: &[String]) -> Result<Vec<(String, String)>, UserError> {
        Ok(self.store.get_keys(user_ids).await?)
    }

    async fn key_models(&self, user_id: &str) -> Result<Vec<String>, UserError> {
        let user = self.get_user(user_id).await?;

        if !self.keys.is_remote() {
            return Ok(user.allowed_models);
        }

        Ok(self
            .keys
            .key_models(&user.key_value)
            .await?
            .unwrap_or_default())
    }

    async fn available_models(&self) -> Result<Vec<Value>, UserError> {
        Ok(self.keys.available_models().await?)
    }
}
