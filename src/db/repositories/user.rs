use std::collections::HashMap;

use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};

use crate::entities::{allowed_models, allowed_services, users};

/// A managed user together with its allow-lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedUser {
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

impl ManagedUser {
    fn from_parts(model: users::Model, models: Vec<String>, services: Vec<String>) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            organization: model.organization,
            key_value: model.key_value,
            extra_info: model.extra_info,
            created_at: model.created_at,
            updated_at: model.updated_at,
            allowed_models: models,
            allowed_services: services,
        }
    }
}

/// Row to insert; `key_value` has already been provisioned.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub user_id: String,
    pub organization: Option<String>,
    pub key_value: String,
    pub extra_info: Option<String>,
    pub allowed_models: Vec<String>,
    pub allowed_services: Vec<String>,
}

/// Partial update. `None` leaves a field untouched; allow-lists are replaced wholesale.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub organization: Option<String>,
    pub extra_info: Option<String>,
    pub allowed_models: Option<Vec<String>>,
    pub allowed_services: Option<Vec<String>>,
}

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn list(&self, organization: Option<&str>) -> Result<Vec<ManagedUser>> {
        let mut query = users::Entity::find().order_by_asc(users::Column::Id);

        if let Some(org) = organization {
            query = query.filter(users::Column::Organization.eq(org));
        }

        let rows = query
            .all(&self.conn)
            .await
            .context("Failed to list users")?;

        self.attach_allow_lists(rows).await
    }

    pub async fn get(&self, user_id: &str) -> Result<Option<ManagedUser>> {
        let row = users::Entity::find()
            .filter(users::Column::UserId.eq(user_id))
            .one(&self.conn)
            .await
            .context("Failed to query user by user_id")?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(self.attach_allow_lists(vec![row]).await?.pop())
    }

    /// Returns the subset of `user_ids` that already exist.
    pub async fn existing_user_ids(&self, user_ids: &[String]) -> Result<Vec<String>> {
        if user_ids.is_empty() {
            return Ok(vec![]);
        }

        let rows = users::Entity::find()
            .filter(users::Column::UserId.is_in(user_ids.iter().cloned()))
            .all(&self.conn)
            .await
            .context("Failed to check existing user ids")?;

        Ok(rows.into_iter().map(|u| u.user_id).collect())
    }

    /// `(user_id, key_value)` pairs for the ids that exist, in request order.
    pub async fn keys(&self, user_ids: &[String]) -> Result<Vec<(String, String)>> {
        if user_ids.is_empty() {
            return Ok(vec![]);
        }

        let rows = users::Entity::find()
            .filter(users::Column::UserId.is_in(user_ids.iter().cloned()))
            .all(&self.conn)
            .await
            .context("Failed to query user keys")?;

        let mut by_id: HashMap<String, String> = rows
            .into_iter()
            .map(|u| (u.user_id, u.key_value))
            .collect();

        Ok(user_ids
            .iter()
            .filter_map(|id| by_id.remove(id).map(|key| (id.clone(), key)))
            .collect())
    }

    /// Inserts every user and its allow-lists in one transaction.
    pub async fn create_many(&self, new_users: &[NewUser]) -> Result<Vec<ManagedUser>> {
        let txn = self.conn.begin().await?;
        let now = crate::db::now_timestamp();
        let mut created = Vec::with_capacity(new_users.len());

        for new_user in new_users {
            let model = users::ActiveModel {
                user_id: Set(new_user.user_id.clone()),
                organization: Set(new_user.organization.clone()),
                key_value: Set(new_user.key_value.clone()),
                extra_info: Set(new_user.extra_info.clone()),
                created_at: Set(now.clone()),
                updated_at: Set(now.clone()),
                ..Default::default()
            }
            .insert(&txn)
            .await
            .with_context(|| format!("Failed to insert user {}", new_user.user_id))?;

            replace_allow_lists(
                &txn,
                model.id,
                Some(&new_user.allowed_models),
                Some(&new_user.allowed_services),
            )
            .await?;

            created.push(ManagedUser::from_parts(
                model,
                new_user.allowed_models.clone(),
                new_user.allowed_services.clone(),
            ));
        }

        txn.commit().await?;
        Ok(created)
    }

    pub async fn update(&self, user_id: &str, changes: &UserChanges) -> Result<Option<ManagedUser>> {
        let txn = self.conn.begin().await?;

        let row = users::Entity::find()
            .filter(users::Column::UserId.eq(user_id))
            .one(&txn)
            .await
            .context("Failed to query user for update")?;

        let Some(row) = row else {
            return Ok(None);
        };

        let id = row.id;
        let mut active: users::ActiveModel = row.into();
        if let Some(organization) = &changes.organization {
            active.organization = Set(Some(organization.clone()));
        }
        if let Some(extra_info) = &changes.extra_info {
            active.extra_info = Set(Some(extra_info.clone()));
        }
        active.updated_at = Set(crate::db::now_timestamp());
        active.update(&txn).await?;

        replace_allow_lists(
            &txn,
            id,
            changes.allowed_models.as_deref(),
            changes.allowed_services.as_deref(),
        )
        .await?;

        txn.commit().await?;
        self.get(user_id).await
    }

    /// Deletes the users and their allow-lists. Returns the number of users removed.
    pub async fn delete_many(&self, user_ids: &[String]) -> Result<u64> {
        if user_ids.is_empty() {
            return Ok(0);
        }

        let txn = self.conn.begin().await?;

        let ids: Vec<i32> = users::Entity::find()
            .filter(users::Column::UserId.is_in(user_ids.iter().cloned()))
            .all(&txn)
            .await?
            .into_iter()
            .map(|u| u.id)
            .collect();

        allowed_models::Entity::delete_many()
            .filter(allowed_models::Column::UserId.is_in(ids.clone()))
            .exec(&txn)
            .await?;
        allowed_services::Entity::delete_many()
            .filter(allowed_services::Column::UserId.is_in(ids.clone()))
            .exec(&txn)
            .await?;

        let result = users::Entity::delete_many()
            .filter(users::Column::Id.is_in(ids))
            .exec(&txn)
            .await?;

        txn.commit().await?;
        Ok(result.rows_affected)
    }

    async fn attach_allow_lists(&self, rows: Vec<users::Model>) -> Result<Vec<ManagedUser>> {
        if rows.is_empty() {
            return Ok(vec![]);
        }

        let ids: Vec<i32> = rows.iter().map(|u| u.id).collect();

        let mut models: HashMap<i32, Vec<String>> = HashMap::new();
        for row in allowed_models::Entity::find()
            .filter(allowed_models::Column::UserId.is_in(ids.clone()))
            .order_by_asc(allowed_models::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to load allowed models")?
        {
            models.entry(row.user_id).or_default().push(row.model_name);
        }

        let mut services: HashMap<i32, Vec<String>> = HashMap::new();
        for row in allowed_services::Entity::find()
            .filter(allowed_services::Column::UserId.is_in(ids))
            .order_by_asc(allowed_services::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to load allowed services")?
        {
            services
                .entry(row.user_id)
                .or_default()
                .push(row.service_name);
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let m = models.remove(&row.id).unwrap_or_default();
                let s = services.remove(&row.id).unwrap_or_default();
                ManagedUser::from_parts(row, m, s)
            })
            .collect())
    }
}

async fn replace_allow_lists<C: ConnectionTrait>(
    conn: &C,
    user_pk: i32,
    models: Option<&[String]>,
    services: Option<&[String]>,
) -> Result<()> {
    if let Some(models) = models {
        allowed_models::Entity::delete_many()
            .filter(allowed_models::Column::UserId.eq(user_pk))
            .exec(conn)
            .await?;

        if !models.is_empty() {
            allowed_models::Entity::insert_many(models.iter().map(|name| {
                allowed_models::ActiveModel {
                    user_id: Set(user_pk),
                    model_name: Set(name.clone()),
                    ..Default::default()
                }
            }))
            .exec(conn)
            .await
            .context("Failed to insert allowed models")?;
        }
    }

    if let Some(services) = services {
        allowed_services::Entity::delete_many()
            .filter(allowed_services::Column::UserId.eq(user_pk))
            .exec(conn)
            .await?;

        if !services.is_empty() {
            allowed_services::Entity::insert_many(services.iter().map(|name| {
                allowed_services::ActiveModel {
                    user_id: Set(user_pk),
                    service_name: Set(name.clone()),
                    ..Default::default()
                }
            }))
            .exec(conn)
            .await
            .context("Failed to insert allowed services")?;
        }
    }

    Ok(())
}
