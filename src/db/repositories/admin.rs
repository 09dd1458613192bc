use anyhow::{Context, Result};
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    Set,
};
use tokio::task;

use crate::config::SecurityConfig;
use crate::entities::admins;

/// Admin data returned from repository (without sensitive password hash)
#[derive(Debug, Clone)]
pub struct Admin {
    pub id: i32,
    pub username: String,
    pub is_super_admin: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<admins::Model> for Admin {
    fn from(model: admins::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            is_super_admin: model.is_super_admin,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Outcome of checking a plaintext password against a stored hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordCheck {
    Invalid,
    Valid,
    /// Valid, but stored with bcrypt and due for an Argon2id rehash
    ValidLegacy,
}

pub struct AdminRepository {
    conn: DatabaseConnection,
}

impl AdminRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get_by_username(&self, username: &str) -> Result<Option<Admin>> {
        let admin = admins::Entity::find()
            .filter(admins::Column::Username.eq(username))
            .one(&self.conn)
            .await
            .context("Failed to query admin by username")?;

        Ok(admin.map(Admin::from))
    }

    pub async fn count(&self) -> Result<u64> {
        admins::Entity::find()
            .count(&self.conn)
            .await
            .context("Failed to count admins")
    }

    /// Insert a new admin. Returns `None` if the username is already taken.
    pub async fn create(
        &self,
        username: &str,
        password: &str,
        is_super_admin: bool,
        config: &SecurityConfig,
    ) -> Result<Option<Admin>> {
        if self.get_by_username(username).await?.is_some() {
            return Ok(None);
        }

        let password = password.to_string();
        let config = config.clone();
        let password_hash = task::spawn_blocking(move || hash_password(&password, &config))
            .await
            .context("Password hashing task panicked")??;

        let now = crate::db::now_timestamp();
        let active = admins::ActiveModel {
            username: Set(username.to_string()),
            password_hash: Set(password_hash),
            is_super_admin: Set(is_super_admin),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        let model = active
            .insert(&self.conn)
            .await
            .context("Failed to insert admin")?;

        Ok(Some(Admin::from(model)))
    }

    /// Verify password for an admin.
    ///
    /// Hash verification runs in `spawn_blocking` since both Argon2 and bcrypt
    /// are CPU-bound. A matching legacy bcrypt hash is rewritten as Argon2id
    /// when `auto_migrate_password_hashes` is set.
    pub async fn verify_password(
        &self,
        username: &str,
        password: &str,
        config: &SecurityConfig,
    ) -> Result<Option<Admin>> {
        let admin = admins::Entity::find()
            .filter(admins::Column::Username.eq(username))
            .one(&self.conn)
            .await
            .context("Failed to query admin for password verification")?;

        let Some(admin) = admin else {
            return Ok(None);
        };

        let password_hash = admin.password_hash.clone();
        let candidate = password.to_string();
        let check = task::spawn_blocking(move || check_password(&candidate, &password_hash))
            .await
            .context("Password verification task panicked")??;

        match check {
            PasswordCheck::Invalid => Ok(None),
            PasswordCheck::Valid => Ok(Some(Admin::from(admin))),
            PasswordCheck::ValidLegacy => {
                if config.auto_migrate_password_hashes {
                    if let Err(e) = self.update_password(username, password, config).await {
                        tracing::warn!(error = %e, "Failed to migrate legacy password hash for {username}");
                    } else {
                        tracing::info!("Migrated legacy bcrypt hash to Argon2id for {username}");
                    }
                }
                Ok(Some(Admin::from(admin)))
            }
        }
    }

    /// Update password for an admin. Returns `false` if the admin does not exist.
    pub async fn update_password(
        &self,
        username: &str,
        new_password: &str,
        config: &SecurityConfig,
    ) -> Result<bool> {
        let admin = admins::Entity::find()
            .filter(admins::Column::Username.eq(username))
            .one(&self.conn)
            .await
            .context("Failed to query admin for password update")?;

        let Some(admin) = admin else {
            return Ok(false);
        };

        let password = new_password.to_string();
        let config = config.clone();
        let new_hash = task::spawn_blocking(move || hash_password(&password, &config))
            .await
            .context("Password hashing task panicked")??;

        let mut active: admins::ActiveModel = admin.into();
        active.password_hash = Set(new_hash);
        active.updated_at = Set(crate::db::now_timestamp());
        active.update(&self.conn).await?;

        Ok(true)
    }
}

/// Hash a password using Argon2id with the configured cost parameters.
pub fn hash_password(password: &str, config: &SecurityConfig) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    let params = Params::new(
        config.argon2_memory_cost_kib,
        config.argon2_time_cost,
        config.argon2_parallelism,
        None,
    )
    .map_err(|e| anyhow::anyhow!("Invalid Argon2 params: {e}"))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;

    Ok(hash.to_string())
}

/// Check a password against an Argon2 PHC string or a legacy bcrypt hash.
pub fn check_password(password: &str, stored_hash: &str) -> Result<PasswordCheck> {
    if is_bcrypt_hash(stored_hash) {
        let valid = bcrypt::verify(password, stored_hash)
            .map_err(|e| anyhow::anyhow!("Invalid bcrypt hash: {e}"))?;
        return Ok(if valid {
            PasswordCheck::ValidLegacy
        } else {
            PasswordCheck::Invalid
        });
    }

    let parsed_hash = PasswordHash::new(stored_hash)
        .map_err(|e| anyhow::anyhow!("Invalid password hash format: {e}"))?;

    // Params are read from the PHC string, so the default instance verifies any cost.
    let valid = Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok();

    Ok(if valid {
        PasswordCheck::Valid
    } else {
        PasswordCheck::Invalid
    })
}

fn is_bcrypt_hash(hash: &str) -> bool {
    ["$2a$", "$2b$", "$2y$"]
        .iter()
        .any(|prefix| hash.starts_with(prefix))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_config() -> SecurityConfig {
        SecurityConfig {
            argon2_memory_cost_kib: 1024,
            argon2_time_cost: 1,
            ..SecurityConfig::default()
        }
    }

    #[test]
    fn test_argon2_hash_roundtrip() {
        let hash = hash_password("correct horse", &fast_config()).unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert_eq!(
            check_password("correct horse", &hash).unwrap(),
            PasswordCheck::Valid
        );
        assert_eq!(
            check_password("wrong horse", &hash).unwrap(),
            PasswordCheck::Invalid
        );
    }

    #[test]
    fn test_legacy_bcrypt_hash_is_flagged() {
        let legacy = bcrypt::hash("test_password", 4).unwrap();
        assert_eq!(
            check_password("test_password", &legacy).unwrap(),
            PasswordCheck::ValidLegacy
        );
        assert_eq!(
            check_password("nope", &legacy).unwrap(),
            PasswordCheck::Invalid
        );
    }

    #[test]
    fn test_garbage_hash_is_an_error() {
        assert!(check_password("anything", "not-a-hash").is_err());
    }
}
