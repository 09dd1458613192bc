use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::config::SecurityConfig;

pub mod migrator;
pub mod repositories;

pub use crate::entities::event_logs::Model as EventLog;
pub use repositories::admin::{Admin, PasswordCheck};
pub use repositories::event_log::{EventLogFilter, NewEventLog};
pub use repositories::user::{ManagedUser, NewUser, UserChanges};

/// Timestamp format stored in every `created_at` / `updated_at` column.
///
/// Fixed-width UTC with microseconds, so lexical order matches time order.
#[must_use]
pub fn now_timestamp() -> String {
    format_timestamp(chrono::Utc::now())
}

#[must_use]
pub fn format_timestamp(at: chrono::DateTime<chrono::Utc>) -> String {
    at.to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if let Some(path_str) = sqlite_file_path(db_url) {
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn admin_repo(&self) -> repositories::admin::AdminRepository {
        repositories::admin::AdminRepository::new(self.conn.clone())
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    fn event_log_repo(&self) -> repositories::event_log::EventLogRepository {
        repositories::event_log::EventLogRepository::new(self.conn.clone())
    }

    // ========== Admins ==========

    pub async fn get_admin_by_username(&self, username: &str) -> Result<Option<Admin>> {
        self.admin_repo().get_by_username(username).await
    }

    pub async fn count_admins(&self) -> Result<u64> {
        self.admin_repo().count().await
    }

    pub async fn create_admin(
        &self,
        username: &str,
        password: &str,
        is_super_admin: bool,
        config: &SecurityConfig,
    ) -> Result<Option<Admin>> {
        self.admin_repo()
            .create(username, password, is_super_admin, config)
            .await
    }

    pub async fn verify_admin_password(
        &self,
        username: &str,
        password: &str,
        config: &SecurityConfig,
    ) -> Result<Option<Admin>> {
        self.admin_repo()
            .verify_password(username, password, config)
            .await
    }

    pub async fn update_admin_password(
        &self,
        username: &str,
        new_password: &str,
        config: &SecurityConfig,
    ) -> Result<bool> {
        self.admin_repo()
            .update_password(username, new_password, config)
            .await
    }

    // ========== Users ==========

    pub async fn list_users(&self, organization: Option<&str>) -> Result<Vec<ManagedUser>> {
        self.user_repo().list(organization).await
    }

    pub async fn get_user(&self, user_id: &str) -> Result<Option<ManagedUser>> {
        self.user_repo().get(user_id).await
    }

    pub async fn find_existing_user_ids(&self, user_ids: &[String]) -> Result<Vec<String>> {
        self.user_repo().existing_user_ids(user_ids).await
    }

    pub async fn create_users(&self, new_users: &[NewUser]) -> Result<Vec<ManagedUser>> {
        self.user_repo().create_many(new_users).await
    }

    pub async fn update_user(
        &self,
        user_id: &str,
        changes: &UserChanges,
    ) -> Result<Option<ManagedUser>> {
        self.user_repo().update(user_id, changes).await
    }

    pub async fn delete_users(&self, user_ids: &[String]) -> Result<u64> {
        self.user_repo().delete_many(user_ids).await
    }

    pub async fn get_keys(&self, user_ids: &[String]) -> Result<Vec<(String, String)>> {
        self.user_repo().keys(user_ids).await
    }

    // ========== Event logs ==========

    pub async fn add_event_log(&self, entry: NewEventLog) -> Result<()> {
        self.event_log_repo().add(entry).await
    }

    pub async fn query_event_logs(
        &self,
        filter: &EventLogFilter,
        limit: u64,
    ) -> Result<Vec<EventLog>> {
        self.event_log_repo().query(filter, limit).await
    }
}

/// Filesystem path of a file-backed SQLite URL, `None` for in-memory or other backends.
fn sqlite_file_path(db_url: &str) -> Option<&str> {
    let rest = db_url.strip_prefix("sqlite:")?;
    let rest = rest.trim_start_matches("//");
    let path = rest.split('?').next().unwrap_or(rest);

    if path.is_empty() || path.contains(":memory:") {
        None
    } else {
        Some(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlite_file_path() {
        assert_eq!(sqlite_file_path("sqlite:data/mama.db"), Some("data/mama.db"));
        assert_eq!(
            sqlite_file_path("sqlite:///tmp/mama.db?mode=rwc"),
            Some("/tmp/mama.db")
        );
        assert_eq!(sqlite_file_path("sqlite::memory:"), None);
        assert_eq!(sqlite_file_path("postgres://u:p@localhost/mama"), None);
    }

    #[test]
    fn test_timestamps_sort_lexically() {
        use chrono::TimeZone;
        let early = chrono::Utc.with_ymd_and_hms(2025, 8, 6, 9, 0, 0).unwrap();
        let late = chrono::Utc.with_ymd_and_hms(2025, 8, 6, 10, 0, 0).unwrap();
        let a = format_timestamp(early);
        assert_eq!(a, "2025-08-06T09:00:00.000000Z");
        assert!(a < format_timestamp(late));
    }
}
