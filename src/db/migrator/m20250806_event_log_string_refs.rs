use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::DatabaseBackend;

/// Drops the foreign keys from `event_logs` and stores admin/user references
/// as strings, so deleting an admin or user never trips over audit rows.
#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let conn = manager.get_connection();

        match manager.get_database_backend() {
            DatabaseBackend::Postgres => {
                conn.execute_unprepared(
                    "ALTER TABLE event_logs DROP CONSTRAINT IF EXISTS event_logs_admin_id_fkey",
                )
                .await?;
                conn.execute_unprepared(
                    "ALTER TABLE event_logs DROP CONSTRAINT IF EXISTS event_logs_user_id_fkey",
                )
                .await?;
                conn.execute_unprepared(
                    "ALTER TABLE event_logs ALTER COLUMN admin_id TYPE VARCHAR(50) USING admin_id::VARCHAR",
                )
                .await?;
                conn.execute_unprepared(
                    "ALTER TABLE event_logs ALTER COLUMN user_id TYPE VARCHAR(50) USING user_id::VARCHAR",
                )
                .await?;
            }
            _ => {
                // SQLite cannot drop constraints in place; rebuild the table.
                conn.execute_unprepared("ALTER TABLE event_logs RENAME TO event_logs_old")
                    .await?;

                conn.execute_unprepared(
                    r#"
                    CREATE TABLE event_logs (
                        id INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
                        user_id VARCHAR(50),
                        admin_id VARCHAR(50),
                        event_type VARCHAR(50) NOT NULL,
                        event_detail TEXT,
                        result VARCHAR(50),
                        created_at VARCHAR NOT NULL
                    )
                "#,
                )
                .await?;

                conn.execute_unprepared(
                    r#"
                    INSERT INTO event_logs (
                        id, user_id, admin_id, event_type, event_detail, result, created_at
                    )
                    SELECT
                        id, CAST(user_id AS TEXT), CAST(admin_id AS TEXT),
                        event_type, event_detail, result, created_at
                    FROM event_logs_old
                "#,
                )
                .await?;

                conn.execute_unprepared("DROP TABLE event_logs_old").await?;
            }
        }

        manager
            .create_index(
                Index::create()
                    .name("idx_event_logs_created_at")
                    .table(EventLogs::Table)
                    .col(EventLogs::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_event_logs_event_type")
                    .table(EventLogs::Table)
                    .col(EventLogs::EventType)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, _manager: &SchemaManager) -> Result<(), DbErr> {
        // String references cannot be mapped back to ids reliably.
        Ok(())
    }
}

#[derive(Iden)]
enum EventLogs {
    Table,
    CreatedAt,
    EventType,
}
