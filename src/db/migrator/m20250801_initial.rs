use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Admins::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Admins::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Admins::Username)
                            .string_len(50)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Admins::PasswordHash).string_len(255).not_null())
                    .col(
                        ColumnDef::new(Admins::IsSuperAdmin)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Admins::CreatedAt).string().not_null())
                    .col(ColumnDef::new(Admins::UpdatedAt).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Users::UserId)
                            .string_len(50)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Users::Organization).string_len(100).null())
                    .col(ColumnDef::new(Users::KeyValue).string_len(255).not_null())
                    .col(ColumnDef::new(Users::ExtraInfo).text().null())
                    .col(ColumnDef::new(Users::CreatedAt).string().not_null())
                    .col(ColumnDef::new(Users::UpdatedAt).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AllowedModels::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AllowedModels::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AllowedModels::UserId).integer().not_null())
                    .col(
                        ColumnDef::new(AllowedModels::ModelName)
                            .string_len(100)
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("allowed_models_user_id_fkey")
                            .from(AllowedModels::Table, AllowedModels::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AllowedServices::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AllowedServices::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AllowedServices::UserId).integer().not_null())
                    .col(
                        ColumnDef::new(AllowedServices::ServiceName)
                            .string_len(100)
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("allowed_services_user_id_fkey")
                            .from(AllowedServices::Table, AllowedServices::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // First revision of the audit table referenced admins/users by id.
        manager
            .create_table(
                Table::create()
                    .table(EventLogs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(EventLogs::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(EventLogs::UserId).integer().null())
                    .col(ColumnDef::new(EventLogs::AdminId).integer().null())
                    .col(ColumnDef::new(EventLogs::EventType).string_len(50).not_null())
                    .col(ColumnDef::new(EventLogs::EventDetail).text().null())
                    .col(ColumnDef::new(EventLogs::Result).string_len(50).null())
                    .col(ColumnDef::new(EventLogs::CreatedAt).string().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("event_logs_user_id_fkey")
                            .from(EventLogs::Table, EventLogs::UserId)
                            .to(Users::Table, Users::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("event_logs_admin_id_fkey")
                            .from(EventLogs::Table, EventLogs::AdminId)
                            .to(Admins::Table, Admins::Id),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(EventLogs::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AllowedServices::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AllowedModels::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Admins::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Admins {
    Table,
    Id,
    Username,
    PasswordHash,
    IsSuperAdmin,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Users {
    Table,
    Id,
    UserId,
    Organization,
    KeyValue,
    ExtraInfo,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum AllowedModels {
    Table,
    Id,
    UserId,
    ModelName,
}

#[derive(Iden)]
enum AllowedServices {
    Table,
    Id,
    UserId,
    ServiceName,
}

#[derive(Iden)]
enum EventLogs {
    Table,
    Id,
    UserId,
    AdminId,
    EventType,
    EventDetail,
    Result,
    CreatedAt,
}
