use sea_orm::entity::prelude::*;

/// Append-only audit row. Admins and users are referenced by their string
/// identifiers, so no foreign keys tie this table to `admins` or `users`.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "event_logs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Admin username
    pub admin_id: Option<String>,
    /// External `users.user_id`
    pub user_id: Option<String>,
    pub event_type: String,
    pub event_detail: Option<String>,
    pub result: Option<String>,
    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
