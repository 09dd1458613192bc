use sea_orm::entity::prelude::*;

/// A managed external identity holding one downstream access key.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// External identifier chosen by the operator
    #[sea_orm(unique)]
    pub user_id: String,

    pub organization: Option<String>,

    pub key_value: String,

    pub extra_info: Option<String>,

    pub created_at: String,

    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::allowed_models::Entity")]
    AllowedModels,
    #[sea_orm(has_many = "super::allowed_services::Entity")]
    AllowedServices,
}

impl Related<super::allowed_models::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AllowedModels.def()
    }
}

impl Related<super::allowed_services::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AllowedServices.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
