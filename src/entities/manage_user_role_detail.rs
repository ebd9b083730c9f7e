use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "manage_user_role_details")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub manage_user_role_id: i32,
    pub identity_role_id: i32,
    pub is_allowed: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::manage_user_role::Entity",
        from = "Column::ManageUserRoleId",
        to = "super::manage_user_role::Column::Id"
    )]
    Role,
    #[sea_orm(
        belongs_to = "super::identity_role::Entity",
        from = "Column::IdentityRoleId",
        to = "super::identity_role::Column::Id"
    )]
    IdentityRole,
}

impl Related<super::manage_user_role::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Role.def()
    }
}

impl Related<super::identity_role::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::IdentityRole.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
