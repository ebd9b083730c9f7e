use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A role name the authorization middleware understands (for example `Asset.Create`).
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "identity_roles")]
#[schema(as = IdentityRole)]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::manage_user_role_detail::Entity")]
    RoleDetails,
}

impl Related<super::manage_user_role_detail::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RoleDetails.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
