use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::asset_assigned::AssignToType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum AssetEvent {
    #[sea_orm(string_value = "created")]
    Created,
    #[sea_orm(string_value = "updated")]
    Updated,
    #[sea_orm(string_value = "transferred")]
    Transferred,
    #[sea_orm(string_value = "disposed")]
    Disposed,
    #[sea_orm(string_value = "deleted")]
    Deleted,
}

/// Append-only audit trail. Rows are inserted by the asset service and never
/// updated or deleted.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "asset_histories")]
#[schema(as = AssetHistory)]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub asset_id: i32,
    pub organization_id: i32,
    pub event: AssetEvent,
    pub assign_to_type: Option<AssignToType>,
    pub user_id: Option<Uuid>,
    pub site_id: Option<i32>,
    pub area_id: Option<i32>,
    pub note: Option<String>,
    pub performed_by: Uuid,
    pub performed_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::asset::Entity",
        from = "Column::AssetId",
        to = "super::asset::Column::Id"
    )]
    Asset,
}

impl Related<super::asset::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Asset.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
