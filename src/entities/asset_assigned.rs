use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum AssignToType {
    #[sea_orm(string_value = "not_assigned")]
    NotAssigned,
    #[sea_orm(string_value = "user")]
    User,
    #[sea_orm(string_value = "location")]
    Location,
    #[sea_orm(string_value = "disposed")]
    Disposed,
}

/// Assignment of an asset to a holder. Exactly one row per asset has
/// `is_active = true`; superseded rows are closed, never removed.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "asset_assignments")]
#[schema(as = AssetAssignment)]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub asset_id: i32,
    pub organization_id: i32,
    pub assign_to_type: AssignToType,
    pub user_id: Option<Uuid>,
    pub site_id: Option<i32>,
    pub area_id: Option<i32>,
    pub assigned_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub note: Option<String>,
    pub is_active: bool,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
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
