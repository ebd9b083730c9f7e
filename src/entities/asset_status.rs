use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Statuses every organization receives on first use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum AssetStatusKind {
    #[sea_orm(string_value = "available")]
    Available,
    #[sea_orm(string_value = "in_use")]
    InUse,
    #[sea_orm(string_value = "under_maintenance")]
    UnderMaintenance,
    #[sea_orm(string_value = "disposed")]
    Disposed,
}

impl AssetStatusKind {
    pub const SEEDED: [AssetStatusKind; 4] = [
        AssetStatusKind::Available,
        AssetStatusKind::InUse,
        AssetStatusKind::UnderMaintenance,
        AssetStatusKind::Disposed,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            AssetStatusKind::Available => "Available",
            AssetStatusKind::InUse => "In Use",
            AssetStatusKind::UnderMaintenance => "Under Maintenance",
            AssetStatusKind::Disposed => "Disposed",
        }
    }
}

/// Organization-scoped asset status. Seeded rows carry their `kind`; statuses
/// created by users have none.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "asset_statuses")]
#[schema(as = AssetStatus)]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub organization_id: i32,
    pub name: String,
    pub description: Option<String>,
    pub kind: Option<AssetStatusKind>,
    pub is_deleted: bool,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub modified_by: Option<Uuid>,
    pub modified_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

super::audited_behavior!();
