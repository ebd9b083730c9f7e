use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum DisposalMethod {
    #[sea_orm(string_value = "sold")]
    Sold,
    #[sea_orm(string_value = "scrapped")]
    Scrapped,
    #[sea_orm(string_value = "donated")]
    Donated,
    #[sea_orm(string_value = "recycled")]
    Recycled,
    #[sea_orm(string_value = "lost")]
    Lost,
    #[sea_orm(string_value = "stolen")]
    Stolen,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "asset_disposals")]
#[schema(as = AssetDisposal)]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub asset_id: i32,
    pub organization_id: i32,
    pub disposal_method: DisposalMethod,
    pub disposal_date: NaiveDate,
    pub document_path: Option<String>,
    pub comment: Option<String>,
    pub disposed_by: Uuid,
    pub created_at: DateTime<Utc>,
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
