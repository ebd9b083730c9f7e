use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum DepreciationMethod {
    #[sea_orm(string_value = "straight_line")]
    StraightLine,
    #[sea_orm(string_value = "declining_balance")]
    DecliningBalance,
    #[sea_orm(string_value = "double_declining_balance")]
    DoubleDecliningBalance,
    #[sea_orm(string_value = "sum_of_years_digits")]
    SumOfYearsDigits,
    #[sea_orm(string_value = "units_of_production")]
    UnitsOfProduction,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "assets")]
#[schema(as = Asset)]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub organization_id: i32,
    pub name: String,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub quantity: i32,
    #[sea_orm(column_type = "Decimal(Some((16, 2)))")]
    pub unit_price: Decimal,
    pub category_id: i32,
    pub sub_category_id: Option<i32>,
    pub supplier_id: Option<i32>,
    pub site_id: i32,
    pub area_id: Option<i32>,
    pub department_id: Option<i32>,
    pub sub_department_id: Option<i32>,
    pub asset_status_id: i32,
    pub is_depreciable: bool,
    #[sea_orm(column_type = "Decimal(Some((16, 2)))", nullable)]
    pub depreciable_cost: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((16, 2)))", nullable)]
    pub salvage_value: Option<Decimal>,
    pub depreciation_months: Option<i32>,
    pub depreciation_method: Option<DepreciationMethod>,
    pub acquisition_date: Option<NaiveDate>,
    pub image_path: Option<String>,
    pub delivery_note_path: Option<String>,
    pub receipt_path: Option<String>,
    pub invoice_path: Option<String>,
    /// Terminal flag set by disposal
    pub is_disposed: bool,
    pub is_deleted: bool,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub modified_by: Option<Uuid>,
    pub modified_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id"
    )]
    Category,
    #[sea_orm(
        belongs_to = "super::site::Entity",
        from = "Column::SiteId",
        to = "super::site::Column::Id"
    )]
    Site,
    #[sea_orm(
        belongs_to = "super::asset_status::Entity",
        from = "Column::AssetStatusId",
        to = "super::asset_status::Column::Id"
    )]
    Status,
    #[sea_orm(has_many = "super::asset_assigned::Entity")]
    Assignments,
    #[sea_orm(has_many = "super::asset_history::Entity")]
    History,
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl Related<super::site::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Site.def()
    }
}

impl Related<super::asset_status::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Status.def()
    }
}

impl Related<super::asset_assigned::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Assignments.def()
    }
}

impl Related<super::asset_history::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::History.def()
    }
}

super::audited_behavior!();
