use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::asset_assigned::AssignToType;
use super::asset_disposal::DisposalMethod;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum AssetRequestType {
    #[sea_orm(string_value = "transfer")]
    Transfer,
    #[sea_orm(string_value = "dispose")]
    Dispose,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum ApprovalStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "approved")]
    Approved,
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

/// Sequential sign-off step of an asset request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
pub enum ApprovalLevel {
    Level1,
    Level2,
    Level3,
}

impl ApprovalLevel {
    pub const MAX: i32 = 3;

    pub fn from_index(index: i32) -> Option<Self> {
        match index {
            1 => Some(ApprovalLevel::Level1),
            2 => Some(ApprovalLevel::Level2),
            3 => Some(ApprovalLevel::Level3),
            _ => None,
        }
    }

    pub fn index(&self) -> i32 {
        match self {
            ApprovalLevel::Level1 => 1,
            ApprovalLevel::Level2 => 2,
            ApprovalLevel::Level3 => 3,
        }
    }
}

/// A transfer or disposal waiting for approval. The request row carries the
/// complete payload so the effect can be applied when the last level signs.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "asset_requests")]
#[schema(as = AssetRequest)]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub organization_id: i32,
    pub asset_id: i32,
    pub request_type: AssetRequestType,
    pub status: ApprovalStatus,
    pub required_levels: i32,
    pub approved_levels: i32,
    pub level1_approved_by: Option<Uuid>,
    pub level1_approved_at: Option<DateTime<Utc>>,
    pub level2_approved_by: Option<Uuid>,
    pub level2_approved_at: Option<DateTime<Utc>>,
    pub level3_approved_by: Option<Uuid>,
    pub level3_approved_at: Option<DateTime<Utc>>,
    pub assign_to_type: Option<AssignToType>,
    pub user_id: Option<Uuid>,
    pub site_id: Option<i32>,
    pub area_id: Option<i32>,
    pub transfer_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub note: Option<String>,
    pub disposal_method: Option<DisposalMethod>,
    pub disposal_date: Option<NaiveDate>,
    pub document_path: Option<String>,
    pub comment: Option<String>,
    pub requested_by: Uuid,
    pub requested_at: DateTime<Utc>,
    pub decided_by: Option<Uuid>,
    pub decided_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
}

impl Model {
    pub fn is_pending(&self) -> bool {
        self.status == ApprovalStatus::Pending
    }

    /// Level whose sign-off is awaited, `None` once decided.
    pub fn awaiting_level(&self) -> Option<ApprovalLevel> {
        if !self.is_pending() {
            return None;
        }
        ApprovalLevel::from_index(self.approved_levels + 1)
    }
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn approval_levels_round_trip_through_index() {
        assert_eq!(ApprovalLevel::from_index(2), Some(ApprovalLevel::Level2));
        assert_eq!(ApprovalLevel::Level3.index(), ApprovalLevel::MAX);
        assert_eq!(ApprovalLevel::from_index(4), None);
        assert!(ApprovalLevel::Level1 < ApprovalLevel::Level2);
    }
}
