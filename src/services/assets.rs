//! Asset lifecycle: registration, transfer, disposal and the optional
//! multi-level approval of transfers and disposals.
//!
//! Every state change writes the asset row, its assignment rows and exactly one
//! history row inside a single transaction. Files are written to storage before
//! the transaction and removed again when it fails.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use metrics::counter;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use slog::Logger;
use tracing::{error, instrument, warn};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    config::AppConfig,
    db::DbPool,
    entities::{
        area, asset,
        asset::DepreciationMethod,
        asset_assigned::{self, AssignToType},
        asset_disposal::{self, DisposalMethod},
        asset_history::{self, AssetEvent},
        asset_request::{self, ApprovalLevel, ApprovalStatus, AssetRequestType},
        asset_status::{self, AssetStatusKind},
        category, department, site, sub_category, sub_department, supplier, user,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::asset_statuses::{ensure_seeded_statuses, seeded_status},
    services::context::OrgContext,
    services::reference::{normalize_name, normalize_optional, require_reference, ReferenceEntity},
    services::storage::{remove_replaced, FilePayload, FileStorage, StagedFiles},
};

const IMAGE_FOLDER: &str = "asset-images";
const DELIVERY_NOTE_FOLDER: &str = "asset-delivery-notes";
const RECEIPT_FOLDER: &str = "asset-receipts";
const INVOICE_FOLDER: &str = "asset-invoices";
const DISPOSAL_FOLDER: &str = "asset-disposals";

/// Whether transfers and disposals wait for sign-off, and how many levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApprovalPolicy {
    pub required: bool,
    pub levels: i32,
}

impl ApprovalPolicy {
    pub fn immediate() -> Self {
        Self {
            required: false,
            levels: 1,
        }
    }

    pub fn with_levels(levels: i32) -> Self {
        Self {
            required: true,
            levels: levels.clamp(1, ApprovalLevel::MAX),
        }
    }
}

impl From<&AppConfig> for ApprovalPolicy {
    fn from(cfg: &AppConfig) -> Self {
        if cfg.asset_approval_required {
            Self::with_levels(cfg.asset_approval_levels)
        } else {
            Self::immediate()
        }
    }
}

fn default_quantity() -> i32 {
    1
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateAssetRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 100))]
    pub brand: Option<String>,
    #[validate(length(max = 100))]
    pub model: Option<String>,
    #[validate(length(max = 100))]
    pub serial_number: Option<String>,
    #[serde(default = "default_quantity")]
    #[validate(range(min = 1))]
    pub quantity: i32,
    pub unit_price: Decimal,
    pub category_id: i32,
    pub sub_category_id: Option<i32>,
    pub supplier_id: Option<i32>,
    pub site_id: i32,
    pub area_id: Option<i32>,
    pub department_id: Option<i32>,
    pub sub_department_id: Option<i32>,
    /// Defaults to the organization's `Available` status
    pub asset_status_id: Option<i32>,
    #[serde(default)]
    pub is_depreciable: bool,
    pub depreciable_cost: Option<Decimal>,
    pub salvage_value: Option<Decimal>,
    pub depreciation_months: Option<i32>,
    pub depreciation_method: Option<DepreciationMethod>,
    pub acquisition_date: Option<NaiveDate>,
    #[validate]
    pub image: Option<FilePayload>,
    #[validate]
    pub delivery_note: Option<FilePayload>,
    #[validate]
    pub receipt: Option<FilePayload>,
    #[validate]
    pub invoice: Option<FilePayload>,
}

/// Absent fields keep their stored value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateAssetRequest {
    pub id: i32,
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(max = 100))]
    pub brand: Option<String>,
    #[validate(length(max = 100))]
    pub model: Option<String>,
    #[validate(length(max = 100))]
    pub serial_number: Option<String>,
    #[validate(range(min = 1))]
    pub quantity: Option<i32>,
    pub unit_price: Option<Decimal>,
    pub category_id: Option<i32>,
    pub sub_category_id: Option<i32>,
    pub supplier_id: Option<i32>,
    pub site_id: Option<i32>,
    pub area_id: Option<i32>,
    pub department_id: Option<i32>,
    pub sub_department_id: Option<i32>,
    pub asset_status_id: Option<i32>,
    pub is_depreciable: Option<bool>,
    pub depreciable_cost: Option<Decimal>,
    pub salvage_value: Option<Decimal>,
    pub depreciation_months: Option<i32>,
    pub depreciation_method: Option<DepreciationMethod>,
    pub acquisition_date: Option<NaiveDate>,
    #[validate]
    pub image: Option<FilePayload>,
    #[validate]
    pub delivery_note: Option<FilePayload>,
    #[validate]
    pub receipt: Option<FilePayload>,
    #[validate]
    pub invoice: Option<FilePayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct TransferAssetRequest {
    pub asset_id: i32,
    pub assign_to_type: AssignToType,
    pub user_id: Option<Uuid>,
    pub site_id: Option<i32>,
    pub area_id: Option<i32>,
    pub transfer_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    #[validate(length(max = 1000))]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct DisposeAssetRequest {
    pub asset_id: i32,
    pub disposal_method: DisposalMethod,
    pub disposal_date: NaiveDate,
    #[validate]
    pub document: Option<FilePayload>,
    #[validate(length(max = 1000))]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct ApproveAssetRequest {
    pub request_id: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct RejectAssetRequest {
    pub request_id: i32,
    #[validate(length(max = 1000))]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct AssetListQuery {
    /// Include disposed assets (default false)
    #[serde(default)]
    pub include_disposed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AssignmentView {
    pub assign_to_type: AssignToType,
    pub user_id: Option<Uuid>,
    pub user_name: Option<String>,
    pub site_id: Option<i32>,
    pub site_name: Option<String>,
    pub area_id: Option<i32>,
    pub area_name: Option<String>,
    pub assigned_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub note: Option<String>,
}

/// Asset with the display names of everything it references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AssetDetail {
    #[serde(flatten)]
    pub asset: asset::Model,
    pub category_name: Option<String>,
    pub sub_category_name: Option<String>,
    pub supplier_name: Option<String>,
    pub site_name: Option<String>,
    pub area_name: Option<String>,
    pub department_name: Option<String>,
    pub sub_department_name: Option<String>,
    pub status_name: Option<String>,
    pub assignment: Option<AssignmentView>,
}

/// Result of a transfer or disposal: applied now, or parked for approval.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AssetActionOutcome {
    Applied { asset: AssetDetail },
    PendingApproval { request: asset_request::Model },
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AssetRequestDecision {
    pub request: asset_request::Model,
    /// Present once the request's effect has been applied
    pub asset: Option<AssetDetail>,
}

/// Fully merged asset fields, checked identically on create and update.
#[derive(Debug, Clone)]
struct AssetDraft {
    name: String,
    brand: Option<String>,
    model: Option<String>,
    serial_number: Option<String>,
    quantity: i32,
    unit_price: Decimal,
    category_id: i32,
    sub_category_id: Option<i32>,
    supplier_id: Option<i32>,
    site_id: i32,
    area_id: Option<i32>,
    department_id: Option<i32>,
    sub_department_id: Option<i32>,
    asset_status_id: Option<i32>,
    is_depreciable: bool,
    depreciable_cost: Option<Decimal>,
    salvage_value: Option<Decimal>,
    depreciation_months: Option<i32>,
    depreciation_method: Option<DepreciationMethod>,
    acquisition_date: Option<NaiveDate>,
}

impl AssetDraft {
    fn from_create(request: &CreateAssetRequest) -> Result<Self, ServiceError> {
        Ok(Self {
            name: normalize_name(&request.name)?,
            brand: normalize_optional(request.brand.clone()),
            model: normalize_optional(request.model.clone()),
            serial_number: normalize_optional(request.serial_number.clone()),
            quantity: request.quantity,
            unit_price: request.unit_price,
            category_id: request.category_id,
            sub_category_id: request.sub_category_id,
            supplier_id: request.supplier_id,
            site_id: request.site_id,
            area_id: request.area_id,
            department_id: request.department_id,
            sub_department_id: request.sub_department_id,
            asset_status_id: request.asset_status_id,
            is_depreciable: request.is_depreciable,
            depreciable_cost: request.depreciable_cost,
            salvage_value: request.salvage_value,
            depreciation_months: request.depreciation_months,
            depreciation_method: request.depreciation_method,
            acquisition_date: request.acquisition_date,
        })
    }

    fn merged(existing: &asset::Model, request: &UpdateAssetRequest) -> Result<Self, ServiceError> {
        let name = match &request.name {
            Some(name) => normalize_name(name)?,
            None => existing.name.clone(),
        };
        let text = |new: &Option<String>, old: &Option<String>| match new {
            Some(value) => normalize_optional(Some(value.clone())),
            None => old.clone(),
        };
        // A new parent drops a child that belongs to the old one.
        let child = |requested: Option<i32>, stored: Option<i32>, parent_changed: bool| {
            match requested {
                Some(id) => Some(id),
                None if parent_changed => None,
                None => stored,
            }
        };
        let site_changed = request.site_id.is_some_and(|s| s != existing.site_id);
        let category_changed = request.category_id.is_some_and(|c| c != existing.category_id);
        let department_changed = request
            .department_id
            .is_some_and(|d| Some(d) != existing.department_id);

        Ok(Self {
            name,
            brand: text(&request.brand, &existing.brand),
            model: text(&request.model, &existing.model),
            serial_number: text(&request.serial_number, &existing.serial_number),
            quantity: request.quantity.unwrap_or(existing.quantity),
            unit_price: request.unit_price.unwrap_or(existing.unit_price),
            category_id: request.category_id.unwrap_or(existing.category_id),
            sub_category_id: child(
                request.sub_category_id,
                existing.sub_category_id,
                category_changed,
            ),
            supplier_id: request.supplier_id.or(existing.supplier_id),
            site_id: request.site_id.unwrap_or(existing.site_id),
            area_id: child(request.area_id, existing.area_id, site_changed),
            department_id: request.department_id.or(existing.department_id),
            sub_department_id: child(
                request.sub_department_id,
                existing.sub_department_id,
                department_changed,
            ),
            asset_status_id: Some(request.asset_status_id.unwrap_or(existing.asset_status_id)),
            is_depreciable: request.is_depreciable.unwrap_or(existing.is_depreciable),
            depreciable_cost: request.depreciable_cost.or(existing.depreciable_cost),
            salvage_value: request.salvage_value.or(existing.salvage_value),
            depreciation_months: request.depreciation_months.or(existing.depreciation_months),
            depreciation_method: request.depreciation_method.or(existing.depreciation_method),
            acquisition_date: request.acquisition_date.or(existing.acquisition_date),
        })
    }

    /// Value rules that need no database access.
    fn check_values(&self) -> Result<(), ServiceError> {
        if self.quantity < 1 {
            return Err(ServiceError::ValidationError(
                "Quantity must be at least 1".to_string(),
            ));
        }
        if self.unit_price < dec!(0) {
            return Err(ServiceError::ValidationError(
                "Unit price cannot be negative".to_string(),
            ));
        }
        if !self.is_depreciable {
            return Ok(());
        }

        let cost = self.depreciable_cost.ok_or_else(|| {
            ServiceError::ValidationError(
                "Depreciable cost is required for a depreciable asset".to_string(),
            )
        })?;
        let salvage = self.salvage_value.ok_or_else(|| {
            ServiceError::ValidationError(
                "Salvage value is required for a depreciable asset".to_string(),
            )
        })?;
        let months = self.depreciation_months.ok_or_else(|| {
            ServiceError::ValidationError(
                "Depreciation months are required for a depreciable asset".to_string(),
            )
        })?;
        if self.depreciation_method.is_none() {
            return Err(ServiceError::ValidationError(
                "Depreciation method is required for a depreciable asset".to_string(),
            ));
        }
        if cost < dec!(0) || salvage < dec!(0) {
            return Err(ServiceError::ValidationError(
                "Depreciable cost and salvage value cannot be negative".to_string(),
            ));
        }
        if salvage > cost {
            return Err(ServiceError::ValidationError(
                "Salvage value cannot exceed the depreciable cost".to_string(),
            ));
        }
        if months < 1 {
            return Err(ServiceError::ValidationError(
                "Depreciation months must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Checks every reference against the organization and returns the status id
    /// to store.
    async fn check_references<C: ConnectionTrait>(
        &self,
        db: &C,
        organization_id: i32,
    ) -> Result<i32, ServiceError> {
        let org = Some(organization_id);
        require_reference::<category::Entity, _>(db, org, self.category_id).await?;
        if let Some(sub_category_id) = self.sub_category_id {
            let sub = require_reference::<sub_category::Entity, _>(db, org, sub_category_id).await?;
            if sub.category_id != self.category_id {
                return Err(ServiceError::ValidationError(format!(
                    "Sub-category {} does not belong to category {}",
                    sub_category_id, self.category_id
                )));
            }
        }
        if let Some(supplier_id) = self.supplier_id {
            require_reference::<supplier::Entity, _>(db, org, supplier_id).await?;
        }
        require_reference::<site::Entity, _>(db, org, self.site_id).await?;
        if let Some(area_id) = self.area_id {
            let area = require_reference::<area::Entity, _>(db, org, area_id).await?;
            if area.site_id != self.site_id {
                return Err(ServiceError::ValidationError(format!(
                    "Area {} does not belong to site {}",
                    area_id, self.site_id
                )));
            }
        }
        if let Some(department_id) = self.department_id {
            require_reference::<department::Entity, _>(db, org, department_id).await?;
        }
        if let Some(sub_department_id) = self.sub_department_id {
            let Some(department_id) = self.department_id else {
                return Err(ServiceError::ValidationError(
                    "Sub-department requires a department".to_string(),
                ));
            };
            let sub =
                require_reference::<sub_department::Entity, _>(db, org, sub_department_id).await?;
            if sub.department_id != department_id {
                return Err(ServiceError::ValidationError(format!(
                    "Sub-department {} does not belong to department {}",
                    sub_department_id, department_id
                )));
            }
        }

        ensure_seeded_statuses(db, organization_id, None).await?;
        match self.asset_status_id {
            Some(status_id) => {
                let status =
                    require_reference::<asset_status::Entity, _>(db, org, status_id).await?;
                if status.kind == Some(AssetStatusKind::Disposed) {
                    return Err(ServiceError::ValidationError(
                        "The Disposed status is set by disposing the asset".to_string(),
                    ));
                }
                Ok(status.id)
            }
            None => Ok(seeded_status(db, organization_id, AssetStatusKind::Available)
                .await?
                .id),
        }
    }

    fn apply(self, active: &mut asset::ActiveModel, status_id: i32) {
        active.name = Set(self.name);
        active.brand = Set(self.brand);
        active.model = Set(self.model);
        active.serial_number = Set(self.serial_number);
        active.quantity = Set(self.quantity);
        active.unit_price = Set(self.unit_price);
        active.category_id = Set(self.category_id);
        active.sub_category_id = Set(self.sub_category_id);
        active.supplier_id = Set(self.supplier_id);
        active.site_id = Set(self.site_id);
        active.area_id = Set(self.area_id);
        active.department_id = Set(self.department_id);
        active.sub_department_id = Set(self.sub_department_id);
        active.asset_status_id = Set(status_id);
        active.is_depreciable = Set(self.is_depreciable);
        if self.is_depreciable {
            active.depreciable_cost = Set(self.depreciable_cost);
            active.salvage_value = Set(self.salvage_value);
            active.depreciation_months = Set(self.depreciation_months);
            active.depreciation_method = Set(self.depreciation_method);
        } else {
            active.depreciable_cost = Set(None);
            active.salvage_value = Set(None);
            active.depreciation_months = Set(None);
            active.depreciation_method = Set(None);
        }
        active.acquisition_date = Set(self.acquisition_date);
    }
}

/// Storage paths written for one create or update call.
#[derive(Debug, Default)]
struct AssetFiles {
    image: Option<String>,
    delivery_note: Option<String>,
    receipt: Option<String>,
    invoice: Option<String>,
}

impl AssetFiles {
    async fn stage(
        staged: &mut StagedFiles,
        image: Option<&FilePayload>,
        delivery_note: Option<&FilePayload>,
        receipt: Option<&FilePayload>,
        invoice: Option<&FilePayload>,
    ) -> Result<Self, ServiceError> {
        Ok(Self {
            image: staged.stage(IMAGE_FOLDER, image).await?,
            delivery_note: staged.stage(DELIVERY_NOTE_FOLDER, delivery_note).await?,
            receipt: staged.stage(RECEIPT_FOLDER, receipt).await?,
            invoice: staged.stage(INVOICE_FOLDER, invoice).await?,
        })
    }

    /// Sets the new paths and returns the old ones they replace.
    fn apply(self, existing: &asset::Model, active: &mut asset::ActiveModel) -> Vec<String> {
        let mut replaced = Vec::new();
        let mut swap = |new: Option<String>, old: &Option<String>| -> Option<Option<String>> {
            let new = new?;
            if let Some(old) = old {
                replaced.push(old.clone());
            }
            Some(Some(new))
        };
        if let Some(path) = swap(self.image, &existing.image_path) {
            active.image_path = Set(path);
        }
        if let Some(path) = swap(self.delivery_note, &existing.delivery_note_path) {
            active.delivery_note_path = Set(path);
        }
        if let Some(path) = swap(self.receipt, &existing.receipt_path) {
            active.receipt_path = Set(path);
        }
        if let Some(path) = swap(self.invoice, &existing.invoice_path) {
            active.invoice_path = Set(path);
        }
        replaced
    }
}

/// Validated holder of a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TransferTarget {
    assign_to_type: AssignToType,
    user_id: Option<Uuid>,
    site_id: Option<i32>,
    area_id: Option<i32>,
}

#[derive(Debug, Clone)]
struct TransferPlan {
    target: TransferTarget,
    transfer_date: NaiveDate,
    due_date: Option<NaiveDate>,
    note: Option<String>,
}

#[derive(Debug, Clone)]
struct DisposalPlan {
    method: DisposalMethod,
    date: NaiveDate,
    document_path: Option<String>,
    comment: Option<String>,
}

fn check_transfer_dates(
    transfer_date: NaiveDate,
    due_date: Option<NaiveDate>,
) -> Result<(), ServiceError> {
    match due_date {
        Some(due) if due < transfer_date => Err(ServiceError::ValidationError(
            "Due date cannot be earlier than the transfer date".to_string(),
        )),
        _ => Ok(()),
    }
}

/// Resolves the target to exactly one holder kind.
async fn resolve_target<C: ConnectionTrait>(
    db: &C,
    organization_id: i32,
    assign_to_type: AssignToType,
    user_id: Option<Uuid>,
    site_id: Option<i32>,
    area_id: Option<i32>,
) -> Result<TransferTarget, ServiceError> {
    let org = Some(organization_id);
    match assign_to_type {
        AssignToType::User => {
            let user_id = user_id.ok_or_else(|| {
                ServiceError::ValidationError("A user transfer requires user_id".to_string())
            })?;
            if site_id.is_some() || area_id.is_some() {
                return Err(ServiceError::ValidationError(
                    "A user transfer cannot also name a site or area".to_string(),
                ));
            }
            let holder = user::Entity::find_by_id(user_id)
                .filter(user::Column::OrganizationId.eq(organization_id))
                .filter(user::Column::IsDeleted.eq(false))
                .one(db)
                .await
                .map_err(ServiceError::db_error)?;
            if holder.is_none() {
                return Err(ServiceError::ValidationError(format!(
                    "User {} does not exist",
                    user_id
                )));
            }
            Ok(TransferTarget {
                assign_to_type,
                user_id: Some(user_id),
                site_id: None,
                area_id: None,
            })
        }
        AssignToType::Location => {
            let site_id = site_id.ok_or_else(|| {
                ServiceError::ValidationError("A location transfer requires site_id".to_string())
            })?;
            if user_id.is_some() {
                return Err(ServiceError::ValidationError(
                    "A location transfer cannot also name a user".to_string(),
                ));
            }
            require_reference::<site::Entity, _>(db, org, site_id).await?;
            if let Some(area_id) = area_id {
                let area = require_reference::<area::Entity, _>(db, org, area_id).await?;
                if area.site_id != site_id {
                    return Err(ServiceError::ValidationError(format!(
                        "Area {} does not belong to site {}",
                        area_id, site_id
                    )));
                }
            }
            Ok(TransferTarget {
                assign_to_type,
                user_id: None,
                site_id: Some(site_id),
                area_id,
            })
        }
        AssignToType::NotAssigned => {
            if user_id.is_some() || site_id.is_some() || area_id.is_some() {
                return Err(ServiceError::ValidationError(
                    "Unassigning an asset takes no user, site or area".to_string(),
                ));
            }
            Ok(TransferTarget {
                assign_to_type,
                user_id: None,
                site_id: None,
                area_id: None,
            })
        }
        AssignToType::Disposed => Err(ServiceError::ValidationError(
            "Use the dispose operation to dispose an asset".to_string(),
        )),
    }
}

async fn find_asset<C: ConnectionTrait>(
    db: &C,
    organization_id: i32,
    id: i32,
) -> Result<asset::Model, ServiceError> {
    asset::Entity::find_by_id(id)
        .filter(asset::Column::OrganizationId.eq(organization_id))
        .one(db)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::not_found("Asset", id))
}

async fn find_live_asset<C: ConnectionTrait>(
    db: &C,
    organization_id: i32,
    id: i32,
) -> Result<asset::Model, ServiceError> {
    let asset = find_asset(db, organization_id, id).await?;
    if asset.is_deleted {
        return Err(ServiceError::not_found("Asset", id));
    }
    Ok(asset)
}

fn ensure_not_disposed(asset: &asset::Model) -> Result<(), ServiceError> {
    if asset.is_disposed {
        return Err(ServiceError::InvalidOperation(format!(
            "Asset {} is already disposed",
            asset.id
        )));
    }
    Ok(())
}

async fn pending_request_for<C: ConnectionTrait>(
    db: &C,
    asset_id: i32,
) -> Result<Option<asset_request::Model>, ServiceError> {
    asset_request::Entity::find()
        .filter(asset_request::Column::AssetId.eq(asset_id))
        .filter(asset_request::Column::Status.eq(ApprovalStatus::Pending))
        .one(db)
        .await
        .map_err(ServiceError::db_error)
}

async fn ensure_no_pending_request<C: ConnectionTrait>(
    db: &C,
    asset_id: i32,
) -> Result<(), ServiceError> {
    if let Some(pending) = pending_request_for(db, asset_id).await? {
        return Err(ServiceError::InvalidOperation(format!(
            "Asset {} already has pending request {}",
            asset_id, pending.id
        )));
    }
    Ok(())
}

async fn close_active_assignments<C: ConnectionTrait>(
    db: &C,
    asset_id: i32,
) -> Result<(), ServiceError> {
    asset_assigned::Entity::update_many()
        .col_expr(asset_assigned::Column::IsActive, Expr::value(false))
        .col_expr(asset_assigned::Column::ClosedAt, Expr::value(Some(Utc::now())))
        .filter(asset_assigned::Column::AssetId.eq(asset_id))
        .filter(asset_assigned::Column::IsActive.eq(true))
        .exec(db)
        .await
        .map_err(ServiceError::db_error)?;
    Ok(())
}

async fn open_assignment<C: ConnectionTrait>(
    db: &C,
    asset: &asset::Model,
    actor: Uuid,
    target: TransferTarget,
    assigned_date: NaiveDate,
    due_date: Option<NaiveDate>,
    note: Option<String>,
) -> Result<asset_assigned::Model, ServiceError> {
    close_active_assignments(db, asset.id).await?;
    asset_assigned::ActiveModel {
        asset_id: Set(asset.id),
        organization_id: Set(asset.organization_id),
        assign_to_type: Set(target.assign_to_type),
        user_id: Set(target.user_id),
        site_id: Set(target.site_id),
        area_id: Set(target.area_id),
        assigned_date: Set(assigned_date),
        due_date: Set(due_date),
        note: Set(note),
        is_active: Set(true),
        created_by: Set(actor),
        created_at: Set(Utc::now()),
        closed_at: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(ServiceError::db_error)
}

async fn append_history<C: ConnectionTrait>(
    db: &C,
    asset: &asset::Model,
    event: AssetEvent,
    target: Option<TransferTarget>,
    note: Option<String>,
    actor: Uuid,
) -> Result<asset_history::Model, ServiceError> {
    asset_history::ActiveModel {
        asset_id: Set(asset.id),
        organization_id: Set(asset.organization_id),
        event: Set(event),
        assign_to_type: Set(target.map(|t| t.assign_to_type)),
        user_id: Set(target.and_then(|t| t.user_id)),
        site_id: Set(target.and_then(|t| t.site_id)),
        area_id: Set(target.and_then(|t| t.area_id)),
        note: Set(note),
        performed_by: Set(actor),
        performed_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(ServiceError::db_error)
}

async fn status_id_of<C: ConnectionTrait>(
    db: &C,
    organization_id: i32,
    kind: AssetStatusKind,
) -> Result<i32, ServiceError> {
    ensure_seeded_statuses(db, organization_id, None).await?;
    Ok(seeded_status(db, organization_id, kind).await?.id)
}

async fn apply_transfer<C: ConnectionTrait>(
    db: &C,
    asset: asset::Model,
    actor: Uuid,
    plan: TransferPlan,
) -> Result<(), ServiceError> {
    let kind = match plan.target.assign_to_type {
        AssignToType::NotAssigned => AssetStatusKind::Available,
        _ => AssetStatusKind::InUse,
    };
    let status_id = status_id_of(db, asset.organization_id, kind).await?;

    open_assignment(
        db,
        &asset,
        actor,
        plan.target,
        plan.transfer_date,
        plan.due_date,
        plan.note.clone(),
    )
    .await?;
    append_history(
        db,
        &asset,
        AssetEvent::Transferred,
        Some(plan.target),
        plan.note,
        actor,
    )
    .await?;

    let mut active: asset::ActiveModel = asset.into();
    active.asset_status_id = Set(status_id);
    active.modified_by = Set(Some(actor));
    active.update(db).await.map_err(ServiceError::db_error)?;
    Ok(())
}

async fn apply_disposal<C: ConnectionTrait>(
    db: &C,
    asset: asset::Model,
    actor: Uuid,
    plan: DisposalPlan,
) -> Result<(), ServiceError> {
    let status_id = status_id_of(db, asset.organization_id, AssetStatusKind::Disposed).await?;

    asset_disposal::ActiveModel {
        asset_id: Set(asset.id),
        organization_id: Set(asset.organization_id),
        disposal_method: Set(plan.method),
        disposal_date: Set(plan.date),
        document_path: Set(plan.document_path),
        comment: Set(plan.comment.clone()),
        disposed_by: Set(actor),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(ServiceError::db_error)?;

    let target = TransferTarget {
        assign_to_type: AssignToType::Disposed,
        user_id: None,
        site_id: None,
        area_id: None,
    };
    open_assignment(db, &asset, actor, target, plan.date, None, plan.comment.clone()).await?;
    append_history(
        db,
        &asset,
        AssetEvent::Disposed,
        Some(target),
        plan.comment,
        actor,
    )
    .await?;

    let mut active: asset::ActiveModel = asset.into();
    active.is_disposed = Set(true);
    active.asset_status_id = Set(status_id);
    active.modified_by = Set(Some(actor));
    active.update(db).await.map_err(ServiceError::db_error)?;
    Ok(())
}

/// Display names needed to project assets of one organization.
#[derive(Debug, Default)]
struct NameLookup {
    categories: HashMap<i32, String>,
    sub_categories: HashMap<i32, String>,
    suppliers: HashMap<i32, String>,
    sites: HashMap<i32, String>,
    areas: HashMap<i32, String>,
    departments: HashMap<i32, String>,
    sub_departments: HashMap<i32, String>,
    statuses: HashMap<i32, String>,
    users: HashMap<Uuid, String>,
}

async fn names_of<E, C>(db: &C, organization_id: i32) -> Result<HashMap<i32, String>, ServiceError>
where
    E: ReferenceEntity,
    C: ConnectionTrait,
{
    let mut query = E::find()
        .select_only()
        .column(E::id_column())
        .column(E::name_column());
    if let Some(column) = E::organization_column() {
        query = query.filter(column.eq(organization_id));
    }
    let rows: Vec<(i32, String)> = query
        .into_tuple()
        .all(db)
        .await
        .map_err(ServiceError::db_error)?;
    Ok(rows.into_iter().collect())
}

impl NameLookup {
    async fn load<C: ConnectionTrait>(
        db: &C,
        organization_id: i32,
        user_ids: Vec<Uuid>,
    ) -> Result<Self, ServiceError> {
        let users: Vec<(Uuid, String)> = if user_ids.is_empty() {
            Vec::new()
        } else {
            user::Entity::find()
                .select_only()
                .column(user::Column::Id)
                .column(user::Column::FullName)
                .filter(user::Column::Id.is_in(user_ids))
                .into_tuple()
                .all(db)
                .await
                .map_err(ServiceError::db_error)?
        };

        Ok(Self {
            categories: names_of::<category::Entity, _>(db, organization_id).await?,
            sub_categories: names_of::<sub_category::Entity, _>(db, organization_id).await?,
            suppliers: names_of::<supplier::Entity, _>(db, organization_id).await?,
            sites: names_of::<site::Entity, _>(db, organization_id).await?,
            areas: names_of::<area::Entity, _>(db, organization_id).await?,
            departments: names_of::<department::Entity, _>(db, organization_id).await?,
            sub_departments: names_of::<sub_department::Entity, _>(db, organization_id).await?,
            statuses: names_of::<asset_status::Entity, _>(db, organization_id).await?,
            users: users.into_iter().collect(),
        })
    }

    fn name(map: &HashMap<i32, String>, id: Option<i32>) -> Option<String> {
        id.and_then(|id| map.get(&id).cloned())
    }

    fn detail(&self, asset: asset::Model, assignment: Option<asset_assigned::Model>) -> AssetDetail {
        let assignment = assignment.map(|a| AssignmentView {
            assign_to_type: a.assign_to_type,
            user_id: a.user_id,
            user_name: a.user_id.and_then(|id| self.users.get(&id).cloned()),
            site_id: a.site_id,
            site_name: Self::name(&self.sites, a.site_id),
            area_id: a.area_id,
            area_name: Self::name(&self.areas, a.area_id),
            assigned_date: a.assigned_date,
            due_date: a.due_date,
            note: a.note,
        });
        AssetDetail {
            category_name: Self::name(&self.categories, Some(asset.category_id)),
            sub_category_name: Self::name(&self.sub_categories, asset.sub_category_id),
            supplier_name: Self::name(&self.suppliers, asset.supplier_id),
            site_name: Self::name(&self.sites, Some(asset.site_id)),
            area_name: Self::name(&self.areas, asset.area_id),
            department_name: Self::name(&self.departments, asset.department_id),
            sub_department_name: Self::name(&self.sub_departments, asset.sub_department_id),
            status_name: Self::name(&self.statuses, Some(asset.asset_status_id)),
            asset,
            assignment,
        }
    }
}

/// Owns assets and their transfer, disposal and approval workflow.
#[derive(Clone)]
pub struct AssetService {
    db_pool: Arc<DbPool>,
    storage: Arc<dyn FileStorage>,
    event_sender: Arc<EventSender>,
    approval: ApprovalPolicy,
    logger: Logger,
}

impl AssetService {
    pub fn new(
        db_pool: Arc<DbPool>,
        storage: Arc<dyn FileStorage>,
        event_sender: Arc<EventSender>,
        approval: ApprovalPolicy,
        logger: Logger,
    ) -> Self {
        Self {
            db_pool,
            storage,
            event_sender,
            approval,
            logger,
        }
    }

    pub fn approval_policy(&self) -> ApprovalPolicy {
        self.approval
    }

    async fn project(
        &self,
        organization_id: i32,
        assets: Vec<asset::Model>,
    ) -> Result<Vec<AssetDetail>, ServiceError> {
        let db = self.db_pool.as_ref();
        let ids: Vec<i32> = assets.iter().map(|a| a.id).collect();
        let mut assignments: HashMap<i32, asset_assigned::Model> = if ids.is_empty() {
            HashMap::new()
        } else {
            asset_assigned::Entity::find()
                .filter(asset_assigned::Column::AssetId.is_in(ids))
                .filter(asset_assigned::Column::IsActive.eq(true))
                .all(db)
                .await
                .map_err(ServiceError::db_error)?
                .into_iter()
                .map(|a| (a.asset_id, a))
                .collect()
        };
        let user_ids: Vec<Uuid> = assignments.values().filter_map(|a| a.user_id).collect();
        let lookup = NameLookup::load(db, organization_id, user_ids).await?;

        Ok(assets
            .into_iter()
            .map(|asset| {
                let assignment = assignments.remove(&asset.id);
                lookup.detail(asset, assignment)
            })
            .collect())
    }

    async fn project_one(
        &self,
        organization_id: i32,
        asset: asset::Model,
    ) -> Result<AssetDetail, ServiceError> {
        let id = asset.id;
        self.project(organization_id, vec![asset])
            .await?
            .pop()
            .ok_or_else(|| ServiceError::not_found("Asset", id))
    }

    /// Registers an asset with a `NotAssigned` assignment and a `Created` history row.
    #[instrument(skip(self, request), fields(org = ctx.organization_id))]
    pub async fn create_asset(
        &self,
        ctx: &OrgContext,
        request: CreateAssetRequest,
    ) -> Result<AssetDetail, ServiceError> {
        request.validate()?;
        let draft = AssetDraft::from_create(&request)?;
        draft.check_values()?;
        let status_id = draft
            .check_references(self.db_pool.as_ref(), ctx.organization_id)
            .await?;

        let mut staged = StagedFiles::new(self.storage.clone(), ctx.organization_id);
        let files = match AssetFiles::stage(
            &mut staged,
            request.image.as_ref(),
            request.delivery_note.as_ref(),
            request.receipt.as_ref(),
            request.invoice.as_ref(),
        )
        .await
        {
            Ok(files) => files,
            Err(e) => {
                staged.rollback().await;
                return Err(e);
            }
        };

        let created = match self.insert_asset(ctx, draft, status_id, files).await {
            Ok(created) => created,
            Err(e) => {
                error!(error = %e, "asset create failed, removing staged files");
                staged.rollback().await;
                return Err(e);
            }
        };

        counter!("sams_asset_transitions_total", 1, "transition" => "created");
        slog::info!(self.logger, "asset created"; "asset_id" => created.id, "org" => ctx.organization_id, "actor" => %ctx.user_id);
        self.event_sender
            .publish(Event::AssetCreated {
                organization_id: ctx.organization_id,
                asset_id: created.id,
            })
            .await;
        self.project_one(ctx.organization_id, created).await
    }

    async fn insert_asset(
        &self,
        ctx: &OrgContext,
        draft: AssetDraft,
        status_id: i32,
        files: AssetFiles,
    ) -> Result<asset::Model, ServiceError> {
        let txn = self.db_pool.begin().await.map_err(ServiceError::db_error)?;
        let assigned_date = draft
            .acquisition_date
            .unwrap_or_else(|| Utc::now().date_naive());

        let mut active = asset::ActiveModel {
            organization_id: Set(ctx.organization_id),
            image_path: Set(files.image),
            delivery_note_path: Set(files.delivery_note),
            receipt_path: Set(files.receipt),
            invoice_path: Set(files.invoice),
            is_disposed: Set(false),
            is_deleted: Set(false),
            created_by: Set(ctx.user_id),
            ..Default::default()
        };
        draft.apply(&mut active, status_id);
        let created = active.insert(&txn).await.map_err(ServiceError::db_error)?;

        let unassigned = TransferTarget {
            assign_to_type: AssignToType::NotAssigned,
            user_id: None,
            site_id: None,
            area_id: None,
        };
        open_assignment(&txn, &created, ctx.user_id, unassigned, assigned_date, None, None)
            .await?;
        append_history(&txn, &created, AssetEvent::Created, None, None, ctx.user_id).await?;

        txn.commit().await.map_err(ServiceError::db_error)?;
        Ok(created)
    }

    /// Updates the fields present in the request. Replaced files are removed
    /// after the update commits.
    #[instrument(skip(self, request), fields(org = ctx.organization_id, asset_id = request.id))]
    pub async fn update_asset(
        &self,
        ctx: &OrgContext,
        request: UpdateAssetRequest,
    ) -> Result<AssetDetail, ServiceError> {
        request.validate()?;
        let db = self.db_pool.as_ref();
        let existing = find_live_asset(db, ctx.organization_id, request.id).await?;
        ensure_not_disposed(&existing)?;
        let draft = AssetDraft::merged(&existing, &request)?;
        draft.check_values()?;
        let status_id = draft.check_references(db, ctx.organization_id).await?;

        let mut staged = StagedFiles::new(self.storage.clone(), ctx.organization_id);
        let files = match AssetFiles::stage(
            &mut staged,
            request.image.as_ref(),
            request.delivery_note.as_ref(),
            request.receipt.as_ref(),
            request.invoice.as_ref(),
        )
        .await
        {
            Ok(files) => files,
            Err(e) => {
                staged.rollback().await;
                return Err(e);
            }
        };

        let mut active: asset::ActiveModel = existing.clone().into();
        draft.apply(&mut active, status_id);
        let replaced = files.apply(&existing, &mut active);
        active.modified_by = Set(Some(ctx.user_id));

        let result = async {
            let txn = self.db_pool.begin().await.map_err(ServiceError::db_error)?;
            let updated = active.update(&txn).await.map_err(ServiceError::db_error)?;
            append_history(&txn, &updated, AssetEvent::Updated, None, None, ctx.user_id).await?;
            txn.commit().await.map_err(ServiceError::db_error)?;
            Ok::<_, ServiceError>(updated)
        }
        .await;

        let updated = match result {
            Ok(updated) => updated,
            Err(e) => {
                error!(error = %e, "asset update failed, removing staged files");
                staged.rollback().await;
                return Err(e);
            }
        };
        remove_replaced(self.storage.as_ref(), replaced).await;

        counter!("sams_asset_transitions_total", 1, "transition" => "updated");
        self.event_sender
            .publish(Event::AssetUpdated {
                organization_id: ctx.organization_id,
                asset_id: updated.id,
            })
            .await;
        self.project_one(ctx.organization_id, updated).await
    }

    /// Moves an asset to a user, a location or back to unassigned, directly or
    /// through an approval request.
    #[instrument(skip(self, request), fields(org = ctx.organization_id, asset_id = request.asset_id))]
    pub async fn transfer_asset(
        &self,
        ctx: &OrgContext,
        request: TransferAssetRequest,
    ) -> Result<AssetActionOutcome, ServiceError> {
        request.validate()?;
        check_transfer_dates(request.transfer_date, request.due_date)?;
        let db = self.db_pool.as_ref();
        let asset = find_live_asset(db, ctx.organization_id, request.asset_id).await?;
        ensure_not_disposed(&asset)?;
        let target = resolve_target(
            db,
            ctx.organization_id,
            request.assign_to_type,
            request.user_id,
            request.site_id,
            request.area_id,
        )
        .await?;
        ensure_no_pending_request(db, asset.id).await?;
        let note = normalize_optional(request.note);

        if self.approval.required {
            let pending = asset_request::ActiveModel {
                organization_id: Set(ctx.organization_id),
                asset_id: Set(asset.id),
                request_type: Set(AssetRequestType::Transfer),
                assign_to_type: Set(Some(target.assign_to_type)),
                user_id: Set(target.user_id),
                site_id: Set(target.site_id),
                area_id: Set(target.area_id),
                transfer_date: Set(Some(request.transfer_date)),
                due_date: Set(request.due_date),
                note: Set(note),
                ..self.new_request(ctx)
            }
            .insert(db)
            .await
            .map_err(ServiceError::db_error)?;
            return Ok(self.request_raised(ctx, pending).await);
        }

        let plan = TransferPlan {
            target,
            transfer_date: request.transfer_date,
            due_date: request.due_date,
            note,
        };
        let txn = self.db_pool.begin().await.map_err(ServiceError::db_error)?;
        apply_transfer(&txn, asset, ctx.user_id, plan).await?;
        txn.commit().await.map_err(ServiceError::db_error)?;

        self.transferred(ctx, request.asset_id, target).await;
        let asset = find_asset(db, ctx.organization_id, request.asset_id).await?;
        Ok(AssetActionOutcome::Applied {
            asset: self.project_one(ctx.organization_id, asset).await?,
        })
    }

    /// Disposes an asset, directly or through an approval request. Disposal is
    /// terminal.
    #[instrument(skip(self, request), fields(org = ctx.organization_id, asset_id = request.asset_id))]
    pub async fn dispose_asset(
        &self,
        ctx: &OrgContext,
        request: DisposeAssetRequest,
    ) -> Result<AssetActionOutcome, ServiceError> {
        request.validate()?;
        let db = self.db_pool.as_ref();
        let asset = find_live_asset(db, ctx.organization_id, request.asset_id).await?;
        ensure_not_disposed(&asset)?;
        ensure_no_pending_request(db, asset.id).await?;
        let comment = normalize_optional(request.comment);

        let mut staged = StagedFiles::new(self.storage.clone(), ctx.organization_id);
        let document_path = match staged.stage(DISPOSAL_FOLDER, request.document.as_ref()).await {
            Ok(path) => path,
            Err(e) => {
                staged.rollback().await;
                return Err(e);
            }
        };

        if self.approval.required {
            let inserted = asset_request::ActiveModel {
                organization_id: Set(ctx.organization_id),
                asset_id: Set(asset.id),
                request_type: Set(AssetRequestType::Dispose),
                disposal_method: Set(Some(request.disposal_method)),
                disposal_date: Set(Some(request.disposal_date)),
                document_path: Set(document_path),
                comment: Set(comment),
                ..self.new_request(ctx)
            }
            .insert(db)
            .await;
            return match inserted {
                Ok(pending) => Ok(self.request_raised(ctx, pending).await),
                Err(e) => {
                    staged.rollback().await;
                    Err(ServiceError::db_error(e))
                }
            };
        }

        let plan = DisposalPlan {
            method: request.disposal_method,
            date: request.disposal_date,
            document_path,
            comment,
        };
        let result = async {
            let txn = self.db_pool.begin().await.map_err(ServiceError::db_error)?;
            apply_disposal(&txn, asset, ctx.user_id, plan).await?;
            txn.commit().await.map_err(ServiceError::db_error)
        }
        .await;
        if let Err(e) = result {
            error!(error = %e, "asset disposal failed, removing staged document");
            staged.rollback().await;
            return Err(e);
        }

        self.disposed(ctx, request.asset_id).await;
        let asset = find_asset(db, ctx.organization_id, request.asset_id).await?;
        Ok(AssetActionOutcome::Applied {
            asset: self.project_one(ctx.organization_id, asset).await?,
        })
    }

    fn new_request(&self, ctx: &OrgContext) -> asset_request::ActiveModel {
        asset_request::ActiveModel {
            status: Set(ApprovalStatus::Pending),
            required_levels: Set(self.approval.levels),
            approved_levels: Set(0),
            requested_by: Set(ctx.user_id),
            requested_at: Set(Utc::now()),
            ..Default::default()
        }
    }

    async fn request_raised(
        &self,
        ctx: &OrgContext,
        pending: asset_request::Model,
    ) -> AssetActionOutcome {
        counter!("sams_asset_requests_total", 1, "decision" => "raised");
        slog::info!(self.logger, "asset request raised";
            "request_id" => pending.id, "asset_id" => pending.asset_id,
            "type" => ?pending.request_type, "org" => ctx.organization_id);
        self.event_sender
            .publish(Event::AssetRequestRaised {
                organization_id: ctx.organization_id,
                request_id: pending.id,
                asset_id: pending.asset_id,
            })
            .await;
        AssetActionOutcome::PendingApproval { request: pending }
    }

    async fn transferred(&self, ctx: &OrgContext, asset_id: i32, target: TransferTarget) {
        counter!("sams_asset_transitions_total", 1, "transition" => "transferred");
        slog::info!(self.logger, "asset transferred";
            "asset_id" => asset_id, "to" => ?target.assign_to_type,
            "org" => ctx.organization_id, "actor" => %ctx.user_id);
        self.event_sender
            .publish(Event::AssetTransferred {
                organization_id: ctx.organization_id,
                asset_id,
            })
            .await;
    }

    async fn disposed(&self, ctx: &OrgContext, asset_id: i32) {
        counter!("sams_asset_transitions_total", 1, "transition" => "disposed");
        slog::info!(self.logger, "asset disposed";
            "asset_id" => asset_id, "org" => ctx.organization_id, "actor" => %ctx.user_id);
        self.event_sender
            .publish(Event::AssetDisposed {
                organization_id: ctx.organization_id,
                asset_id,
            })
            .await;
    }

    async fn find_request<C: ConnectionTrait>(
        db: &C,
        organization_id: i32,
        id: i32,
    ) -> Result<asset_request::Model, ServiceError> {
        asset_request::Entity::find_by_id(id)
            .filter(asset_request::Column::OrganizationId.eq(organization_id))
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::not_found("Asset request", id))
    }

    /// Signs the level the request is waiting for. The last required level
    /// approves the request and applies its effect in the same transaction.
    #[instrument(skip(self, request), fields(org = ctx.organization_id, request_id = request.request_id))]
    pub async fn approve_request(
        &self,
        ctx: &OrgContext,
        request: ApproveAssetRequest,
    ) -> Result<AssetRequestDecision, ServiceError> {
        let txn = self.db_pool.begin().await.map_err(ServiceError::db_error)?;
        let pending = Self::find_request(&txn, ctx.organization_id, request.request_id).await?;
        let Some(level) = pending.awaiting_level() else {
            return Err(ServiceError::InvalidOperation(format!(
                "Asset request {} is not pending",
                pending.id
            )));
        };
        if pending.requested_by == ctx.user_id {
            return Err(ServiceError::Forbidden(
                "A request cannot be approved by its requester".to_string(),
            ));
        }
        let signed = [
            pending.level1_approved_by,
            pending.level2_approved_by,
            pending.level3_approved_by,
        ];
        if signed.iter().flatten().any(|approver| *approver == ctx.user_id) {
            return Err(ServiceError::InvalidOperation(format!(
                "Asset request {} already carries your approval",
                pending.id
            )));
        }

        let now = Utc::now();
        let approved_levels = pending.approved_levels + 1;
        let completed = approved_levels >= pending.required_levels;
        let mut active: asset_request::ActiveModel = pending.clone().into();
        match level {
            ApprovalLevel::Level1 => {
                active.level1_approved_by = Set(Some(ctx.user_id));
                active.level1_approved_at = Set(Some(now));
            }
            ApprovalLevel::Level2 => {
                active.level2_approved_by = Set(Some(ctx.user_id));
                active.level2_approved_at = Set(Some(now));
            }
            ApprovalLevel::Level3 => {
                active.level3_approved_by = Set(Some(ctx.user_id));
                active.level3_approved_at = Set(Some(now));
            }
        }
        active.approved_levels = Set(approved_levels);
        if completed {
            active.status = Set(ApprovalStatus::Approved);
            active.decided_by = Set(Some(ctx.user_id));
            active.decided_at = Set(Some(now));
        }
        // Guarded on the state read above: a level is signed once and a decided
        // request is never reopened.
        let result = asset_request::Entity::update_many()
            .set(active)
            .filter(asset_request::Column::Id.eq(pending.id))
            .filter(asset_request::Column::Status.eq(ApprovalStatus::Pending))
            .filter(asset_request::Column::ApprovedLevels.eq(pending.approved_levels))
            .exec(&txn)
            .await
            .map_err(ServiceError::db_error)?;
        if result.rows_affected == 0 {
            return Err(ServiceError::InvalidOperation(format!(
                "Asset request {} was decided concurrently",
                pending.id
            )));
        }
        let updated = Self::find_request(&txn, ctx.organization_id, pending.id).await?;

        let mut transfer_target = None;
        if completed {
            let asset = find_live_asset(&txn, ctx.organization_id, pending.asset_id).await?;
            ensure_not_disposed(&asset)?;
            match pending.request_type {
                AssetRequestType::Transfer => {
                    let target = resolve_target(
                        &txn,
                        ctx.organization_id,
                        pending.assign_to_type.unwrap_or(AssignToType::NotAssigned),
                        pending.user_id,
                        pending.site_id,
                        pending.area_id,
                    )
                    .await?;
                    let plan = TransferPlan {
                        target,
                        transfer_date: pending
                            .transfer_date
                            .unwrap_or_else(|| now.date_naive()),
                        due_date: pending.due_date,
                        note: pending.note.clone(),
                    };
                    apply_transfer(&txn, asset, ctx.user_id, plan).await?;
                    transfer_target = Some(target);
                }
                AssetRequestType::Dispose => {
                    let method = pending.disposal_method.ok_or_else(|| {
                        ServiceError::InternalError(format!(
                            "disposal request {} has no method",
                            pending.id
                        ))
                    })?;
                    let plan = DisposalPlan {
                        method,
                        date: pending.disposal_date.unwrap_or_else(|| now.date_naive()),
                        document_path: pending.document_path.clone(),
                        comment: pending.comment.clone(),
                    };
                    apply_disposal(&txn, asset, ctx.user_id, plan).await?;
                }
            }
        }
        txn.commit().await.map_err(ServiceError::db_error)?;

        counter!("sams_asset_requests_total", 1, "decision" => "approved");
        slog::info!(self.logger, "asset request signed";
            "request_id" => updated.id, "level" => level.index(), "completed" => completed,
            "org" => ctx.organization_id, "actor" => %ctx.user_id);
        self.event_sender
            .publish(Event::AssetRequestApproved {
                organization_id: ctx.organization_id,
                request_id: updated.id,
                level: level.index(),
                completed,
            })
            .await;

        if !completed {
            return Ok(AssetRequestDecision {
                request: updated,
                asset: None,
            });
        }
        match transfer_target {
            Some(target) => self.transferred(ctx, updated.asset_id, target).await,
            None => self.disposed(ctx, updated.asset_id).await,
        }
        let asset = find_asset(self.db_pool.as_ref(), ctx.organization_id, updated.asset_id).await?;
        Ok(AssetRequestDecision {
            asset: Some(self.project_one(ctx.organization_id, asset).await?),
            request: updated,
        })
    }

    /// Rejects a pending request. The asset is left untouched.
    #[instrument(skip(self, request), fields(org = ctx.organization_id, request_id = request.request_id))]
    pub async fn reject_request(
        &self,
        ctx: &OrgContext,
        request: RejectAssetRequest,
    ) -> Result<AssetRequestDecision, ServiceError> {
        request.validate()?;
        let db = self.db_pool.as_ref();
        let pending = Self::find_request(db, ctx.organization_id, request.request_id).await?;
        if !pending.is_pending() {
            return Err(ServiceError::InvalidOperation(format!(
                "Asset request {} is not pending",
                pending.id
            )));
        }

        let orphaned_document = pending.document_path.clone();
        let mut active: asset_request::ActiveModel = pending.into();
        active.status = Set(ApprovalStatus::Rejected);
        active.decided_by = Set(Some(ctx.user_id));
        active.decided_at = Set(Some(Utc::now()));
        active.rejection_reason = Set(normalize_optional(request.reason));
        // Guarded on status so a concurrent decision cannot be overwritten.
        let result = asset_request::Entity::update_many()
            .set(active)
            .filter(asset_request::Column::Id.eq(request.request_id))
            .filter(asset_request::Column::Status.eq(ApprovalStatus::Pending))
            .exec(db)
            .await
            .map_err(ServiceError::db_error)?;
        if result.rows_affected == 0 {
            return Err(ServiceError::InvalidOperation(format!(
                "Asset request {} is not pending",
                request.request_id
            )));
        }
        let updated = Self::find_request(db, ctx.organization_id, request.request_id).await?;
        remove_replaced(self.storage.as_ref(), orphaned_document.into_iter().collect()).await;

        counter!("sams_asset_requests_total", 1, "decision" => "rejected");
        slog::info!(self.logger, "asset request rejected";
            "request_id" => updated.id, "org" => ctx.organization_id, "actor" => %ctx.user_id);
        self.event_sender
            .publish(Event::AssetRequestRejected {
                organization_id: ctx.organization_id,
                request_id: updated.id,
            })
            .await;
        Ok(AssetRequestDecision {
            request: updated,
            asset: None,
        })
    }

    /// Soft delete, refused while a request for the asset is pending.
    #[instrument(skip(self), fields(org = ctx.organization_id))]
    pub async fn delete_asset(&self, ctx: &OrgContext, id: i32) -> Result<(), ServiceError> {
        let txn = self.db_pool.begin().await.map_err(ServiceError::db_error)?;
        let asset = find_live_asset(&txn, ctx.organization_id, id).await?;
        if let Some(pending) = pending_request_for(&txn, id).await? {
            return Err(ServiceError::InvalidOperation(format!(
                "Asset {} cannot be deleted while request {} is pending",
                id, pending.id
            )));
        }

        append_history(&txn, &asset, AssetEvent::Deleted, None, None, ctx.user_id).await?;
        let mut active: asset::ActiveModel = asset.into();
        active.is_deleted = Set(true);
        active.modified_by = Set(Some(ctx.user_id));
        active.update(&txn).await.map_err(ServiceError::db_error)?;
        txn.commit().await.map_err(ServiceError::db_error)?;

        counter!("sams_asset_transitions_total", 1, "transition" => "deleted");
        slog::info!(self.logger, "asset deleted"; "asset_id" => id, "org" => ctx.organization_id, "actor" => %ctx.user_id);
        self.event_sender
            .publish(Event::AssetDeleted {
                organization_id: ctx.organization_id,
                asset_id: id,
            })
            .await;
        Ok(())
    }

    /// Asset by id, soft-deleted ones included.
    pub async fn get_asset(&self, ctx: &OrgContext, id: i32) -> Result<AssetDetail, ServiceError> {
        let asset = find_asset(self.db_pool.as_ref(), ctx.organization_id, id).await?;
        self.project_one(ctx.organization_id, asset).await
    }

    /// Non-deleted assets of the organization; disposed ones only on request.
    pub async fn list_assets(
        &self,
        ctx: &OrgContext,
        query: AssetListQuery,
    ) -> Result<Vec<AssetDetail>, ServiceError> {
        let mut select = asset::Entity::find()
            .filter(asset::Column::OrganizationId.eq(ctx.organization_id))
            .filter(asset::Column::IsDeleted.eq(false));
        if !query.include_disposed {
            select = select.filter(asset::Column::IsDisposed.eq(false));
        }
        let assets = select
            .order_by_asc(asset::Column::Name)
            .order_by_asc(asset::Column::Id)
            .all(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?;
        self.project(ctx.organization_id, assets).await
    }

    /// History of one asset, newest first.
    pub async fn asset_history(
        &self,
        ctx: &OrgContext,
        asset_id: i32,
    ) -> Result<Vec<asset_history::Model>, ServiceError> {
        let db = self.db_pool.as_ref();
        find_asset(db, ctx.organization_id, asset_id).await?;
        asset_history::Entity::find()
            .filter(asset_history::Column::AssetId.eq(asset_id))
            .order_by_desc(asset_history::Column::PerformedAt)
            .order_by_desc(asset_history::Column::Id)
            .all(db)
            .await
            .map_err(ServiceError::db_error)
    }

    pub async fn pending_requests(
        &self,
        ctx: &OrgContext,
    ) -> Result<Vec<asset_request::Model>, ServiceError> {
        asset_request::Entity::find()
            .filter(asset_request::Column::OrganizationId.eq(ctx.organization_id))
            .filter(asset_request::Column::Status.eq(ApprovalStatus::Pending))
            .order_by_asc(asset_request::Column::RequestedAt)
            .order_by_asc(asset_request::Column::Id)
            .all(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)
    }

    /// Active assignment row of an asset.
    pub async fn current_assignment(
        &self,
        ctx: &OrgContext,
        asset_id: i32,
    ) -> Result<Option<asset_assigned::Model>, ServiceError> {
        let db = self.db_pool.as_ref();
        find_asset(db, ctx.organization_id, asset_id).await?;
        let mut active = asset_assigned::Entity::find()
            .filter(asset_assigned::Column::AssetId.eq(asset_id))
            .filter(asset_assigned::Column::IsActive.eq(true))
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;
        if active.len() > 1 {
            warn!(asset_id, rows = active.len(), "asset has several active assignments");
        }
        Ok(active.pop())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn draft() -> AssetDraft {
        AssetDraft::from_create(&CreateAssetRequest {
            name: " Laptop ".into(),
            quantity: 1,
            unit_price: dec!(1200.00),
            category_id: 1,
            site_id: 1,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn draft_trims_name() {
        assert_eq!(draft().name, "Laptop");
    }

    #[test]
    fn depreciable_asset_requires_cost() {
        let mut d = draft();
        d.is_depreciable = true;
        d.salvage_value = Some(dec!(100));
        d.depreciation_months = Some(36);
        d.depreciation_method = Some(DepreciationMethod::StraightLine);
        let err = d.check_values().unwrap_err();
        assert_matches!(err, ServiceError::ValidationError(ref msg) if msg.contains("Depreciable cost"));
    }

    #[test]
    fn salvage_value_cannot_exceed_cost() {
        let mut d = draft();
        d.is_depreciable = true;
        d.depreciable_cost = Some(dec!(1000));
        d.salvage_value = Some(dec!(1500));
        d.depreciation_months = Some(36);
        d.depreciation_method = Some(DepreciationMethod::StraightLine);
        assert_matches!(d.check_values(), Err(ServiceError::ValidationError(_)));

        d.salvage_value = Some(dec!(100));
        assert!(d.check_values().is_ok());
    }

    #[test]
    fn negative_price_and_zero_quantity_are_rejected() {
        let mut d = draft();
        d.unit_price = dec!(-1);
        assert_matches!(d.check_values(), Err(ServiceError::ValidationError(_)));

        let mut d = draft();
        d.quantity = 0;
        assert_matches!(d.check_values(), Err(ServiceError::ValidationError(_)));
    }

    #[test]
    fn due_date_before_transfer_date_is_rejected() {
        assert_matches!(
            check_transfer_dates(date(2024, 5, 10), Some(date(2024, 5, 1))),
            Err(ServiceError::ValidationError(_))
        );
        assert!(check_transfer_dates(date(2024, 5, 10), Some(date(2024, 5, 10))).is_ok());
        assert!(check_transfer_dates(date(2024, 5, 10), None).is_ok());
    }

    fn stored_asset() -> asset::Model {
        asset::Model {
            id: 4,
            organization_id: 1,
            name: "Laptop".into(),
            brand: Some("Acme".into()),
            model: None,
            serial_number: None,
            quantity: 2,
            unit_price: dec!(10),
            category_id: 1,
            sub_category_id: None,
            supplier_id: None,
            site_id: 1,
            area_id: Some(3),
            department_id: None,
            sub_department_id: None,
            asset_status_id: 9,
            is_depreciable: false,
            depreciable_cost: None,
            salvage_value: None,
            depreciation_months: None,
            depreciation_method: None,
            acquisition_date: None,
            image_path: None,
            delivery_note_path: None,
            receipt_path: None,
            invoice_path: None,
            is_disposed: false,
            is_deleted: false,
            created_by: Uuid::new_v4(),
            created_at: Utc::now(),
            modified_by: None,
            modified_at: None,
        }
    }

    #[test]
    fn update_keeps_absent_fields_and_drops_area_on_site_change() {
        let existing = stored_asset();
        let merged = AssetDraft::merged(
            &existing,
            &UpdateAssetRequest {
                id: 4,
                quantity: Some(5),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(merged.quantity, 5);
        assert_eq!(merged.brand.as_deref(), Some("Acme"));
        assert_eq!(merged.area_id, Some(3));
        assert_eq!(merged.asset_status_id, Some(9));

        let moved = AssetDraft::merged(
            &existing,
            &UpdateAssetRequest {
                id: 4,
                site_id: Some(2),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(moved.site_id, 2);
        assert_eq!(moved.area_id, None);
    }

    #[test]
    fn new_department_or_category_drops_the_stale_child() {
        let existing = asset::Model {
            sub_category_id: Some(11),
            department_id: Some(5),
            sub_department_id: Some(51),
            ..stored_asset()
        };

        let same_parents = AssetDraft::merged(
            &existing,
            &UpdateAssetRequest {
                id: 4,
                category_id: Some(1),
                department_id: Some(5),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(same_parents.sub_category_id, Some(11));
        assert_eq!(same_parents.sub_department_id, Some(51));

        let moved = AssetDraft::merged(
            &existing,
            &UpdateAssetRequest {
                id: 4,
                category_id: Some(2),
                department_id: Some(6),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(moved.sub_category_id, None);
        assert_eq!(moved.department_id, Some(6));
        assert_eq!(moved.sub_department_id, None);

        let moved_with_child = AssetDraft::merged(
            &existing,
            &UpdateAssetRequest {
                id: 4,
                department_id: Some(6),
                sub_department_id: Some(61),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(moved_with_child.sub_department_id, Some(61));
    }

    #[test]
    fn approval_policy_clamps_levels() {
        assert_eq!(ApprovalPolicy::with_levels(7).levels, 3);
        assert_eq!(ApprovalPolicy::with_levels(0).levels, 1);
        assert!(!ApprovalPolicy::immediate().required);
    }
}
