use crate::{
    db::DbPool,
    entities::asset_status::{self, AssetStatusKind},
    errors::ServiceError,
    services::context::OrgContext,
    services::reference::{
        ensure_name_available, find_active_in_org, list_active, normalize_name,
        normalize_optional, soft_delete, NamedEntityRequest,
    },
};
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};
use slog::Logger;
use std::sync::Arc;
use tracing::{debug, instrument};
use uuid::Uuid;
use validator::Validate;

/// Seeded status row of `kind` for the organization.
pub async fn seeded_status<C: ConnectionTrait>(
    db: &C,
    organization_id: i32,
    kind: AssetStatusKind,
) -> Result<asset_status::Model, ServiceError> {
    asset_status::Entity::find()
        .filter(asset_status::Column::OrganizationId.eq(organization_id))
        .filter(asset_status::Column::Kind.eq(kind))
        .filter(asset_status::Column::IsDeleted.eq(false))
        .one(db)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| {
            ServiceError::InternalError(format!(
                "organization {} has no '{}' status",
                organization_id,
                kind.display_name()
            ))
        })
}

/// Creates the seeded statuses the organization is missing. Safe to call
/// repeatedly.
pub async fn ensure_seeded_statuses<C: ConnectionTrait>(
    db: &C,
    organization_id: i32,
    actor: Option<Uuid>,
) -> Result<Vec<asset_status::Model>, ServiceError> {
    let existing = asset_status::Entity::find()
        .filter(asset_status::Column::OrganizationId.eq(organization_id))
        .filter(asset_status::Column::Kind.is_not_null())
        .all(db)
        .await
        .map_err(ServiceError::db_error)?;

    let mut created = Vec::new();
    for kind in AssetStatusKind::SEEDED {
        if existing.iter().any(|s| s.kind == Some(kind)) {
            continue;
        }
        let model = asset_status::ActiveModel {
            organization_id: Set(organization_id),
            name: Set(kind.display_name().to_string()),
            kind: Set(Some(kind)),
            is_deleted: Set(false),
            created_by: Set(actor),
            ..Default::default()
        }
        .insert(db)
        .await
        .map_err(ServiceError::db_error)?;
        created.push(model);
    }
    if !created.is_empty() {
        debug!(organization_id, count = created.len(), "seeded asset statuses");
    }
    Ok(created)
}

/// Organization asset statuses: the seeded set plus custom ones.
#[derive(Clone)]
pub struct AssetStatusService {
    db_pool: Arc<DbPool>,
    logger: Logger,
}

impl AssetStatusService {
    pub fn new(db_pool: Arc<DbPool>, logger: Logger) -> Self {
        Self { db_pool, logger }
    }

    #[instrument(skip(self), fields(org = ctx.organization_id))]
    pub async fn ensure_seeded(
        &self,
        ctx: &OrgContext,
    ) -> Result<Vec<asset_status::Model>, ServiceError> {
        ensure_seeded_statuses(self.db_pool.as_ref(), ctx.organization_id, Some(ctx.user_id)).await
    }

    #[instrument(skip(self, request), fields(org = ctx.organization_id))]
    pub async fn create_status(
        &self,
        ctx: &OrgContext,
        request: NamedEntityRequest,
    ) -> Result<asset_status::Model, ServiceError> {
        request.validate()?;
        let db = self.db_pool.as_ref();
        let name = normalize_name(&request.name)?;
        ensure_seeded_statuses(db, ctx.organization_id, Some(ctx.user_id)).await?;
        ensure_name_available::<asset_status::Entity, _>(
            db,
            Some(ctx.organization_id),
            &name,
            None,
            None,
        )
        .await?;

        let model = asset_status::ActiveModel {
            organization_id: Set(ctx.organization_id),
            name: Set(name),
            description: Set(normalize_optional(request.description)),
            kind: Set(None),
            is_deleted: Set(false),
            created_by: Set(Some(ctx.user_id)),
            ..Default::default()
        }
        .insert(db)
        .await
        .map_err(ServiceError::db_error)?;

        slog::info!(self.logger, "asset status created"; "status_id" => model.id, "org" => ctx.organization_id);
        Ok(model)
    }

    /// Seeds on first use, then lists the non-deleted statuses.
    pub async fn list_statuses(
        &self,
        ctx: &OrgContext,
    ) -> Result<Vec<asset_status::Model>, ServiceError> {
        let db = self.db_pool.as_ref();
        ensure_seeded_statuses(db, ctx.organization_id, Some(ctx.user_id)).await?;
        list_active::<asset_status::Entity, _>(db, Some(ctx.organization_id)).await
    }

    #[instrument(skip(self), fields(org = ctx.organization_id))]
    pub async fn delete_status(&self, ctx: &OrgContext, id: i32) -> Result<(), ServiceError> {
        let db = self.db_pool.as_ref();
        let status =
            find_active_in_org::<asset_status::Entity, _>(db, Some(ctx.organization_id), id)
                .await?;
        if status.kind.is_some() {
            return Err(ServiceError::InvalidOperation(format!(
                "Status '{}' is built in and cannot be deleted",
                status.name
            )));
        }
        soft_delete::<asset_status::Entity, _>(db, Some(ctx.organization_id), id, ctx.user_id)
            .await
    }
}
