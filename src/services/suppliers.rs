use crate::{
    db::DbPool,
    entities::supplier,
    errors::ServiceError,
    services::context::OrgContext,
    services::reference::{
        ensure_name_available, find_active_in_org, find_in_org, list_active, list_all,
        normalize_name, normalize_optional, soft_delete,
    },
    services::storage::{remove_replaced, FilePayload, FileStorage, StagedFiles},
};
use sea_orm::{ActiveModelTrait, Set};
use serde::{Deserialize, Serialize};
use slog::Logger;
use std::sync::Arc;
use tracing::{error, instrument};
use utoipa::ToSchema;
use validator::Validate;

const DOCUMENT_FOLDER: &str = "suppliers";

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateSupplierRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    #[validate(length(max = 200))]
    pub contact_person: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 50))]
    pub phone: Option<String>,
    #[validate(length(max = 500))]
    pub address: Option<String>,
    #[validate]
    pub document: Option<FilePayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateSupplierRequest {
    pub id: i32,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    #[validate(length(max = 200))]
    pub contact_person: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 50))]
    pub phone: Option<String>,
    #[validate(length(max = 500))]
    pub address: Option<String>,
    /// Replaces the stored document when present
    #[validate]
    pub document: Option<FilePayload>,
}

/// Suppliers, with an optional uploaded document each.
#[derive(Clone)]
pub struct SupplierService {
    db_pool: Arc<DbPool>,
    storage: Arc<dyn FileStorage>,
    logger: Logger,
}

impl SupplierService {
    pub fn new(db_pool: Arc<DbPool>, storage: Arc<dyn FileStorage>, logger: Logger) -> Self {
        Self {
            db_pool,
            storage,
            logger,
        }
    }

    /// Creates a supplier. A stored document is removed again if the insert fails.
    #[instrument(skip(self, request), fields(org = ctx.organization_id))]
    pub async fn create_supplier(
        &self,
        ctx: &OrgContext,
        request: CreateSupplierRequest,
    ) -> Result<supplier::Model, ServiceError> {
        request.validate()?;
        let db = self.db_pool.as_ref();
        let name = normalize_name(&request.name)?;
        ensure_name_available::<supplier::Entity, _>(
            db,
            Some(ctx.organization_id),
            &name,
            None,
            None,
        )
        .await?;

        let mut staged = StagedFiles::new(self.storage.clone(), ctx.organization_id);
        let document_path = match staged.stage(DOCUMENT_FOLDER, request.document.as_ref()).await {
            Ok(path) => path,
            Err(e) => {
                staged.rollback().await;
                return Err(e);
            }
        };

        let inserted = supplier::ActiveModel {
            organization_id: Set(ctx.organization_id),
            name: Set(name),
            description: Set(normalize_optional(request.description)),
            contact_person: Set(normalize_optional(request.contact_person)),
            email: Set(normalize_optional(request.email)),
            phone: Set(normalize_optional(request.phone)),
            address: Set(normalize_optional(request.address)),
            document_path: Set(document_path),
            is_deleted: Set(false),
            created_by: Set(ctx.user_id),
            ..Default::default()
        }
        .insert(db)
        .await;

        match inserted {
            Ok(model) => {
                slog::info!(self.logger, "supplier created"; "supplier_id" => model.id, "org" => ctx.organization_id);
                Ok(model)
            }
            Err(e) => {
                error!(error = %e, "supplier insert failed, removing staged document");
                staged.rollback().await;
                Err(ServiceError::db_error(e))
            }
        }
    }

    /// Updates a supplier. The previous document is deleted only after the
    /// update has been written.
    #[instrument(skip(self, request), fields(org = ctx.organization_id))]
    pub async fn update_supplier(
        &self,
        ctx: &OrgContext,
        request: UpdateSupplierRequest,
    ) -> Result<supplier::Model, ServiceError> {
        request.validate()?;
        let db = self.db_pool.as_ref();
        let existing =
            find_active_in_org::<supplier::Entity, _>(db, Some(ctx.organization_id), request.id)
                .await?;
        let name = normalize_name(&request.name)?;
        ensure_name_available::<supplier::Entity, _>(
            db,
            Some(ctx.organization_id),
            &name,
            None,
            Some(existing.id),
        )
        .await?;

        let mut staged = StagedFiles::new(self.storage.clone(), ctx.organization_id);
        let new_document = match staged.stage(DOCUMENT_FOLDER, request.document.as_ref()).await {
            Ok(path) => path,
            Err(e) => {
                staged.rollback().await;
                return Err(e);
            }
        };
        let replaced: Vec<String> = match (&new_document, &existing.document_path) {
            (Some(_), Some(old)) => vec![old.clone()],
            _ => Vec::new(),
        };

        let mut active: supplier::ActiveModel = existing.into();
        active.name = Set(name);
        if let Some(description) = request.description {
            active.description = Set(normalize_optional(Some(description)));
        }
        if let Some(contact_person) = request.contact_person {
            active.contact_person = Set(normalize_optional(Some(contact_person)));
        }
        if let Some(email) = request.email {
            active.email = Set(normalize_optional(Some(email)));
        }
        if let Some(phone) = request.phone {
            active.phone = Set(normalize_optional(Some(phone)));
        }
        if let Some(address) = request.address {
            active.address = Set(normalize_optional(Some(address)));
        }
        if new_document.is_some() {
            active.document_path = Set(new_document);
        }
        active.modified_by = Set(Some(ctx.user_id));

        match active.update(db).await {
            Ok(model) => {
                remove_replaced(self.storage.as_ref(), replaced).await;
                Ok(model)
            }
            Err(e) => {
                error!(error = %e, "supplier update failed, removing staged document");
                staged.rollback().await;
                Err(ServiceError::db_error(e))
            }
        }
    }

    pub async fn get_supplier(
        &self,
        ctx: &OrgContext,
        id: i32,
    ) -> Result<supplier::Model, ServiceError> {
        find_in_org::<supplier::Entity, _>(self.db_pool.as_ref(), Some(ctx.organization_id), id)
            .await
    }

    pub async fn list_suppliers(
        &self,
        ctx: &OrgContext,
    ) -> Result<Vec<supplier::Model>, ServiceError> {
        list_active::<supplier::Entity, _>(self.db_pool.as_ref(), Some(ctx.organization_id)).await
    }

    pub async fn list_all_suppliers(&self) -> Result<Vec<supplier::Model>, ServiceError> {
        list_all::<supplier::Entity, _>(self.db_pool.as_ref()).await
    }

    /// Soft delete. The document stays in storage with the row.
    #[instrument(skip(self), fields(org = ctx.organization_id))]
    pub async fn delete_supplier(&self, ctx: &OrgContext, id: i32) -> Result<(), ServiceError> {
        soft_delete::<supplier::Entity, _>(
            self.db_pool.as_ref(),
            Some(ctx.organization_id),
            id,
            ctx.user_id,
        )
        .await?;
        slog::info!(self.logger, "supplier deleted"; "supplier_id" => id, "org" => ctx.organization_id);
        Ok(())
    }
}
