use crate::{
    db::DbPool,
    entities::{category, sub_category},
    errors::ServiceError,
    services::context::OrgContext,
    services::reference::{
        ensure_name_available, find_active_in_org, find_in_org, list_active, list_all,
        normalize_name, normalize_optional, require_reference, soft_delete, NamedEntityRequest,
        UpdateNamedEntityRequest,
    },
};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use slog::Logger;
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateSubCategoryRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    pub category_id: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateSubCategoryRequest {
    pub id: i32,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    pub category_id: Option<i32>,
}

/// Asset categories and their sub-categories.
#[derive(Clone)]
pub struct CategoryService {
    db_pool: Arc<DbPool>,
    logger: Logger,
}

impl CategoryService {
    pub fn new(db_pool: Arc<DbPool>, logger: Logger) -> Self {
        Self { db_pool, logger }
    }

    #[instrument(skip(self, request), fields(org = ctx.organization_id))]
    pub async fn create_category(
        &self,
        ctx: &OrgContext,
        request: NamedEntityRequest,
    ) -> Result<category::Model, ServiceError> {
        request.validate()?;
        let db = self.db_pool.as_ref();
        let name = normalize_name(&request.name)?;
        ensure_name_available::<category::Entity, _>(
            db,
            Some(ctx.organization_id),
            &name,
            None,
            None,
        )
        .await?;

        let model = category::ActiveModel {
            organization_id: Set(ctx.organization_id),
            name: Set(name),
            description: Set(normalize_optional(request.description)),
            is_deleted: Set(false),
            created_by: Set(ctx.user_id),
            ..Default::default()
        }
        .insert(db)
        .await
        .map_err(ServiceError::db_error)?;

        slog::info!(self.logger, "category created"; "category_id" => model.id, "org" => ctx.organization_id);
        Ok(model)
    }

    #[instrument(skip(self, request), fields(org = ctx.organization_id))]
    pub async fn update_category(
        &self,
        ctx: &OrgContext,
        request: UpdateNamedEntityRequest,
    ) -> Result<category::Model, ServiceError> {
        request.validate()?;
        let db = self.db_pool.as_ref();
        let existing =
            find_active_in_org::<category::Entity, _>(db, Some(ctx.organization_id), request.id)
                .await?;
        let name = normalize_name(&request.name)?;
        ensure_name_available::<category::Entity, _>(
            db,
            Some(ctx.organization_id),
            &name,
            None,
            Some(existing.id),
        )
        .await?;

        let mut active: category::ActiveModel = existing.into();
        active.name = Set(name);
        if let Some(description) = request.description {
            active.description = Set(normalize_optional(Some(description)));
        }
        active.modified_by = Set(Some(ctx.user_id));
        active.update(db).await.map_err(ServiceError::db_error)
    }

    pub async fn get_category(
        &self,
        ctx: &OrgContext,
        id: i32,
    ) -> Result<category::Model, ServiceError> {
        find_in_org::<category::Entity, _>(self.db_pool.as_ref(), Some(ctx.organization_id), id)
            .await
    }

    pub async fn list_categories(
        &self,
        ctx: &OrgContext,
    ) -> Result<Vec<category::Model>, ServiceError> {
        list_active::<category::Entity, _>(self.db_pool.as_ref(), Some(ctx.organization_id)).await
    }

    pub async fn list_all_categories(&self) -> Result<Vec<category::Model>, ServiceError> {
        list_all::<category::Entity, _>(self.db_pool.as_ref()).await
    }

    #[instrument(skip(self), fields(org = ctx.organization_id))]
    pub async fn delete_category(&self, ctx: &OrgContext, id: i32) -> Result<(), ServiceError> {
        soft_delete::<category::Entity, _>(
            self.db_pool.as_ref(),
            Some(ctx.organization_id),
            id,
            ctx.user_id,
        )
        .await
    }

    #[instrument(skip(self, request), fields(org = ctx.organization_id))]
    pub async fn create_sub_category(
        &self,
        ctx: &OrgContext,
        request: CreateSubCategoryRequest,
    ) -> Result<sub_category::Model, ServiceError> {
        request.validate()?;
        let db = self.db_pool.as_ref();
        let name = normalize_name(&request.name)?;
        require_reference::<category::Entity, _>(db, Some(ctx.organization_id), request.category_id)
            .await?;
        ensure_name_available::<sub_category::Entity, _>(
            db,
            Some(ctx.organization_id),
            &name,
            Some((sub_category::Column::CategoryId, request.category_id)),
            None,
        )
        .await?;

        sub_category::ActiveModel {
            organization_id: Set(ctx.organization_id),
            name: Set(name),
            description: Set(normalize_optional(request.description)),
            category_id: Set(request.category_id),
            is_deleted: Set(false),
            created_by: Set(ctx.user_id),
            ..Default::default()
        }
        .insert(db)
        .await
        .map_err(ServiceError::db_error)
    }

    #[instrument(skip(self, request), fields(org = ctx.organization_id))]
    pub async fn update_sub_category(
        &self,
        ctx: &OrgContext,
        request: UpdateSubCategoryRequest,
    ) -> Result<sub_category::Model, ServiceError> {
        request.validate()?;
        let db = self.db_pool.as_ref();
        let existing = find_active_in_org::<sub_category::Entity, _>(
            db,
            Some(ctx.organization_id),
            request.id,
        )
        .await?;
        let name = normalize_name(&request.name)?;
        let category_id = request.category_id.unwrap_or(existing.category_id);
        require_reference::<category::Entity, _>(db, Some(ctx.organization_id), category_id)
            .await?;
        ensure_name_available::<sub_category::Entity, _>(
            db,
            Some(ctx.organization_id),
            &name,
            Some((sub_category::Column::CategoryId, category_id)),
            Some(existing.id),
        )
        .await?;

        let mut active: sub_category::ActiveModel = existing.into();
        active.name = Set(name);
        active.category_id = Set(category_id);
        if let Some(description) = request.description {
            active.description = Set(normalize_optional(Some(description)));
        }
        active.modified_by = Set(Some(ctx.user_id));
        active.update(db).await.map_err(ServiceError::db_error)
    }

    pub async fn get_sub_category(
        &self,
        ctx: &OrgContext,
        id: i32,
    ) -> Result<sub_category::Model, ServiceError> {
        find_in_org::<sub_category::Entity, _>(
            self.db_pool.as_ref(),
            Some(ctx.organization_id),
            id,
        )
        .await
    }

    pub async fn list_sub_categories(
        &self,
        ctx: &OrgContext,
    ) -> Result<Vec<sub_category::Model>, ServiceError> {
        list_active::<sub_category::Entity, _>(self.db_pool.as_ref(), Some(ctx.organization_id))
            .await
    }

    /// Non-deleted sub-categories of one category.
    pub async fn list_sub_categories_of(
        &self,
        ctx: &OrgContext,
        category_id: i32,
    ) -> Result<Vec<sub_category::Model>, ServiceError> {
        sub_category::Entity::find()
            .filter(sub_category::Column::OrganizationId.eq(ctx.organization_id))
            .filter(sub_category::Column::CategoryId.eq(category_id))
            .filter(sub_category::Column::IsDeleted.eq(false))
            .order_by_asc(sub_category::Column::Name)
            .all(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)
    }

    pub async fn list_all_sub_categories(&self) -> Result<Vec<sub_category::Model>, ServiceError> {
        list_all::<sub_category::Entity, _>(self.db_pool.as_ref()).await
    }

    #[instrument(skip(self), fields(org = ctx.organization_id))]
    pub async fn delete_sub_category(&self, ctx: &OrgContext, id: i32) -> Result<(), ServiceError> {
        soft_delete::<sub_category::Entity, _>(
            self.db_pool.as_ref(),
            Some(ctx.organization_id),
            id,
            ctx.user_id,
        )
        .await
    }
}
