use crate::{
    db::DbPool,
    entities::{area, city, site},
    errors::ServiceError,
    services::context::OrgContext,
    services::reference::{
        ensure_name_available, find_active_in_org, find_in_org, list_active, list_all,
        normalize_name, normalize_optional, require_reference, soft_delete, NamedEntityRequest,
        UpdateNamedEntityRequest,
    },
};
use sea_orm::{ActiveModelTrait, Set};
use serde::{Deserialize, Serialize};
use slog::Logger;
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateSiteRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    pub city_id: Option<i32>,
    #[validate(length(max = 500))]
    pub address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateSiteRequest {
    pub id: i32,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    pub city_id: Option<i32>,
    #[validate(length(max = 500))]
    pub address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateAreaRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    pub site_id: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateAreaRequest {
    pub id: i32,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    pub site_id: Option<i32>,
}

/// Cities, sites (branches) and the areas inside them.
#[derive(Clone)]
pub struct LocationService {
    db_pool: Arc<DbPool>,
    logger: Logger,
}

impl LocationService {
    pub fn new(db_pool: Arc<DbPool>, logger: Logger) -> Self {
        Self { db_pool, logger }
    }

    #[instrument(skip(self, request), fields(org = ctx.organization_id))]
    pub async fn create_city(
        &self,
        ctx: &OrgContext,
        request: NamedEntityRequest,
    ) -> Result<city::Model, ServiceError> {
        request.validate()?;
        let db = self.db_pool.as_ref();
        let name = normalize_name(&request.name)?;
        ensure_name_available::<city::Entity, _>(db, Some(ctx.organization_id), &name, None, None)
            .await?;

        let model = city::ActiveModel {
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

        slog::info!(self.logger, "city created"; "city_id" => model.id, "org" => ctx.organization_id);
        Ok(model)
    }

    #[instrument(skip(self, request), fields(org = ctx.organization_id))]
    pub async fn update_city(
        &self,
        ctx: &OrgContext,
        request: UpdateNamedEntityRequest,
    ) -> Result<city::Model, ServiceError> {
        request.validate()?;
        let db = self.db_pool.as_ref();
        let existing =
            find_active_in_org::<city::Entity, _>(db, Some(ctx.organization_id), request.id)
                .await?;
        let name = normalize_name(&request.name)?;
        ensure_name_available::<city::Entity, _>(
            db,
            Some(ctx.organization_id),
            &name,
            None,
            Some(existing.id),
        )
        .await?;

        let mut active: city::ActiveModel = existing.into();
        active.name = Set(name);
        if let Some(description) = request.description {
            active.description = Set(normalize_optional(Some(description)));
        }
        active.modified_by = Set(Some(ctx.user_id));
        active.update(db).await.map_err(ServiceError::db_error)
    }

    pub async fn get_city(&self, ctx: &OrgContext, id: i32) -> Result<city::Model, ServiceError> {
        find_in_org::<city::Entity, _>(self.db_pool.as_ref(), Some(ctx.organization_id), id).await
    }

    pub async fn list_cities(&self, ctx: &OrgContext) -> Result<Vec<city::Model>, ServiceError> {
        list_active::<city::Entity, _>(self.db_pool.as_ref(), Some(ctx.organization_id)).await
    }

    pub async fn list_all_cities(&self) -> Result<Vec<city::Model>, ServiceError> {
        list_all::<city::Entity, _>(self.db_pool.as_ref()).await
    }

    #[instrument(skip(self), fields(org = ctx.organization_id))]
    pub async fn delete_city(&self, ctx: &OrgContext, id: i32) -> Result<(), ServiceError> {
        soft_delete::<city::Entity, _>(
            self.db_pool.as_ref(),
            Some(ctx.organization_id),
            id,
            ctx.user_id,
        )
        .await?;
        slog::info!(self.logger, "city deleted"; "city_id" => id, "org" => ctx.organization_id);
        Ok(())
    }

    #[instrument(skip(self, request), fields(org = ctx.organization_id))]
    pub async fn create_site(
        &self,
        ctx: &OrgContext,
        request: CreateSiteRequest,
    ) -> Result<site::Model, ServiceError> {
        request.validate()?;
        let db = self.db_pool.as_ref();
        let name = normalize_name(&request.name)?;
        if let Some(city_id) = request.city_id {
            require_reference::<city::Entity, _>(db, Some(ctx.organization_id), city_id).await?;
        }
        ensure_name_available::<site::Entity, _>(db, Some(ctx.organization_id), &name, None, None)
            .await?;

        let model = site::ActiveModel {
            organization_id: Set(ctx.organization_id),
            name: Set(name),
            description: Set(normalize_optional(request.description)),
            city_id: Set(request.city_id),
            address: Set(normalize_optional(request.address)),
            is_deleted: Set(false),
            created_by: Set(ctx.user_id),
            ..Default::default()
        }
        .insert(db)
        .await
        .map_err(ServiceError::db_error)?;

        slog::info!(self.logger, "site created"; "site_id" => model.id, "org" => ctx.organization_id);
        Ok(model)
    }

    #[instrument(skip(self, request), fields(org = ctx.organization_id))]
    pub async fn update_site(
        &self,
        ctx: &OrgContext,
        request: UpdateSiteRequest,
    ) -> Result<site::Model, ServiceError> {
        request.validate()?;
        let db = self.db_pool.as_ref();
        let existing =
            find_active_in_org::<site::Entity, _>(db, Some(ctx.organization_id), request.id)
                .await?;
        let name = normalize_name(&request.name)?;
        if let Some(city_id) = request.city_id {
            require_reference::<city::Entity, _>(db, Some(ctx.organization_id), city_id).await?;
        }
        ensure_name_available::<site::Entity, _>(
            db,
            Some(ctx.organization_id),
            &name,
            None,
            Some(existing.id),
        )
        .await?;

        let mut active: site::ActiveModel = existing.into();
        active.name = Set(name);
        if let Some(description) = request.description {
            active.description = Set(normalize_optional(Some(description)));
        }
        if request.city_id.is_some() {
            active.city_id = Set(request.city_id);
        }
        if let Some(address) = request.address {
            active.address = Set(normalize_optional(Some(address)));
        }
        active.modified_by = Set(Some(ctx.user_id));
        active.update(db).await.map_err(ServiceError::db_error)
    }

    pub async fn get_site(&self, ctx: &OrgContext, id: i32) -> Result<site::Model, ServiceError> {
        find_in_org::<site::Entity, _>(self.db_pool.as_ref(), Some(ctx.organization_id), id).await
    }

    pub async fn list_sites(&self, ctx: &OrgContext) -> Result<Vec<site::Model>, ServiceError> {
        list_active::<site::Entity, _>(self.db_pool.as_ref(), Some(ctx.organization_id)).await
    }

    pub async fn list_all_sites(&self) -> Result<Vec<site::Model>, ServiceError> {
        list_all::<site::Entity, _>(self.db_pool.as_ref()).await
    }

    #[instrument(skip(self), fields(org = ctx.organization_id))]
    pub async fn delete_site(&self, ctx: &OrgContext, id: i32) -> Result<(), ServiceError> {
        soft_delete::<site::Entity, _>(
            self.db_pool.as_ref(),
            Some(ctx.organization_id),
            id,
            ctx.user_id,
        )
        .await
    }

    #[instrument(skip(self, request), fields(org = ctx.organization_id))]
    pub async fn create_area(
        &self,
        ctx: &OrgContext,
        request: CreateAreaRequest,
    ) -> Result<area::Model, ServiceError> {
        request.validate()?;
        let db = self.db_pool.as_ref();
        let name = normalize_name(&request.name)?;
        require_reference::<site::Entity, _>(db, Some(ctx.organization_id), request.site_id)
            .await?;
        ensure_name_available::<area::Entity, _>(
            db,
            Some(ctx.organization_id),
            &name,
            Some((area::Column::SiteId, request.site_id)),
            None,
        )
        .await?;

        area::ActiveModel {
            organization_id: Set(ctx.organization_id),
            name: Set(name),
            description: Set(normalize_optional(request.description)),
            site_id: Set(request.site_id),
            is_deleted: Set(false),
            created_by: Set(ctx.user_id),
            ..Default::default()
        }
        .insert(db)
        .await
        .map_err(ServiceError::db_error)
    }

    #[instrument(skip(self, request), fields(org = ctx.organization_id))]
    pub async fn update_area(
        &self,
        ctx: &OrgContext,
        request: UpdateAreaRequest,
    ) -> Result<area::Model, ServiceError> {
        request.validate()?;
        let db = self.db_pool.as_ref();
        let existing =
            find_active_in_org::<area::Entity, _>(db, Some(ctx.organization_id), request.id)
                .await?;
        let name = normalize_name(&request.name)?;
        let site_id = request.site_id.unwrap_or(existing.site_id);
        require_reference::<site::Entity, _>(db, Some(ctx.organization_id), site_id).await?;
        ensure_name_available::<area::Entity, _>(
            db,
            Some(ctx.organization_id),
            &name,
            Some((area::Column::SiteId, site_id)),
            Some(existing.id),
        )
        .await?;

        let mut active: area::ActiveModel = existing.into();
        active.name = Set(name);
        active.site_id = Set(site_id);
        if let Some(description) = request.description {
            active.description = Set(normalize_optional(Some(description)));
        }
        active.modified_by = Set(Some(ctx.user_id));
        active.update(db).await.map_err(ServiceError::db_error)
    }

    pub async fn get_area(&self, ctx: &OrgContext, id: i32) -> Result<area::Model, ServiceError> {
        find_in_org::<area::Entity, _>(self.db_pool.as_ref(), Some(ctx.organization_id), id).await
    }

    pub async fn list_areas(&self, ctx: &OrgContext) -> Result<Vec<area::Model>, ServiceError> {
        list_active::<area::Entity, _>(self.db_pool.as_ref(), Some(ctx.organization_id)).await
    }

    pub async fn list_all_areas(&self) -> Result<Vec<area::Model>, ServiceError> {
        list_all::<area::Entity, _>(self.db_pool.as_ref()).await
    }

    #[instrument(skip(self), fields(org = ctx.organization_id))]
    pub async fn delete_area(&self, ctx: &OrgContext, id: i32) -> Result<(), ServiceError> {
        soft_delete::<area::Entity, _>(
            self.db_pool.as_ref(),
            Some(ctx.organization_id),
            id,
            ctx.user_id,
        )
        .await
    }
}
