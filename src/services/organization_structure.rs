use crate::{
    db::DbPool,
    entities::{company, department, designation, industry, sub_department},
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
pub struct CreateSubDepartmentRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    pub department_id: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateSubDepartmentRequest {
    pub id: i32,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    pub department_id: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateCompanyRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    pub industry_id: Option<i32>,
    #[validate(length(max = 500))]
    pub address: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 50))]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateCompanyRequest {
    pub id: i32,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    pub industry_id: Option<i32>,
    #[validate(length(max = 500))]
    pub address: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 50))]
    pub phone: Option<String>,
}

/// Departments, sub-departments, designations, companies and the global
/// industry list.
#[derive(Clone)]
pub struct OrganizationStructureService {
    db_pool: Arc<DbPool>,
    logger: Logger,
}

impl OrganizationStructureService {
    pub fn new(db_pool: Arc<DbPool>, logger: Logger) -> Self {
        Self { db_pool, logger }
    }

    // Departments

    #[instrument(skip(self, request), fields(org = ctx.organization_id))]
    pub async fn create_department(
        &self,
        ctx: &OrgContext,
        request: NamedEntityRequest,
    ) -> Result<department::Model, ServiceError> {
        request.validate()?;
        let db = self.db_pool.as_ref();
        let name = normalize_name(&request.name)?;
        ensure_name_available::<department::Entity, _>(
            db,
            Some(ctx.organization_id),
            &name,
            None,
            None,
        )
        .await?;

        department::ActiveModel {
            organization_id: Set(ctx.organization_id),
            name: Set(name),
            description: Set(normalize_optional(request.description)),
            is_deleted: Set(false),
            created_by: Set(ctx.user_id),
            ..Default::default()
        }
        .insert(db)
        .await
        .map_err(ServiceError::db_error)
    }

    #[instrument(skip(self, request), fields(org = ctx.organization_id))]
    pub async fn update_department(
        &self,
        ctx: &OrgContext,
        request: UpdateNamedEntityRequest,
    ) -> Result<department::Model, ServiceError> {
        request.validate()?;
        let db = self.db_pool.as_ref();
        let existing =
            find_active_in_org::<department::Entity, _>(db, Some(ctx.organization_id), request.id)
                .await?;
        let name = normalize_name(&request.name)?;
        ensure_name_available::<department::Entity, _>(
            db,
            Some(ctx.organization_id),
            &name,
            None,
            Some(existing.id),
        )
        .await?;

        let mut active: department::ActiveModel = existing.into();
        active.name = Set(name);
        if let Some(description) = request.description {
            active.description = Set(normalize_optional(Some(description)));
        }
        active.modified_by = Set(Some(ctx.user_id));
        active.update(db).await.map_err(ServiceError::db_error)
    }

    pub async fn get_department(
        &self,
        ctx: &OrgContext,
        id: i32,
    ) -> Result<department::Model, ServiceError> {
        find_in_org::<department::Entity, _>(self.db_pool.as_ref(), Some(ctx.organization_id), id)
            .await
    }

    pub async fn list_departments(
        &self,
        ctx: &OrgContext,
    ) -> Result<Vec<department::Model>, ServiceError> {
        list_active::<department::Entity, _>(self.db_pool.as_ref(), Some(ctx.organization_id))
            .await
    }

    pub async fn list_all_departments(&self) -> Result<Vec<department::Model>, ServiceError> {
        list_all::<department::Entity, _>(self.db_pool.as_ref()).await
    }

    #[instrument(skip(self), fields(org = ctx.organization_id))]
    pub async fn delete_department(&self, ctx: &OrgContext, id: i32) -> Result<(), ServiceError> {
        soft_delete::<department::Entity, _>(
            self.db_pool.as_ref(),
            Some(ctx.organization_id),
            id,
            ctx.user_id,
        )
        .await
    }

    // Sub-departments

    #[instrument(skip(self, request), fields(org = ctx.organization_id))]
    pub async fn create_sub_department(
        &self,
        ctx: &OrgContext,
        request: CreateSubDepartmentRequest,
    ) -> Result<sub_department::Model, ServiceError> {
        request.validate()?;
        let db = self.db_pool.as_ref();
        let name = normalize_name(&request.name)?;
        require_reference::<department::Entity, _>(
            db,
            Some(ctx.organization_id),
            request.department_id,
        )
        .await?;
        ensure_name_available::<sub_department::Entity, _>(
            db,
            Some(ctx.organization_id),
            &name,
            Some((sub_department::Column::DepartmentId, request.department_id)),
            None,
        )
        .await?;

        sub_department::ActiveModel {
            organization_id: Set(ctx.organization_id),
            name: Set(name),
            description: Set(normalize_optional(request.description)),
            department_id: Set(request.department_id),
            is_deleted: Set(false),
            created_by: Set(ctx.user_id),
            ..Default::default()
        }
        .insert(db)
        .await
        .map_err(ServiceError::db_error)
    }

    #[instrument(skip(self, request), fields(org = ctx.organization_id))]
    pub async fn update_sub_department(
        &self,
        ctx: &OrgContext,
        request: UpdateSubDepartmentRequest,
    ) -> Result<sub_department::Model, ServiceError> {
        request.validate()?;
        let db = self.db_pool.as_ref();
        let existing = find_active_in_org::<sub_department::Entity, _>(
            db,
            Some(ctx.organization_id),
            request.id,
        )
        .await?;
        let name = normalize_name(&request.name)?;
        let department_id = request.department_id.unwrap_or(existing.department_id);
        require_reference::<department::Entity, _>(db, Some(ctx.organization_id), department_id)
            .await?;
        ensure_name_available::<sub_department::Entity, _>(
            db,
            Some(ctx.organization_id),
            &name,
            Some((sub_department::Column::DepartmentId, department_id)),
            Some(existing.id),
        )
        .await?;

        let mut active: sub_department::ActiveModel = existing.into();
        active.name = Set(name);
        active.department_id = Set(department_id);
        if let Some(description) = request.description {
            active.description = Set(normalize_optional(Some(description)));
        }
        active.modified_by = Set(Some(ctx.user_id));
        active.update(db).await.map_err(ServiceError::db_error)
    }

    pub async fn get_sub_department(
        &self,
        ctx: &OrgContext,
        id: i32,
    ) -> Result<sub_department::Model, ServiceError> {
        find_in_org::<sub_department::Entity, _>(
            self.db_pool.as_ref(),
            Some(ctx.organization_id),
            id,
        )
        .await
    }

    pub async fn list_sub_departments(
        &self,
        ctx: &OrgContext,
    ) -> Result<Vec<sub_department::Model>, ServiceError> {
        list_active::<sub_department::Entity, _>(self.db_pool.as_ref(), Some(ctx.organization_id))
            .await
    }

    pub async fn list_all_sub_departments(
        &self,
    ) -> Result<Vec<sub_department::Model>, ServiceError> {
        list_all::<sub_department::Entity, _>(self.db_pool.as_ref()).await
    }

    #[instrument(skip(self), fields(org = ctx.organization_id))]
    pub async fn delete_sub_department(
        &self,
        ctx: &OrgContext,
        id: i32,
    ) -> Result<(), ServiceError> {
        soft_delete::<sub_department::Entity, _>(
            self.db_pool.as_ref(),
            Some(ctx.organization_id),
            id,
            ctx.user_id,
        )
        .await
    }

    // Designations

    #[instrument(skip(self, request), fields(org = ctx.organization_id))]
    pub async fn create_designation(
        &self,
        ctx: &OrgContext,
        request: NamedEntityRequest,
    ) -> Result<designation::Model, ServiceError> {
        request.validate()?;
        let db = self.db_pool.as_ref();
        let name = normalize_name(&request.name)?;
        ensure_name_available::<designation::Entity, _>(
            db,
            Some(ctx.organization_id),
            &name,
            None,
            None,
        )
        .await?;

        designation::ActiveModel {
            organization_id: Set(ctx.organization_id),
            name: Set(name),
            description: Set(normalize_optional(request.description)),
            is_deleted: Set(false),
            created_by: Set(ctx.user_id),
            ..Default::default()
        }
        .insert(db)
        .await
        .map_err(ServiceError::db_error)
    }

    #[instrument(skip(self, request), fields(org = ctx.organization_id))]
    pub async fn update_designation(
        &self,
        ctx: &OrgContext,
        request: UpdateNamedEntityRequest,
    ) -> Result<designation::Model, ServiceError> {
        request.validate()?;
        let db = self.db_pool.as_ref();
        let existing = find_active_in_org::<designation::Entity, _>(
            db,
            Some(ctx.organization_id),
            request.id,
        )
        .await?;
        let name = normalize_name(&request.name)?;
        ensure_name_available::<designation::Entity, _>(
            db,
            Some(ctx.organization_id),
            &name,
            None,
            Some(existing.id),
        )
        .await?;

        let mut active: designation::ActiveModel = existing.into();
        active.name = Set(name);
        if let Some(description) = request.description {
            active.description = Set(normalize_optional(Some(description)));
        }
        active.modified_by = Set(Some(ctx.user_id));
        active.update(db).await.map_err(ServiceError::db_error)
    }

    pub async fn get_designation(
        &self,
        ctx: &OrgContext,
        id: i32,
    ) -> Result<designation::Model, ServiceError> {
        find_in_org::<designation::Entity, _>(self.db_pool.as_ref(), Some(ctx.organization_id), id)
            .await
    }

    pub async fn list_designations(
        &self,
        ctx: &OrgContext,
    ) -> Result<Vec<designation::Model>, ServiceError> {
        list_active::<designation::Entity, _>(self.db_pool.as_ref(), Some(ctx.organization_id))
            .await
    }

    pub async fn list_all_designations(&self) -> Result<Vec<designation::Model>, ServiceError> {
        list_all::<designation::Entity, _>(self.db_pool.as_ref()).await
    }

    #[instrument(skip(self), fields(org = ctx.organization_id))]
    pub async fn delete_designation(&self, ctx: &OrgContext, id: i32) -> Result<(), ServiceError> {
        soft_delete::<designation::Entity, _>(
            self.db_pool.as_ref(),
            Some(ctx.organization_id),
            id,
            ctx.user_id,
        )
        .await
    }

    // Companies

    #[instrument(skip(self, request), fields(org = ctx.organization_id))]
    pub async fn create_company(
        &self,
        ctx: &OrgContext,
        request: CreateCompanyRequest,
    ) -> Result<company::Model, ServiceError> {
        request.validate()?;
        let db = self.db_pool.as_ref();
        let name = normalize_name(&request.name)?;
        if let Some(industry_id) = request.industry_id {
            require_reference::<industry::Entity, _>(db, None, industry_id).await?;
        }
        ensure_name_available::<company::Entity, _>(
            db,
            Some(ctx.organization_id),
            &name,
            None,
            None,
        )
        .await?;

        let model = company::ActiveModel {
            organization_id: Set(ctx.organization_id),
            name: Set(name),
            description: Set(normalize_optional(request.description)),
            industry_id: Set(request.industry_id),
            address: Set(normalize_optional(request.address)),
            email: Set(normalize_optional(request.email)),
            phone: Set(normalize_optional(request.phone)),
            is_deleted: Set(false),
            created_by: Set(ctx.user_id),
            ..Default::default()
        }
        .insert(db)
        .await
        .map_err(ServiceError::db_error)?;

        slog::info!(self.logger, "company created"; "company_id" => model.id, "org" => ctx.organization_id);
        Ok(model)
    }

    #[instrument(skip(self, request), fields(org = ctx.organization_id))]
    pub async fn update_company(
        &self,
        ctx: &OrgContext,
        request: UpdateCompanyRequest,
    ) -> Result<company::Model, ServiceError> {
        request.validate()?;
        let db = self.db_pool.as_ref();
        let existing =
            find_active_in_org::<company::Entity, _>(db, Some(ctx.organization_id), request.id)
                .await?;
        let name = normalize_name(&request.name)?;
        if let Some(industry_id) = request.industry_id {
            require_reference::<industry::Entity, _>(db, None, industry_id).await?;
        }
        ensure_name_available::<company::Entity, _>(
            db,
            Some(ctx.organization_id),
            &name,
            None,
            Some(existing.id),
        )
        .await?;

        let mut active: company::ActiveModel = existing.into();
        active.name = Set(name);
        if let Some(description) = request.description {
            active.description = Set(normalize_optional(Some(description)));
        }
        if request.industry_id.is_some() {
            active.industry_id = Set(request.industry_id);
        }
        if let Some(address) = request.address {
            active.address = Set(normalize_optional(Some(address)));
        }
        if let Some(email) = request.email {
            active.email = Set(normalize_optional(Some(email)));
        }
        if let Some(phone) = request.phone {
            active.phone = Set(normalize_optional(Some(phone)));
        }
        active.modified_by = Set(Some(ctx.user_id));
        active.update(db).await.map_err(ServiceError::db_error)
    }

    pub async fn get_company(
        &self,
        ctx: &OrgContext,
        id: i32,
    ) -> Result<company::Model, ServiceError> {
        find_in_org::<company::Entity, _>(self.db_pool.as_ref(), Some(ctx.organization_id), id)
            .await
    }

    pub async fn list_companies(
        &self,
        ctx: &OrgContext,
    ) -> Result<Vec<company::Model>, ServiceError> {
        list_active::<company::Entity, _>(self.db_pool.as_ref(), Some(ctx.organization_id)).await
    }

    pub async fn list_all_companies(&self) -> Result<Vec<company::Model>, ServiceError> {
        list_all::<company::Entity, _>(self.db_pool.as_ref()).await
    }

    #[instrument(skip(self), fields(org = ctx.organization_id))]
    pub async fn delete_company(&self, ctx: &OrgContext, id: i32) -> Result<(), ServiceError> {
        soft_delete::<company::Entity, _>(
            self.db_pool.as_ref(),
            Some(ctx.organization_id),
            id,
            ctx.user_id,
        )
        .await
    }

    // Industries (global)

    #[instrument(skip(self, request))]
    pub async fn create_industry(
        &self,
        ctx: &OrgContext,
        request: NamedEntityRequest,
    ) -> Result<industry::Model, ServiceError> {
        request.validate()?;
        let db = self.db_pool.as_ref();
        let name = normalize_name(&request.name)?;
        ensure_name_available::<industry::Entity, _>(db, None, &name, None, None).await?;

        let model = industry::ActiveModel {
            name: Set(name),
            description: Set(normalize_optional(request.description)),
            is_deleted: Set(false),
            created_by: Set(ctx.user_id),
            ..Default::default()
        }
        .insert(db)
        .await
        .map_err(ServiceError::db_error)?;

        slog::info!(self.logger, "industry created"; "industry_id" => model.id);
        Ok(model)
    }

    #[instrument(skip(self, request))]
    pub async fn update_industry(
        &self,
        ctx: &OrgContext,
        request: UpdateNamedEntityRequest,
    ) -> Result<industry::Model, ServiceError> {
        request.validate()?;
        let db = self.db_pool.as_ref();
        let existing = find_active_in_org::<industry::Entity, _>(db, None, request.id).await?;
        let name = normalize_name(&request.name)?;
        ensure_name_available::<industry::Entity, _>(db, None, &name, None, Some(existing.id))
            .await?;

        let mut active: industry::ActiveModel = existing.into();
        active.name = Set(name);
        if let Some(description) = request.description {
            active.description = Set(normalize_optional(Some(description)));
        }
        active.modified_by = Set(Some(ctx.user_id));
        active.update(db).await.map_err(ServiceError::db_error)
    }

    pub async fn get_industry(&self, id: i32) -> Result<industry::Model, ServiceError> {
        find_in_org::<industry::Entity, _>(self.db_pool.as_ref(), None, id).await
    }

    pub async fn list_industries(&self) -> Result<Vec<industry::Model>, ServiceError> {
        list_active::<industry::Entity, _>(self.db_pool.as_ref(), None).await
    }

    pub async fn list_all_industries(&self) -> Result<Vec<industry::Model>, ServiceError> {
        list_all::<industry::Entity, _>(self.db_pool.as_ref()).await
    }

    #[instrument(skip(self))]
    pub async fn delete_industry(&self, ctx: &OrgContext, id: i32) -> Result<(), ServiceError> {
        soft_delete::<industry::Entity, _>(self.db_pool.as_ref(), None, id, ctx.user_id).await
    }
}
