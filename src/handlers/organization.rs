//! Companies, departments, sub-departments, designations and the global
//! industry list.

use axum::{
    extract::State,
    response::Json,
    routing::{delete, get, post, put},
    Router,
};

use crate::{
    auth::catalog::{Action, Page, ADMIN},
    auth::{AuthRouterExt, AuthUser},
    entities::{company, department, designation, industry, sub_department},
    handlers::common::{crud_routes, done, AppJson, AppQuery, CrudRoutes},
    services::context::OrgContext,
    services::organization_structure::{
        CreateCompanyRequest, CreateSubDepartmentRequest, UpdateCompanyRequest,
        UpdateSubDepartmentRequest,
    },
    services::reference::{IdQuery, NamedEntityRequest, UpdateNamedEntityRequest},
    ApiResponse, ApiResult, AppState,
};

#[utoipa::path(
    post,
    path = "/api/v1/company/create",
    request_body = CreateCompanyRequest,
    responses(
        (status = 200, description = "Company created", body = ApiResponse<company::Model>),
        (status = 400, description = "Invalid request or duplicate name", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "companies"
)]
pub async fn create_company(
    State(state): State<AppState>,
    ctx: OrgContext,
    AppJson(payload): AppJson<CreateCompanyRequest>,
) -> ApiResult<company::Model> {
    let created = state.services.organization.create_company(&ctx, payload).await?;
    Ok(Json(ApiResponse::success(created)))
}

#[utoipa::path(
    put,
    path = "/api/v1/company/update",
    request_body = UpdateCompanyRequest,
    responses(
        (status = 200, description = "Company updated", body = ApiResponse<company::Model>),
        (status = 400, description = "Invalid request or duplicate name", body = crate::errors::ErrorResponse),
        (status = 404, description = "Company not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "companies"
)]
pub async fn update_company(
    State(state): State<AppState>,
    ctx: OrgContext,
    AppJson(payload): AppJson<UpdateCompanyRequest>,
) -> ApiResult<company::Model> {
    let updated = state.services.organization.update_company(&ctx, payload).await?;
    Ok(Json(ApiResponse::success(updated)))
}

#[utoipa::path(
    get,
    path = "/api/v1/company/get-by-id",
    params(IdQuery),
    responses(
        (status = 200, description = "Company, including a deleted one", body = ApiResponse<company::Model>),
        (status = 404, description = "Company not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "companies"
)]
pub async fn get_company(
    State(state): State<AppState>,
    ctx: OrgContext,
    AppQuery(query): AppQuery<IdQuery>,
) -> ApiResult<company::Model> {
    let found = state.services.organization.get_company(&ctx, query.id).await?;
    Ok(Json(ApiResponse::success(found)))
}

#[utoipa::path(
    get,
    path = "/api/v1/company/get-by-org",
    responses(
        (status = 200, description = "Non-deleted company rows of the caller's organization", body = ApiResponse<Vec<company::Model>>)
    ),
    security(("bearer_auth" = [])),
    tag = "companies"
)]
pub async fn list_companies(
    State(state): State<AppState>,
    ctx: OrgContext,
) -> ApiResult<Vec<company::Model>> {
    let rows = state.services.organization.list_companies(&ctx).await?;
    Ok(Json(ApiResponse::success(rows)))
}

#[utoipa::path(
    get,
    path = "/api/v1/company/get-all",
    responses(
        (status = 200, description = "Every company row of every organization", body = ApiResponse<Vec<company::Model>>),
        (status = 403, description = "Requires SuperAdmin", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "companies"
)]
pub async fn list_all_companies(State(state): State<AppState>) -> ApiResult<Vec<company::Model>> {
    let rows = state.services.organization.list_all_companies().await?;
    Ok(Json(ApiResponse::success(rows)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/company/delete",
    params(IdQuery),
    responses(
        (status = 200, description = "Company soft-deleted", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Company not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "companies"
)]
pub async fn delete_company(
    State(state): State<AppState>,
    ctx: OrgContext,
    AppQuery(query): AppQuery<IdQuery>,
) -> ApiResult<()> {
    state.services.organization.delete_company(&ctx, query.id).await?;
    Ok(done("Company deleted"))
}

#[utoipa::path(
    post,
    path = "/api/v1/department/create",
    request_body = NamedEntityRequest,
    responses(
        (status = 200, description = "Department created", body = ApiResponse<department::Model>),
        (status = 400, description = "Invalid request or duplicate name", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "departments"
)]
pub async fn create_department(
    State(state): State<AppState>,
    ctx: OrgContext,
    AppJson(payload): AppJson<NamedEntityRequest>,
) -> ApiResult<department::Model> {
    let created = state.services.organization.create_department(&ctx, payload).await?;
    Ok(Json(ApiResponse::success(created)))
}

#[utoipa::path(
    put,
    path = "/api/v1/department/update",
    request_body = UpdateNamedEntityRequest,
    responses(
        (status = 200, description = "Department updated", body = ApiResponse<department::Model>),
        (status = 400, description = "Invalid request or duplicate name", body = crate::errors::ErrorResponse),
        (status = 404, description = "Department not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "departments"
)]
pub async fn update_department(
    State(state): State<AppState>,
    ctx: OrgContext,
    AppJson(payload): AppJson<UpdateNamedEntityRequest>,
) -> ApiResult<department::Model> {
    let updated = state.services.organization.update_department(&ctx, payload).await?;
    Ok(Json(ApiResponse::success(updated)))
}

#[utoipa::path(
    get,
    path = "/api/v1/department/get-by-id",
    params(IdQuery),
    responses(
        (status = 200, description = "Department, including a deleted one", body = ApiResponse<department::Model>),
        (status = 404, description = "Department not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "departments"
)]
pub async fn get_department(
    State(state): State<AppState>,
    ctx: OrgContext,
    AppQuery(query): AppQuery<IdQuery>,
) -> ApiResult<department::Model> {
    let found = state.services.organization.get_department(&ctx, query.id).await?;
    Ok(Json(ApiResponse::success(found)))
}

#[utoipa::path(
    get,
    path = "/api/v1/department/get-by-org",
    responses(
        (status = 200, description = "Non-deleted department rows of the caller's organization", body = ApiResponse<Vec<department::Model>>)
    ),
    security(("bearer_auth" = [])),
    tag = "departments"
)]
pub async fn list_departments(
    State(state): State<AppState>,
    ctx: OrgContext,
) -> ApiResult<Vec<department::Model>> {
    let rows = state.services.organization.list_departments(&ctx).await?;
    Ok(Json(ApiResponse::success(rows)))
}

#[utoipa::path(
    get,
    path = "/api/v1/department/get-all",
    responses(
        (status = 200, description = "Every department row of every organization", body = ApiResponse<Vec<department::Model>>),
        (status = 403, description = "Requires SuperAdmin", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "departments"
)]
pub async fn list_all_departments(
    State(state): State<AppState>,
) -> ApiResult<Vec<department::Model>> {
    let rows = state.services.organization.list_all_departments().await?;
    Ok(Json(ApiResponse::success(rows)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/department/delete",
    params(IdQuery),
    responses(
        (status = 200, description = "Department soft-deleted", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Department not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "departments"
)]
pub async fn delete_department(
    State(state): State<AppState>,
    ctx: OrgContext,
    AppQuery(query): AppQuery<IdQuery>,
) -> ApiResult<()> {
    state.services.organization.delete_department(&ctx, query.id).await?;
    Ok(done("Department deleted"))
}

#[utoipa::path(
    post,
    path = "/api/v1/sub-department/create",
    request_body = CreateSubDepartmentRequest,
    responses(
        (status = 200, description = "Sub-department created", body = ApiResponse<sub_department::Model>),
        (status = 400, description = "Invalid request or duplicate name", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "sub-departments"
)]
pub async fn create_sub_department(
    State(state): State<AppState>,
    ctx: OrgContext,
    AppJson(payload): AppJson<CreateSubDepartmentRequest>,
) -> ApiResult<sub_department::Model> {
    let created = state.services.organization.create_sub_department(&ctx, payload).await?;
    Ok(Json(ApiResponse::success(created)))
}

#[utoipa::path(
    put,
    path = "/api/v1/sub-department/update",
    request_body = UpdateSubDepartmentRequest,
    responses(
        (status = 200, description = "Sub-department updated", body = ApiResponse<sub_department::Model>),
        (status = 400, description = "Invalid request or duplicate name", body = crate::errors::ErrorResponse),
        (status = 404, description = "Sub-department not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "sub-departments"
)]
pub async fn update_sub_department(
    State(state): State<AppState>,
    ctx: OrgContext,
    AppJson(payload): AppJson<UpdateSubDepartmentRequest>,
) -> ApiResult<sub_department::Model> {
    let updated = state.services.organization.update_sub_department(&ctx, payload).await?;
    Ok(Json(ApiResponse::success(updated)))
}

#[utoipa::path(
    get,
    path = "/api/v1/sub-department/get-by-id",
    params(IdQuery),
    responses(
        (status = 200, description = "Sub-department, including a deleted one", body = ApiResponse<sub_department::Model>),
        (status = 404, description = "Sub-department not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "sub-departments"
)]
pub async fn get_sub_department(
    State(state): State<AppState>,
    ctx: OrgContext,
    AppQuery(query): AppQuery<IdQuery>,
) -> ApiResult<sub_department::Model> {
    let found = state.services.organization.get_sub_department(&ctx, query.id).await?;
    Ok(Json(ApiResponse::success(found)))
}

#[utoipa::path(
    get,
    path = "/api/v1/sub-department/get-by-org",
    responses(
        (status = 200, description = "Non-deleted sub-department rows of the caller's organization", body = ApiResponse<Vec<sub_department::Model>>)
    ),
    security(("bearer_auth" = [])),
    tag = "sub-departments"
)]
pub async fn list_sub_departments(
    State(state): State<AppState>,
    ctx: OrgContext,
) -> ApiResult<Vec<sub_department::Model>> {
    let rows = state.services.organization.list_sub_departments(&ctx).await?;
    Ok(Json(ApiResponse::success(rows)))
}

#[utoipa::path(
    get,
    path = "/api/v1/sub-department/get-all",
    responses(
        (status = 200, description = "Every sub-department row of every organization", body = ApiResponse<Vec<sub_department::Model>>),
        (status = 403, description = "Requires SuperAdmin", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "sub-departments"
)]
pub async fn list_all_sub_departments(
    State(state): State<AppState>,
) -> ApiResult<Vec<sub_department::Model>> {
    let rows = state.services.organization.list_all_sub_departments().await?;
    Ok(Json(ApiResponse::success(rows)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/sub-department/delete",
    params(IdQuery),
    responses(
        (status = 200, description = "Sub-department soft-deleted", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Sub-department not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "sub-departments"
)]
pub async fn delete_sub_department(
    State(state): State<AppState>,
    ctx: OrgContext,
    AppQuery(query): AppQuery<IdQuery>,
) -> ApiResult<()> {
    state.services.organization.delete_sub_department(&ctx, query.id).await?;
    Ok(done("Sub-department deleted"))
}

#[utoipa::path(
    post,
    path = "/api/v1/designation/create",
    request_body = NamedEntityRequest,
    responses(
        (status = 200, description = "Designation created", body = ApiResponse<designation::Model>),
        (status = 400, description = "Invalid request or duplicate name", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "designations"
)]
pub async fn create_designation(
    State(state): State<AppState>,
    ctx: OrgContext,
    AppJson(payload): AppJson<NamedEntityRequest>,
) -> ApiResult<designation::Model> {
    let created = state.services.organization.create_designation(&ctx, payload).await?;
    Ok(Json(ApiResponse::success(created)))
}

#[utoipa::path(
    put,
    path = "/api/v1/designation/update",
    request_body = UpdateNamedEntityRequest,
    responses(
        (status = 200, description = "Designation updated", body = ApiResponse<designation::Model>),
        (status = 400, description = "Invalid request or duplicate name", body = crate::errors::ErrorResponse),
        (status = 404, description = "Designation not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "designations"
)]
pub async fn update_designation(
    State(state): State<AppState>,
    ctx: OrgContext,
    AppJson(payload): AppJson<UpdateNamedEntityRequest>,
) -> ApiResult<designation::Model> {
    let updated = state.services.organization.update_designation(&ctx, payload).await?;
    Ok(Json(ApiResponse::success(updated)))
}

#[utoipa::path(
    get,
    path = "/api/v1/designation/get-by-id",
    params(IdQuery),
    responses(
        (status = 200, description = "Designation, including a deleted one", body = ApiResponse<designation::Model>),
        (status = 404, description = "Designation not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "designations"
)]
pub async fn get_designation(
    State(state): State<AppState>,
    ctx: OrgContext,
    AppQuery(query): AppQuery<IdQuery>,
) -> ApiResult<designation::Model> {
    let found = state.services.organization.get_designation(&ctx, query.id).await?;
    Ok(Json(ApiResponse::success(found)))
}

#[utoipa::path(
    get,
    path = "/api/v1/designation/get-by-org",
    responses(
        (status = 200, description = "Non-deleted designation rows of the caller's organization", body = ApiResponse<Vec<designation::Model>>)
    ),
    security(("bearer_auth" = [])),
    tag = "designations"
)]
pub async fn list_designations(
    State(state): State<AppState>,
    ctx: OrgContext,
) -> ApiResult<Vec<designation::Model>> {
    let rows = state.services.organization.list_designations(&ctx).await?;
    Ok(Json(ApiResponse::success(rows)))
}

#[utoipa::path(
    get,
    path = "/api/v1/designation/get-all",
    responses(
        (status = 200, description = "Every designation row of every organization", body = ApiResponse<Vec<designation::Model>>),
        (status = 403, description = "Requires SuperAdmin", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "designations"
)]
pub async fn list_all_designations(
    State(state): State<AppState>,
) -> ApiResult<Vec<designation::Model>> {
    let rows = state.services.organization.list_all_designations().await?;
    Ok(Json(ApiResponse::success(rows)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/designation/delete",
    params(IdQuery),
    responses(
        (status = 200, description = "Designation soft-deleted", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Designation not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "designations"
)]
pub async fn delete_designation(
    State(state): State<AppState>,
    ctx: OrgContext,
    AppQuery(query): AppQuery<IdQuery>,
) -> ApiResult<()> {
    state.services.organization.delete_designation(&ctx, query.id).await?;
    Ok(done("Designation deleted"))
}

#[utoipa::path(
    post,
    path = "/api/v1/industry/create",
    request_body = NamedEntityRequest,
    responses(
        (status = 200, description = "Industry created", body = ApiResponse<industry::Model>),
        (status = 400, description = "Invalid request or duplicate name", body = crate::errors::ErrorResponse),
        (status = 403, description = "Requires Admin", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "industries"
)]
pub async fn create_industry(
    State(state): State<AppState>,
    ctx: OrgContext,
    AppJson(payload): AppJson<NamedEntityRequest>,
) -> ApiResult<industry::Model> {
    let created = state
        .services
        .organization
        .create_industry(&ctx, payload)
        .await?;
    Ok(Json(ApiResponse::success(created)))
}

#[utoipa::path(
    put,
    path = "/api/v1/industry/update",
    request_body = UpdateNamedEntityRequest,
    responses(
        (status = 200, description = "Industry updated", body = ApiResponse<industry::Model>),
        (status = 404, description = "Industry not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "industries"
)]
pub async fn update_industry(
    State(state): State<AppState>,
    ctx: OrgContext,
    AppJson(payload): AppJson<UpdateNamedEntityRequest>,
) -> ApiResult<industry::Model> {
    let updated = state
        .services
        .organization
        .update_industry(&ctx, payload)
        .await?;
    Ok(Json(ApiResponse::success(updated)))
}

#[utoipa::path(
    get,
    path = "/api/v1/industry/get-by-id",
    params(IdQuery),
    responses(
        (status = 200, description = "Industry, including a deleted one", body = ApiResponse<industry::Model>),
        (status = 404, description = "Industry not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "industries"
)]
pub async fn get_industry(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<IdQuery>,
) -> ApiResult<industry::Model> {
    let found = state.services.organization.get_industry(query.id).await?;
    Ok(Json(ApiResponse::success(found)))
}

/// Industries are global. SuperAdmin also sees deleted rows.
#[utoipa::path(
    get,
    path = "/api/v1/industry/get-all",
    responses(
        (status = 200, description = "Industries", body = ApiResponse<Vec<industry::Model>>)
    ),
    security(("bearer_auth" = [])),
    tag = "industries"
)]
pub async fn list_industries(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Vec<industry::Model>> {
    let service = &state.services.organization;
    let rows = if user.is_super_admin() {
        service.list_all_industries().await?
    } else {
        service.list_industries().await?
    };
    Ok(Json(ApiResponse::success(rows)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/industry/delete",
    params(IdQuery),
    responses(
        (status = 200, description = "Industry soft-deleted", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Industry not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "industries"
)]
pub async fn delete_industry(
    State(state): State<AppState>,
    ctx: OrgContext,
    AppQuery(query): AppQuery<IdQuery>,
) -> ApiResult<()> {
    state
        .services
        .organization
        .delete_industry(&ctx, query.id)
        .await?;
    Ok(done("Industry deleted"))
}

pub fn routes() -> Router<AppState> {
    let industry_view = Router::new()
        .route("/industry/get-by-id", get(get_industry))
        .route("/industry/get-all", get(list_industries))
        .with_role(&Page::Industry.role(Action::View));
    let industry_manage = Router::new()
        .route("/industry/create", post(create_industry))
        .route("/industry/update", put(update_industry))
        .route("/industry/delete", delete(delete_industry))
        .with_role(ADMIN);

    Router::new()
        .merge(crud_routes(
            "company",
            Page::Company,
            CrudRoutes {
                create: post(create_company),
                update: put(update_company),
                get_by_id: get(get_company),
                get_by_org: get(list_companies),
                get_all: get(list_all_companies),
                delete: delete(delete_company),
            },
        ))
        .merge(crud_routes(
            "department",
            Page::Department,
            CrudRoutes {
                create: post(create_department),
                update: put(update_department),
                get_by_id: get(get_department),
                get_by_org: get(list_departments),
                get_all: get(list_all_departments),
                delete: delete(delete_department),
            },
        ))
        .merge(crud_routes(
            "sub-department",
            Page::SubDepartment,
            CrudRoutes {
                create: post(create_sub_department),
                update: put(update_sub_department),
                get_by_id: get(get_sub_department),
                get_by_org: get(list_sub_departments),
                get_all: get(list_all_sub_departments),
                delete: delete(delete_sub_department),
            },
        ))
        .merge(crud_routes(
            "designation",
            Page::Designation,
            CrudRoutes {
                create: post(create_designation),
                update: put(update_designation),
                get_by_id: get(get_designation),
                get_by_org: get(list_designations),
                get_all: get(list_all_designations),
                delete: delete(delete_designation),
            },
        ))
        .merge(industry_view)
        .merge(industry_manage)
}
