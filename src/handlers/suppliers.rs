use axum::{
    extract::{DefaultBodyLimit, State},
    response::Json,
    routing::{delete, get, post, put},
    Router,
};

use crate::{
    entities::supplier,
    auth::catalog::Page,
    handlers::common::{crud_routes, done, AppJson, AppQuery, CrudRoutes},
    services::context::OrgContext,
    services::reference::IdQuery,
    services::storage::upload_body_limit,
    services::suppliers::{CreateSupplierRequest, UpdateSupplierRequest},
    ApiResponse, ApiResult, AppState,
};

#[utoipa::path(
    post,
    path = "/api/v1/supplier/create",
    request_body = CreateSupplierRequest,
    responses(
        (status = 200, description = "Supplier created", body = ApiResponse<supplier::Model>),
        (status = 400, description = "Invalid request or duplicate name", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "suppliers"
)]
pub async fn create_supplier(
    State(state): State<AppState>,
    ctx: OrgContext,
    AppJson(payload): AppJson<CreateSupplierRequest>,
) -> ApiResult<supplier::Model> {
    let created = state.services.suppliers.create_supplier(&ctx, payload).await?;
    Ok(Json(ApiResponse::success(created)))
}

#[utoipa::path(
    put,
    path = "/api/v1/supplier/update",
    request_body = UpdateSupplierRequest,
    responses(
        (status = 200, description = "Supplier updated", body = ApiResponse<supplier::Model>),
        (status = 400, description = "Invalid request or duplicate name", body = crate::errors::ErrorResponse),
        (status = 404, description = "Supplier not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "suppliers"
)]
pub async fn update_supplier(
    State(state): State<AppState>,
    ctx: OrgContext,
    AppJson(payload): AppJson<UpdateSupplierRequest>,
) -> ApiResult<supplier::Model> {
    let updated = state.services.suppliers.update_supplier(&ctx, payload).await?;
    Ok(Json(ApiResponse::success(updated)))
}

#[utoipa::path(
    get,
    path = "/api/v1/supplier/get-by-id",
    params(IdQuery),
    responses(
        (status = 200, description = "Supplier, including a deleted one", body = ApiResponse<supplier::Model>),
        (status = 404, description = "Supplier not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "suppliers"
)]
pub async fn get_supplier(
    State(state): State<AppState>,
    ctx: OrgContext,
    AppQuery(query): AppQuery<IdQuery>,
) -> ApiResult<supplier::Model> {
    let found = state.services.suppliers.get_supplier(&ctx, query.id).await?;
    Ok(Json(ApiResponse::success(found)))
}

#[utoipa::path(
    get,
    path = "/api/v1/supplier/get-by-org",
    responses(
        (status = 200, description = "Non-deleted supplier rows of the caller's organization", body = ApiResponse<Vec<supplier::Model>>)
    ),
    security(("bearer_auth" = [])),
    tag = "suppliers"
)]
pub async fn list_suppliers(
    State(state): State<AppState>,
    ctx: OrgContext,
) -> ApiResult<Vec<supplier::Model>> {
    let rows = state.services.suppliers.list_suppliers(&ctx).await?;
    Ok(Json(ApiResponse::success(rows)))
}

#[utoipa::path(
    get,
    path = "/api/v1/supplier/get-all",
    responses(
        (status = 200, description = "Every supplier row of every organization", body = ApiResponse<Vec<supplier::Model>>),
        (status = 403, description = "Requires SuperAdmin", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "suppliers"
)]
pub async fn list_all_suppliers(State(state): State<AppState>) -> ApiResult<Vec<supplier::Model>> {
    let rows = state.services.suppliers.list_all_suppliers().await?;
    Ok(Json(ApiResponse::success(rows)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/supplier/delete",
    params(IdQuery),
    responses(
        (status = 200, description = "Supplier soft-deleted", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Supplier not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "suppliers"
)]
pub async fn delete_supplier(
    State(state): State<AppState>,
    ctx: OrgContext,
    AppQuery(query): AppQuery<IdQuery>,
) -> ApiResult<()> {
    state.services.suppliers.delete_supplier(&ctx, query.id).await?;
    Ok(done("Supplier deleted"))
}

pub fn routes() -> Router<AppState> {
    crud_routes(
        "supplier",
        Page::Supplier,
        CrudRoutes {
            create: post(create_supplier),
            update: put(update_supplier),
            get_by_id: get(get_supplier),
            get_by_org: get(list_suppliers),
            get_all: get(list_all_suppliers),
            delete: delete(delete_supplier),
        },
    )
    .layer(DefaultBodyLimit::max(upload_body_limit(1)))
}
