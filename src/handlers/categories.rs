use axum::{
    extract::State,
    response::Json,
    routing::{delete, get, post, put},
    Router,
};

use crate::{
    entities::{category, sub_category},
    auth::catalog::{Action, Page},
    auth::AuthRouterExt,
    handlers::common::{crud_routes, done, AppJson, AppQuery, CrudRoutes},
    services::categories::{CreateSubCategoryRequest, UpdateSubCategoryRequest},
    services::context::OrgContext,
    services::reference::{IdQuery, NamedEntityRequest, UpdateNamedEntityRequest},
    ApiResponse, ApiResult, AppState,
};

#[utoipa::path(
    post,
    path = "/api/v1/category/create",
    request_body = NamedEntityRequest,
    responses(
        (status = 200, description = "Category created", body = ApiResponse<category::Model>),
        (status = 400, description = "Invalid request or duplicate name", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "categories"
)]
pub async fn create_category(
    State(state): State<AppState>,
    ctx: OrgContext,
    AppJson(payload): AppJson<NamedEntityRequest>,
) -> ApiResult<category::Model> {
    let created = state.services.categories.create_category(&ctx, payload).await?;
    Ok(Json(ApiResponse::success(created)))
}

#[utoipa::path(
    put,
    path = "/api/v1/category/update",
    request_body = UpdateNamedEntityRequest,
    responses(
        (status = 200, description = "Category updated", body = ApiResponse<category::Model>),
        (status = 400, description = "Invalid request or duplicate name", body = crate::errors::ErrorResponse),
        (status = 404, description = "Category not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "categories"
)]
pub async fn update_category(
    State(state): State<AppState>,
    ctx: OrgContext,
    AppJson(payload): AppJson<UpdateNamedEntityRequest>,
) -> ApiResult<category::Model> {
    let updated = state.services.categories.update_category(&ctx, payload).await?;
    Ok(Json(ApiResponse::success(updated)))
}

#[utoipa::path(
    get,
    path = "/api/v1/category/get-by-id",
    params(IdQuery),
    responses(
        (status = 200, description = "Category, including a deleted one", body = ApiResponse<category::Model>),
        (status = 404, description = "Category not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "categories"
)]
pub async fn get_category(
    State(state): State<AppState>,
    ctx: OrgContext,
    AppQuery(query): AppQuery<IdQuery>,
) -> ApiResult<category::Model> {
    let found = state.services.categories.get_category(&ctx, query.id).await?;
    Ok(Json(ApiResponse::success(found)))
}

#[utoipa::path(
    get,
    path = "/api/v1/category/get-by-org",
    responses(
        (status = 200, description = "Non-deleted category rows of the caller's organization", body = ApiResponse<Vec<category::Model>>)
    ),
    security(("bearer_auth" = [])),
    tag = "categories"
)]
pub async fn list_categories(
    State(state): State<AppState>,
    ctx: OrgContext,
) -> ApiResult<Vec<category::Model>> {
    let rows = state.services.categories.list_categories(&ctx).await?;
    Ok(Json(ApiResponse::success(rows)))
}

#[utoipa::path(
    get,
    path = "/api/v1/category/get-all",
    responses(
        (status = 200, description = "Every category row of every organization", body = ApiResponse<Vec<category::Model>>),
        (status = 403, description = "Requires SuperAdmin", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "categories"
)]
pub async fn list_all_categories(State(state): State<AppState>) -> ApiResult<Vec<category::Model>> {
    let rows = state.services.categories.list_all_categories().await?;
    Ok(Json(ApiResponse::success(rows)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/category/delete",
    params(IdQuery),
    responses(
        (status = 200, description = "Category soft-deleted", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Category not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "categories"
)]
pub async fn delete_category(
    State(state): State<AppState>,
    ctx: OrgContext,
    AppQuery(query): AppQuery<IdQuery>,
) -> ApiResult<()> {
    state.services.categories.delete_category(&ctx, query.id).await?;
    Ok(done("Category deleted"))
}

#[utoipa::path(
    post,
    path = "/api/v1/sub-category/create",
    request_body = CreateSubCategoryRequest,
    responses(
        (status = 200, description = "Sub-category created", body = ApiResponse<sub_category::Model>),
        (status = 400, description = "Invalid request or duplicate name", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "sub-categories"
)]
pub async fn create_sub_category(
    State(state): State<AppState>,
    ctx: OrgContext,
    AppJson(payload): AppJson<CreateSubCategoryRequest>,
) -> ApiResult<sub_category::Model> {
    let created = state.services.categories.create_sub_category(&ctx, payload).await?;
    Ok(Json(ApiResponse::success(created)))
}

#[utoipa::path(
    put,
    path = "/api/v1/sub-category/update",
    request_body = UpdateSubCategoryRequest,
    responses(
        (status = 200, description = "Sub-category updated", body = ApiResponse<sub_category::Model>),
        (status = 400, description = "Invalid request or duplicate name", body = crate::errors::ErrorResponse),
        (status = 404, description = "Sub-category not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "sub-categories"
)]
pub async fn update_sub_category(
    State(state): State<AppState>,
    ctx: OrgContext,
    AppJson(payload): AppJson<UpdateSubCategoryRequest>,
) -> ApiResult<sub_category::Model> {
    let updated = state.services.categories.update_sub_category(&ctx, payload).await?;
    Ok(Json(ApiResponse::success(updated)))
}

#[utoipa::path(
    get,
    path = "/api/v1/sub-category/get-by-id",
    params(IdQuery),
    responses(
        (status = 200, description = "Sub-category, including a deleted one", body = ApiResponse<sub_category::Model>),
        (status = 404, description = "Sub-category not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "sub-categories"
)]
pub async fn get_sub_category(
    State(state): State<AppState>,
    ctx: OrgContext,
    AppQuery(query): AppQuery<IdQuery>,
) -> ApiResult<sub_category::Model> {
    let found = state.services.categories.get_sub_category(&ctx, query.id).await?;
    Ok(Json(ApiResponse::success(found)))
}

#[utoipa::path(
    get,
    path = "/api/v1/sub-category/get-by-org",
    responses(
        (status = 200, description = "Non-deleted sub-category rows of the caller's organization", body = ApiResponse<Vec<sub_category::Model>>)
    ),
    security(("bearer_auth" = [])),
    tag = "sub-categories"
)]
pub async fn list_sub_categories(
    State(state): State<AppState>,
    ctx: OrgContext,
) -> ApiResult<Vec<sub_category::Model>> {
    let rows = state.services.categories.list_sub_categories(&ctx).await?;
    Ok(Json(ApiResponse::success(rows)))
}

#[utoipa::path(
    get,
    path = "/api/v1/sub-category/get-all",
    responses(
        (status = 200, description = "Every sub-category row of every organization", body = ApiResponse<Vec<sub_category::Model>>),
        (status = 403, description = "Requires SuperAdmin", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "sub-categories"
)]
pub async fn list_all_sub_categories(
    State(state): State<AppState>,
) -> ApiResult<Vec<sub_category::Model>> {
    let rows = state.services.categories.list_all_sub_categories().await?;
    Ok(Json(ApiResponse::success(rows)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/sub-category/delete",
    params(IdQuery),
    responses(
        (status = 200, description = "Sub-category soft-deleted", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Sub-category not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "sub-categories"
)]
pub async fn delete_sub_category(
    State(state): State<AppState>,
    ctx: OrgContext,
    AppQuery(query): AppQuery<IdQuery>,
) -> ApiResult<()> {
    state.services.categories.delete_sub_category(&ctx, query.id).await?;
    Ok(done("Sub-category deleted"))
}

#[utoipa::path(
    get,
    path = "/api/v1/sub-category/get-by-category",
    params(IdQuery),
    responses(
        (status = 200, description = "Non-deleted sub-categories of one category", body = ApiResponse<Vec<sub_category::Model>>)
    ),
    security(("bearer_auth" = [])),
    tag = "sub-categories"
)]
pub async fn list_sub_categories_of(
    State(state): State<AppState>,
    ctx: OrgContext,
    AppQuery(query): AppQuery<IdQuery>,
) -> ApiResult<Vec<sub_category::Model>> {
    let rows = state
        .services
        .categories
        .list_sub_categories_of(&ctx, query.id)
        .await?;
    Ok(Json(ApiResponse::success(rows)))
}

pub fn routes() -> Router<AppState> {
    let by_category = Router::new()
        .route("/sub-category/get-by-category", get(list_sub_categories_of))
        .with_role(&Page::SubCategory.role(Action::View));

    Router::new()
        .merge(crud_routes(
            "category",
            Page::Category,
            CrudRoutes {
                create: post(create_category),
                update: put(update_category),
                get_by_id: get(get_category),
                get_by_org: get(list_categories),
                get_all: get(list_all_categories),
                delete: delete(delete_category),
            },
        ))
        .merge(crud_routes(
            "sub-category",
            Page::SubCategory,
            CrudRoutes {
                create: post(create_sub_category),
                update: put(update_sub_category),
                get_by_id: get(get_sub_category),
                get_by_org: get(list_sub_categories),
                get_all: get(list_all_sub_categories),
                delete: delete(delete_sub_category),
            },
        ))
        .merge(by_category)
}
