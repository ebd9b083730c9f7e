//! Cities, sites and areas.

use axum::{
    extract::State,
    response::Json,
    routing::{delete, get, post, put},
    Router,
};

use crate::{
    entities::{area, city, site},
    auth::catalog::Page,
    handlers::common::{crud_routes, done, AppJson, AppQuery, CrudRoutes},
    services::context::OrgContext,
    services::locations::{
        CreateAreaRequest, CreateSiteRequest, UpdateAreaRequest, UpdateSiteRequest,
    },
    services::reference::{IdQuery, NamedEntityRequest, UpdateNamedEntityRequest},
    ApiResponse, ApiResult, AppState,
};

#[utoipa::path(
    post,
    path = "/api/v1/city/create",
    request_body = NamedEntityRequest,
    responses(
        (status = 200, description = "City created", body = ApiResponse<city::Model>),
        (status = 400, description = "Invalid request or duplicate name", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "cities"
)]
pub async fn create_city(
    State(state): State<AppState>,
    ctx: OrgContext,
    AppJson(payload): AppJson<NamedEntityRequest>,
) -> ApiResult<city::Model> {
    let created = state.services.locations.create_city(&ctx, payload).await?;
    Ok(Json(ApiResponse::success(created)))
}

#[utoipa::path(
    put,
    path = "/api/v1/city/update",
    request_body = UpdateNamedEntityRequest,
    responses(
        (status = 200, description = "City updated", body = ApiResponse<city::Model>),
        (status = 400, description = "Invalid request or duplicate name", body = crate::errors::ErrorResponse),
        (status = 404, description = "City not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "cities"
)]
pub async fn update_city(
    State(state): State<AppState>,
    ctx: OrgContext,
    AppJson(payload): AppJson<UpdateNamedEntityRequest>,
) -> ApiResult<city::Model> {
    let updated = state.services.locations.update_city(&ctx, payload).await?;
    Ok(Json(ApiResponse::success(updated)))
}

#[utoipa::path(
    get,
    path = "/api/v1/city/get-by-id",
    params(IdQuery),
    responses(
        (status = 200, description = "City, including a deleted one", body = ApiResponse<city::Model>),
        (status = 404, description = "City not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "cities"
)]
pub async fn get_city(
    State(state): State<AppState>,
    ctx: OrgContext,
    AppQuery(query): AppQuery<IdQuery>,
) -> ApiResult<city::Model> {
    let found = state.services.locations.get_city(&ctx, query.id).await?;
    Ok(Json(ApiResponse::success(found)))
}

#[utoipa::path(
    get,
    path = "/api/v1/city/get-by-org",
    responses(
        (status = 200, description = "Non-deleted city rows of the caller's organization", body = ApiResponse<Vec<city::Model>>)
    ),
    security(("bearer_auth" = [])),
    tag = "cities"
)]
pub async fn list_cities(
    State(state): State<AppState>,
    ctx: OrgContext,
) -> ApiResult<Vec<city::Model>> {
    let rows = state.services.locations.list_cities(&ctx).await?;
    Ok(Json(ApiResponse::success(rows)))
}

#[utoipa::path(
    get,
    path = "/api/v1/city/get-all",
    responses(
        (status = 200, description = "Every city row of every organization", body = ApiResponse<Vec<city::Model>>),
        (status = 403, description = "Requires SuperAdmin", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "cities"
)]
pub async fn list_all_cities(State(state): State<AppState>) -> ApiResult<Vec<city::Model>> {
    let rows = state.services.locations.list_all_cities().await?;
    Ok(Json(ApiResponse::success(rows)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/city/delete",
    params(IdQuery),
    responses(
        (status = 200, description = "City soft-deleted", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "City not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "cities"
)]
pub async fn delete_city(
    State(state): State<AppState>,
    ctx: OrgContext,
    AppQuery(query): AppQuery<IdQuery>,
) -> ApiResult<()> {
    state.services.locations.delete_city(&ctx, query.id).await?;
    Ok(done("City deleted"))
}

#[utoipa::path(
    post,
    path = "/api/v1/site/create",
    request_body = CreateSiteRequest,
    responses(
        (status = 200, description = "Site created", body = ApiResponse<site::Model>),
        (status = 400, description = "Invalid request or duplicate name", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "sites"
)]
pub async fn create_site(
    State(state): State<AppState>,
    ctx: OrgContext,
    AppJson(payload): AppJson<CreateSiteRequest>,
) -> ApiResult<site::Model> {
    let created = state.services.locations.create_site(&ctx, payload).await?;
    Ok(Json(ApiResponse::success(created)))
}

#[utoipa::path(
    put,
    path = "/api/v1/site/update",
    request_body = UpdateSiteRequest,
    responses(
        (status = 200, description = "Site updated", body = ApiResponse<site::Model>),
        (status = 400, description = "Invalid request or duplicate name", body = crate::errors::ErrorResponse),
        (status = 404, description = "Site not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "sites"
)]
pub async fn update_site(
    State(state): State<AppState>,
    ctx: OrgContext,
    AppJson(payload): AppJson<UpdateSiteRequest>,
) -> ApiResult<site::Model> {
    let updated = state.services.locations.update_site(&ctx, payload).await?;
    Ok(Json(ApiResponse::success(updated)))
}

#[utoipa::path(
    get,
    path = "/api/v1/site/get-by-id",
    params(IdQuery),
    responses(
        (status = 200, description = "Site, including a deleted one", body = ApiResponse<site::Model>),
        (status = 404, description = "Site not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "sites"
)]
pub async fn get_site(
    State(state): State<AppState>,
    ctx: OrgContext,
    AppQuery(query): AppQuery<IdQuery>,
) -> ApiResult<site::Model> {
    let found = state.services.locations.get_site(&ctx, query.id).await?;
    Ok(Json(ApiResponse::success(found)))
}

#[utoipa::path(
    get,
    path = "/api/v1/site/get-by-org",
    responses(
        (status = 200, description = "Non-deleted site rows of the caller's organization", body = ApiResponse<Vec<site::Model>>)
    ),
    security(("bearer_auth" = [])),
    tag = "sites"
)]
pub async fn list_sites(
    State(state): State<AppState>,
    ctx: OrgContext,
) -> ApiResult<Vec<site::Model>> {
    let rows = state.services.locations.list_sites(&ctx).await?;
    Ok(Json(ApiResponse::success(rows)))
}

#[utoipa::path(
    get,
    path = "/api/v1/site/get-all",
    responses(
        (status = 200, description = "Every site row of every organization", body = ApiResponse<Vec<site::Model>>),
        (status = 403, description = "Requires SuperAdmin", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "sites"
)]
pub async fn list_all_sites(State(state): State<AppState>) -> ApiResult<Vec<site::Model>> {
    let rows = state.services.locations.list_all_sites().await?;
    Ok(Json(ApiResponse::success(rows)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/site/delete",
    params(IdQuery),
    responses(
        (status = 200, description = "Site soft-deleted", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Site not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "sites"
)]
pub async fn delete_site(
    State(state): State<AppState>,
    ctx: OrgContext,
    AppQuery(query): AppQuery<IdQuery>,
) -> ApiResult<()> {
    state.services.locations.delete_site(&ctx, query.id).await?;
    Ok(done("Site deleted"))
}

#[utoipa::path(
    post,
    path = "/api/v1/area/create",
    request_body = CreateAreaRequest,
    responses(
        (status = 200, description = "Area created", body = ApiResponse<area::Model>),
        (status = 400, description = "Invalid request or duplicate name", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "areas"
)]
pub async fn create_area(
    State(state): State<AppState>,
    ctx: OrgContext,
    AppJson(payload): AppJson<CreateAreaRequest>,
) -> ApiResult<area::Model> {
    let created = state.services.locations.create_area(&ctx, payload).await?;
    Ok(Json(ApiResponse::success(created)))
}

#[utoipa::path(
    put,
    path = "/api/v1/area/update",
    request_body = UpdateAreaRequest,
    responses(
        (status = 200, description = "Area updated", body = ApiResponse<area::Model>),
        (status = 400, description = "Invalid request or duplicate name", body = crate::errors::ErrorResponse),
        (status = 404, description = "Area not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "areas"
)]
pub async fn update_area(
    State(state): State<AppState>,
    ctx: OrgContext,
    AppJson(payload): AppJson<UpdateAreaRequest>,
) -> ApiResult<area::Model> {
    let updated = state.services.locations.update_area(&ctx, payload).await?;
    Ok(Json(ApiResponse::success(updated)))
}

#[utoipa::path(
    get,
    path = "/api/v1/area/get-by-id",
    params(IdQuery),
    responses(
        (status = 200, description = "Area, including a deleted one", body = ApiResponse<area::Model>),
        (status = 404, description = "Area not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "areas"
)]
pub async fn get_area(
    State(state): State<AppState>,
    ctx: OrgContext,
    AppQuery(query): AppQuery<IdQuery>,
) -> ApiResult<area::Model> {
    let found = state.services.locations.get_area(&ctx, query.id).await?;
    Ok(Json(ApiResponse::success(found)))
}

#[utoipa::path(
    get,
    path = "/api/v1/area/get-by-org",
    responses(
        (status = 200, description = "Non-deleted area rows of the caller's organization", body = ApiResponse<Vec<area::Model>>)
    ),
    security(("bearer_auth" = [])),
    tag = "areas"
)]
pub async fn list_areas(
    State(state): State<AppState>,
    ctx: OrgContext,
) -> ApiResult<Vec<area::Model>> {
    let rows = state.services.locations.list_areas(&ctx).await?;
    Ok(Json(ApiResponse::success(rows)))
}

#[utoipa::path(
    get,
    path = "/api/v1/area/get-all",
    responses(
        (status = 200, description = "Every area row of every organization", body = ApiResponse<Vec<area::Model>>),
        (status = 403, description = "Requires SuperAdmin", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "areas"
)]
pub async fn list_all_areas(State(state): State<AppState>) -> ApiResult<Vec<area::Model>> {
    let rows = state.services.locations.list_all_areas().await?;
    Ok(Json(ApiResponse::success(rows)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/area/delete",
    params(IdQuery),
    responses(
        (status = 200, description = "Area soft-deleted", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Area not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "areas"
)]
pub async fn delete_area(
    State(state): State<AppState>,
    ctx: OrgContext,
    AppQuery(query): AppQuery<IdQuery>,
) -> ApiResult<()> {
    state.services.locations.delete_area(&ctx, query.id).await?;
    Ok(done("Area deleted"))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(crud_routes(
            "city",
            Page::City,
            CrudRoutes {
                create: post(create_city),
                update: put(update_city),
                get_by_id: get(get_city),
                get_by_org: get(list_cities),
                get_all: get(list_all_cities),
                delete: delete(delete_city),
            },
        ))
        .merge(crud_routes(
            "site",
            Page::Site,
            CrudRoutes {
                create: post(create_site),
                update: put(update_site),
                get_by_id: get(get_site),
                get_by_org: get(list_sites),
                get_all: get(list_all_sites),
                delete: delete(delete_site),
            },
        ))
        .merge(crud_routes(
            "area",
            Page::Area,
            CrudRoutes {
                create: post(create_area),
                update: put(update_area),
                get_by_id: get(get_area),
                get_by_org: get(list_areas),
                get_all: get(list_all_areas),
                delete: delete(delete_area),
            },
        ))
}
