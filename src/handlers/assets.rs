//! Asset lifecycle, approval workflow and organization asset statuses.

use axum::{
    extract::{DefaultBodyLimit, State},
    response::Json,
    routing::{delete, get, post, put},
    Router,
};

use crate::{
    auth::{
        catalog::{Action, Page},
        AuthRouterExt,
    },
    entities::{asset_history, asset_request, asset_status},
    handlers::common::{done, AppJson, AppQuery},
    services::assets::{
        ApproveAssetRequest, AssetActionOutcome, AssetDetail, AssetListQuery,
        AssetRequestDecision, CreateAssetRequest, DisposeAssetRequest, RejectAssetRequest,
        TransferAssetRequest, UpdateAssetRequest,
    },
    services::context::OrgContext,
    services::reference::{IdQuery, NamedEntityRequest},
    services::storage::upload_body_limit,
    ApiResponse, ApiResult, AppState,
};

#[utoipa::path(
    post,
    path = "/api/v1/asset/create",
    request_body = CreateAssetRequest,
    responses(
        (status = 200, description = "Asset created", body = ApiResponse<AssetDetail>),
        (status = 400, description = "Invalid request or reference", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "assets"
)]
pub async fn create_asset(
    State(state): State<AppState>,
    ctx: OrgContext,
    AppJson(payload): AppJson<CreateAssetRequest>,
) -> ApiResult<AssetDetail> {
    let asset = state.services.assets.create_asset(&ctx, payload).await?;
    Ok(Json(ApiResponse::success(asset)))
}

#[utoipa::path(
    put,
    path = "/api/v1/asset/update",
    request_body = UpdateAssetRequest,
    responses(
        (status = 200, description = "Asset updated", body = ApiResponse<AssetDetail>),
        (status = 400, description = "Invalid request or asset disposed", body = crate::errors::ErrorResponse),
        (status = 404, description = "Asset not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "assets"
)]
pub async fn update_asset(
    State(state): State<AppState>,
    ctx: OrgContext,
    AppJson(payload): AppJson<UpdateAssetRequest>,
) -> ApiResult<AssetDetail> {
    let asset = state.services.assets.update_asset(&ctx, payload).await?;
    Ok(Json(ApiResponse::success(asset)))
}

#[utoipa::path(
    post,
    path = "/api/v1/asset/transfer",
    request_body = TransferAssetRequest,
    responses(
        (status = 200, description = "Transfer applied, or raised for approval", body = ApiResponse<AssetActionOutcome>),
        (status = 400, description = "Invalid target, dates, or asset disposed", body = crate::errors::ErrorResponse),
        (status = 404, description = "Asset not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "assets"
)]
pub async fn transfer_asset(
    State(state): State<AppState>,
    ctx: OrgContext,
    AppJson(payload): AppJson<TransferAssetRequest>,
) -> ApiResult<AssetActionOutcome> {
    let outcome = state.services.assets.transfer_asset(&ctx, payload).await?;
    Ok(Json(ApiResponse::success(outcome)))
}

#[utoipa::path(
    post,
    path = "/api/v1/asset/dispose",
    request_body = DisposeAssetRequest,
    responses(
        (status = 200, description = "Disposal applied, or raised for approval", body = ApiResponse<AssetActionOutcome>),
        (status = 400, description = "Asset already disposed", body = crate::errors::ErrorResponse),
        (status = 404, description = "Asset not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "assets"
)]
pub async fn dispose_asset(
    State(state): State<AppState>,
    ctx: OrgContext,
    AppJson(payload): AppJson<DisposeAssetRequest>,
) -> ApiResult<AssetActionOutcome> {
    let outcome = state.services.assets.dispose_asset(&ctx, payload).await?;
    Ok(Json(ApiResponse::success(outcome)))
}

#[utoipa::path(
    post,
    path = "/api/v1/asset/approve",
    request_body = ApproveAssetRequest,
    responses(
        (status = 200, description = "Sign-off recorded; effect applied at the last level", body = ApiResponse<AssetRequestDecision>),
        (status = 400, description = "Request already decided", body = crate::errors::ErrorResponse),
        (status = 403, description = "Requester cannot approve their own request", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "assets"
)]
pub async fn approve_request(
    State(state): State<AppState>,
    ctx: OrgContext,
    AppJson(payload): AppJson<ApproveAssetRequest>,
) -> ApiResult<AssetRequestDecision> {
    let decision = state.services.assets.approve_request(&ctx, payload).await?;
    Ok(Json(ApiResponse::success(decision)))
}

#[utoipa::path(
    post,
    path = "/api/v1/asset/reject",
    request_body = RejectAssetRequest,
    responses(
        (status = 200, description = "Request rejected", body = ApiResponse<AssetRequestDecision>),
        (status = 400, description = "Request already decided", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "assets"
)]
pub async fn reject_request(
    State(state): State<AppState>,
    ctx: OrgContext,
    AppJson(payload): AppJson<RejectAssetRequest>,
) -> ApiResult<AssetRequestDecision> {
    let decision = state.services.assets.reject_request(&ctx, payload).await?;
    Ok(Json(ApiResponse::success(decision)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/asset/delete",
    params(IdQuery),
    responses(
        (status = 200, description = "Asset soft-deleted", body = ApiResponse<serde_json::Value>),
        (status = 400, description = "Asset has a pending request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Asset not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "assets"
)]
pub async fn delete_asset(
    State(state): State<AppState>,
    ctx: OrgContext,
    AppQuery(query): AppQuery<IdQuery>,
) -> ApiResult<()> {
    state.services.assets.delete_asset(&ctx, query.id).await?;
    Ok(done("Asset deleted"))
}

#[utoipa::path(
    get,
    path = "/api/v1/asset/get-by-id",
    params(IdQuery),
    responses(
        (status = 200, description = "Asset with reference names and current assignment", body = ApiResponse<AssetDetail>),
        (status = 404, description = "Asset not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "assets"
)]
pub async fn get_asset(
    State(state): State<AppState>,
    ctx: OrgContext,
    AppQuery(query): AppQuery<IdQuery>,
) -> ApiResult<AssetDetail> {
    let asset = state.services.assets.get_asset(&ctx, query.id).await?;
    Ok(Json(ApiResponse::success(asset)))
}

#[utoipa::path(
    get,
    path = "/api/v1/asset/get-by-org",
    params(AssetListQuery),
    responses(
        (status = 200, description = "Non-deleted assets; disposed ones only on request", body = ApiResponse<Vec<AssetDetail>>)
    ),
    security(("bearer_auth" = [])),
    tag = "assets"
)]
pub async fn list_assets(
    State(state): State<AppState>,
    ctx: OrgContext,
    AppQuery(query): AppQuery<AssetListQuery>,
) -> ApiResult<Vec<AssetDetail>> {
    let assets = state.services.assets.list_assets(&ctx, query).await?;
    Ok(Json(ApiResponse::success(assets)))
}

#[utoipa::path(
    get,
    path = "/api/v1/asset/history",
    params(IdQuery),
    responses(
        (status = 200, description = "History rows, newest first", body = ApiResponse<Vec<asset_history::Model>>),
        (status = 404, description = "Asset not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "assets"
)]
pub async fn asset_history(
    State(state): State<AppState>,
    ctx: OrgContext,
    AppQuery(query): AppQuery<IdQuery>,
) -> ApiResult<Vec<asset_history::Model>> {
    let history = state.services.assets.asset_history(&ctx, query.id).await?;
    Ok(Json(ApiResponse::success(history)))
}

#[utoipa::path(
    get,
    path = "/api/v1/asset/pending-requests",
    responses(
        (status = 200, description = "Requests awaiting approval", body = ApiResponse<Vec<asset_request::Model>>)
    ),
    security(("bearer_auth" = [])),
    tag = "assets"
)]
pub async fn pending_requests(
    State(state): State<AppState>,
    ctx: OrgContext,
) -> ApiResult<Vec<asset_request::Model>> {
    let requests = state.services.assets.pending_requests(&ctx).await?;
    Ok(Json(ApiResponse::success(requests)))
}

#[utoipa::path(
    post,
    path = "/api/v1/asset-status/create",
    request_body = NamedEntityRequest,
    responses(
        (status = 200, description = "Custom status created", body = ApiResponse<asset_status::Model>),
        (status = 400, description = "Invalid request or duplicate name", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "asset-statuses"
)]
pub async fn create_status(
    State(state): State<AppState>,
    ctx: OrgContext,
    AppJson(payload): AppJson<NamedEntityRequest>,
) -> ApiResult<asset_status::Model> {
    let status = state
        .services
        .asset_statuses
        .create_status(&ctx, payload)
        .await?;
    Ok(Json(ApiResponse::success(status)))
}

#[utoipa::path(
    get,
    path = "/api/v1/asset-status/get-by-org",
    responses(
        (status = 200, description = "Built-in and custom statuses", body = ApiResponse<Vec<asset_status::Model>>)
    ),
    security(("bearer_auth" = [])),
    tag = "asset-statuses"
)]
pub async fn list_statuses(
    State(state): State<AppState>,
    ctx: OrgContext,
) -> ApiResult<Vec<asset_status::Model>> {
    let statuses = state.services.asset_statuses.list_statuses(&ctx).await?;
    Ok(Json(ApiResponse::success(statuses)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/asset-status/delete",
    params(IdQuery),
    responses(
        (status = 200, description = "Custom status soft-deleted", body = ApiResponse<serde_json::Value>),
        (status = 400, description = "Built-in statuses cannot be deleted", body = crate::errors::ErrorResponse),
        (status = 404, description = "Status not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "asset-statuses"
)]
pub async fn delete_status(
    State(state): State<AppState>,
    ctx: OrgContext,
    AppQuery(query): AppQuery<IdQuery>,
) -> ApiResult<()> {
    state
        .services
        .asset_statuses
        .delete_status(&ctx, query.id)
        .await?;
    Ok(done("Asset status deleted"))
}

pub fn routes() -> Router<AppState> {
    let asset = |action| Page::Asset.role(action);
    let view = Router::new()
        .route("/asset/get-by-id", get(get_asset))
        .route("/asset/get-by-org", get(list_assets))
        .route("/asset/history", get(asset_history))
        .route("/asset/pending-requests", get(pending_requests))
        .with_role(&asset(Action::View));
    let create = Router::new()
        .route("/asset/create", post(create_asset))
        .layer(DefaultBodyLimit::max(upload_body_limit(4)))
        .with_role(&asset(Action::Create));
    let edit = Router::new()
        .route("/asset/update", put(update_asset))
        .layer(DefaultBodyLimit::max(upload_body_limit(4)))
        .with_role(&asset(Action::Edit));
    let transfer = Router::new()
        .route("/asset/transfer", post(transfer_asset))
        .with_role(&asset(Action::Transfer));
    let dispose = Router::new()
        .route("/asset/dispose", post(dispose_asset))
        .layer(DefaultBodyLimit::max(upload_body_limit(1)))
        .with_role(&asset(Action::Dispose));
    let approve = Router::new()
        .route("/asset/approve", post(approve_request))
        .route("/asset/reject", post(reject_request))
        .with_role(&asset(Action::Approve));
    let remove = Router::new()
        .route("/asset/delete", delete(delete_asset))
        .with_role(&asset(Action::Delete));

    let status = |action| Page::AssetStatus.role(action);
    let statuses = Router::new()
        .merge(
            Router::new()
                .route("/asset-status/get-by-org", get(list_statuses))
                .with_role(&status(Action::View)),
        )
        .merge(
            Router::new()
                .route("/asset-status/create", post(create_status))
                .with_role(&status(Action::Create)),
        )
        .merge(
            Router::new()
                .route("/asset-status/delete", delete(delete_status))
                .with_role(&status(Action::Delete)),
        );

    Router::new()
        .merge(view)
        .merge(create)
        .merge(edit)
        .merge(transfer)
        .merge(dispose)
        .merge(approve)
        .merge(remove)
        .merge(statuses)
}
