use axum::{
    extract::State,
    response::Json,
    routing::{delete, get, post, put},
    Router,
};

use crate::{
    auth::{
        catalog::{Action, Page},
        AuthRouterExt,
    },
    entities::identity_role,
    handlers::common::{done, AppJson, AppQuery},
    services::context::OrgContext,
    services::reference::IdQuery,
    services::roles::{CreateRoleRequest, RoleWithDetails, RolesForUserQuery, UpdateRoleRequest},
    ApiResponse, ApiResult, AppState,
};

#[utoipa::path(
    post,
    path = "/api/v1/manage-user-roles/create",
    request_body = CreateRoleRequest,
    responses(
        (status = 200, description = "Role and its permissions created", body = ApiResponse<RoleWithDetails>),
        (status = 400, description = "Duplicate name or invalid permission", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "roles"
)]
pub async fn create_role(
    State(state): State<AppState>,
    ctx: OrgContext,
    AppJson(payload): AppJson<CreateRoleRequest>,
) -> ApiResult<RoleWithDetails> {
    let role = state.services.roles.create_role(&ctx, payload).await?;
    Ok(Json(ApiResponse::success(role)))
}

#[utoipa::path(
    put,
    path = "/api/v1/manage-user-roles/update",
    request_body = UpdateRoleRequest,
    responses(
        (status = 200, description = "Role updated and holders' claims recomputed", body = ApiResponse<RoleWithDetails>),
        (status = 400, description = "Duplicate name or invalid permission", body = crate::errors::ErrorResponse),
        (status = 404, description = "Role not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "roles"
)]
pub async fn update_role(
    State(state): State<AppState>,
    ctx: OrgContext,
    AppJson(payload): AppJson<UpdateRoleRequest>,
) -> ApiResult<RoleWithDetails> {
    let role = state.services.roles.update_role(&ctx, payload).await?;
    Ok(Json(ApiResponse::success(role)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/manage-user-roles/delete",
    params(IdQuery),
    responses(
        (status = 200, description = "Role deleted and holders' claims cleared", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Role not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "roles"
)]
pub async fn delete_role(
    State(state): State<AppState>,
    ctx: OrgContext,
    AppQuery(query): AppQuery<IdQuery>,
) -> ApiResult<()> {
    state.services.roles.delete_role(&ctx, query.id).await?;
    Ok(done("Role deleted"))
}

#[utoipa::path(
    get,
    path = "/api/v1/manage-user-roles/get-by-id",
    params(IdQuery),
    responses(
        (status = 200, description = "Role with its permissions", body = ApiResponse<RoleWithDetails>),
        (status = 404, description = "Role not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "roles"
)]
pub async fn get_role(
    State(state): State<AppState>,
    ctx: OrgContext,
    AppQuery(query): AppQuery<IdQuery>,
) -> ApiResult<RoleWithDetails> {
    let role = state.services.roles.get_role(&ctx, query.id).await?;
    Ok(Json(ApiResponse::success(role)))
}

#[utoipa::path(
    get,
    path = "/api/v1/manage-user-roles/get-all",
    responses(
        (status = 200, description = "Roles of the organization; every organization for SuperAdmin", body = ApiResponse<Vec<RoleWithDetails>>)
    ),
    security(("bearer_auth" = [])),
    tag = "roles"
)]
pub async fn list_roles(
    State(state): State<AppState>,
    ctx: OrgContext,
) -> ApiResult<Vec<RoleWithDetails>> {
    let roles = state.services.roles.list_roles(&ctx).await?;
    Ok(Json(ApiResponse::success(roles)))
}

#[utoipa::path(
    get,
    path = "/api/v1/manage-user-roles/get-for-user",
    params(RolesForUserQuery),
    responses(
        (status = 200, description = "Roles created by the user", body = ApiResponse<Vec<RoleWithDetails>>),
        (status = 404, description = "User not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "roles"
)]
pub async fn roles_for_user(
    State(state): State<AppState>,
    ctx: OrgContext,
    AppQuery(query): AppQuery<RolesForUserQuery>,
) -> ApiResult<Vec<RoleWithDetails>> {
    let roles = state
        .services
        .roles
        .roles_for_user(&ctx, &query.email)
        .await?;
    Ok(Json(ApiResponse::success(roles)))
}

#[utoipa::path(
    get,
    path = "/api/v1/manage-user-roles/identity-roles",
    responses(
        (status = 200, description = "The fixed application role catalogue", body = ApiResponse<Vec<identity_role::Model>>)
    ),
    security(("bearer_auth" = [])),
    tag = "roles"
)]
pub async fn list_identity_roles(
    State(state): State<AppState>,
) -> ApiResult<Vec<identity_role::Model>> {
    let roles = state.services.roles.list_identity_roles().await?;
    Ok(Json(ApiResponse::success(roles)))
}

pub fn routes() -> Router<AppState> {
    let role = |action| Page::Role.role(action);
    let view = Router::new()
        .route("/manage-user-roles/get-by-id", get(get_role))
        .route("/manage-user-roles/get-all", get(list_roles))
        .route("/manage-user-roles/get-for-user", get(roles_for_user))
        .route("/manage-user-roles/identity-roles", get(list_identity_roles))
        .with_role(&role(Action::View));
    let create = Router::new()
        .route("/manage-user-roles/create", post(create_role))
        .with_role(&role(Action::Create));
    let edit = Router::new()
        .route("/manage-user-roles/update", put(update_role))
        .with_role(&role(Action::Edit));
    let remove = Router::new()
        .route("/manage-user-roles/delete", delete(delete_role))
        .with_role(&role(Action::Delete));

    Router::new()
        .merge(view)
        .merge(create)
        .merge(edit)
        .merge(remove)
}
