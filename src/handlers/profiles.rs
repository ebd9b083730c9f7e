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
    handlers::common::{done, AppJson, AppQuery},
    services::context::OrgContext,
    services::profiles::{
        AssignRoleRequest, CreateProfileRequest, ProvisionLoginRequest, ProvisionedLogin,
        UpdateProfileRequest, UserIdQuery, UserProfile,
    },
    ApiResponse, ApiResult, AppState,
};

#[utoipa::path(
    post,
    path = "/api/v1/user-profile/create",
    request_body = CreateProfileRequest,
    responses(
        (status = 200, description = "Profile created without login access", body = ApiResponse<UserProfile>),
        (status = 400, description = "Invalid request, reference or email taken", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "user-profiles"
)]
pub async fn create_profile(
    State(state): State<AppState>,
    ctx: OrgContext,
    AppJson(payload): AppJson<CreateProfileRequest>,
) -> ApiResult<UserProfile> {
    let profile = state.services.profiles.create_profile(&ctx, payload).await?;
    Ok(Json(ApiResponse::success(profile)))
}

#[utoipa::path(
    put,
    path = "/api/v1/user-profile/update",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = ApiResponse<UserProfile>),
        (status = 404, description = "Profile not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "user-profiles"
)]
pub async fn update_profile(
    State(state): State<AppState>,
    ctx: OrgContext,
    AppJson(payload): AppJson<UpdateProfileRequest>,
) -> ApiResult<UserProfile> {
    let profile = state.services.profiles.update_profile(&ctx, payload).await?;
    Ok(Json(ApiResponse::success(profile)))
}

#[utoipa::path(
    get,
    path = "/api/v1/user-profile/get-by-id",
    params(UserIdQuery),
    responses(
        (status = 200, description = "Profile, including a deleted one", body = ApiResponse<UserProfile>),
        (status = 404, description = "Profile not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "user-profiles"
)]
pub async fn get_profile(
    State(state): State<AppState>,
    ctx: OrgContext,
    AppQuery(query): AppQuery<UserIdQuery>,
) -> ApiResult<UserProfile> {
    let profile = state.services.profiles.get_profile(&ctx, query.id).await?;
    Ok(Json(ApiResponse::success(profile)))
}

#[utoipa::path(
    get,
    path = "/api/v1/user-profile/get-by-org",
    responses(
        (status = 200, description = "Non-deleted profiles by name", body = ApiResponse<Vec<UserProfile>>)
    ),
    security(("bearer_auth" = [])),
    tag = "user-profiles"
)]
pub async fn list_profiles(
    State(state): State<AppState>,
    ctx: OrgContext,
) -> ApiResult<Vec<UserProfile>> {
    let profiles = state.services.profiles.list_profiles(&ctx).await?;
    Ok(Json(ApiResponse::success(profiles)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/user-profile/delete",
    params(UserIdQuery),
    responses(
        (status = 200, description = "Profile deactivated", body = ApiResponse<serde_json::Value>),
        (status = 400, description = "Own profile or organization administrator", body = crate::errors::ErrorResponse),
        (status = 404, description = "Profile not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "user-profiles"
)]
pub async fn delete_profile(
    State(state): State<AppState>,
    ctx: OrgContext,
    AppQuery(query): AppQuery<UserIdQuery>,
) -> ApiResult<()> {
    state.services.profiles.delete_profile(&ctx, query.id).await?;
    Ok(done("User profile deleted"))
}

#[utoipa::path(
    post,
    path = "/api/v1/user-profile/provision-login",
    request_body = ProvisionLoginRequest,
    responses(
        (status = 200, description = "Login enabled and credentials emailed", body = ApiResponse<ProvisionedLogin>),
        (status = 400, description = "Profile already has login access", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "user-profiles"
)]
pub async fn provision_login(
    State(state): State<AppState>,
    ctx: OrgContext,
    AppJson(payload): AppJson<ProvisionLoginRequest>,
) -> ApiResult<ProvisionedLogin> {
    let provisioned = state
        .services
        .profiles
        .provision_login(&ctx, payload)
        .await?;
    Ok(Json(ApiResponse::success(provisioned)))
}

#[utoipa::path(
    post,
    path = "/api/v1/user-profile/assign-role",
    request_body = AssignRoleRequest,
    responses(
        (status = 200, description = "Role set and claims synchronized", body = ApiResponse<UserProfile>),
        (status = 400, description = "Unknown role", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "user-profiles"
)]
pub async fn assign_role(
    State(state): State<AppState>,
    ctx: OrgContext,
    AppJson(payload): AppJson<AssignRoleRequest>,
) -> ApiResult<UserProfile> {
    let profile = state.services.profiles.assign_role(&ctx, payload).await?;
    Ok(Json(ApiResponse::success(profile)))
}

pub fn routes() -> Router<AppState> {
    let profile = |action| Page::UserProfile.role(action);
    let view = Router::new()
        .route("/user-profile/get-by-id", get(get_profile))
        .route("/user-profile/get-by-org", get(list_profiles))
        .with_role(&profile(Action::View));
    let create = Router::new()
        .route("/user-profile/create", post(create_profile))
        .with_role(&profile(Action::Create));
    let edit = Router::new()
        .route("/user-profile/update", put(update_profile))
        .route("/user-profile/provision-login", post(provision_login))
        .route("/user-profile/assign-role", post(assign_role))
        .with_role(&profile(Action::Edit));
    let remove = Router::new()
        .route("/user-profile/delete", delete(delete_profile))
        .with_role(&profile(Action::Delete));

    Router::new()
        .merge(view)
        .merge(create)
        .merge(edit)
        .merge(remove)
}
