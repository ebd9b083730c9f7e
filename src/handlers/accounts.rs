use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};

use crate::{
    auth::{
        catalog::{Action, Page},
        AuthRouterExt, AuthUser, TokenPair,
    },
    entities::login_history,
    handlers::common::{done, AppJson, AppQuery},
    middleware_helpers::ClientInfo,
    services::accounts::{
        EmailConfirmationRequest, LoginHistoryQuery, LoginRequest, LoginResponse,
        RefreshTokenRequest, RegisterRequest, RegistrationResponse, SendVerificationCodeRequest,
        UserSummary,
    },
    ApiResponse, ApiResult, AppState,
};

#[utoipa::path(
    post,
    path = "/api/v1/account/register",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Organization and administrator created", body = ApiResponse<RegistrationResponse>),
        (status = 400, description = "Invalid request or email taken", body = crate::errors::ErrorResponse)
    ),
    tag = "account"
)]
pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> ApiResult<RegistrationResponse> {
    let registration = state.services.accounts.register(payload).await?;
    Ok(Json(ApiResponse::success(registration)))
}

#[utoipa::path(
    post,
    path = "/api/v1/account/send-email-verification-code",
    request_body = SendVerificationCodeRequest,
    responses(
        (status = 200, description = "Whether the code was delivered", body = ApiResponse<bool>),
        (status = 400, description = "Email already confirmed", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown email", body = crate::errors::ErrorResponse)
    ),
    tag = "account"
)]
pub async fn send_email_verification_code(
    State(state): State<AppState>,
    AppJson(payload): AppJson<SendVerificationCodeRequest>,
) -> ApiResult<bool> {
    let sent = state
        .services
        .accounts
        .send_email_verification_code(payload)
        .await?;
    Ok(Json(ApiResponse::success(sent)))
}

#[utoipa::path(
    post,
    path = "/api/v1/account/email-confirmation",
    request_body = EmailConfirmationRequest,
    responses(
        (status = 200, description = "Email confirmed", body = ApiResponse<UserSummary>),
        (status = 400, description = "Invalid or expired code", body = crate::errors::ErrorResponse)
    ),
    tag = "account"
)]
pub async fn email_confirmation(
    State(state): State<AppState>,
    AppJson(payload): AppJson<EmailConfirmationRequest>,
) -> ApiResult<UserSummary> {
    let user = state.services.accounts.confirm_email(payload).await?;
    Ok(Json(ApiResponse::success(user)))
}

#[utoipa::path(
    post,
    path = "/api/v1/account/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token pair, profile and role claims", body = ApiResponse<LoginResponse>),
        (status = 400, description = "Email not confirmed or account deactivated", body = crate::errors::ErrorResponse),
        (status = 401, description = "Invalid email or password", body = crate::errors::ErrorResponse)
    ),
    tag = "account"
)]
pub async fn login(
    State(state): State<AppState>,
    client: ClientInfo,
    AppJson(payload): AppJson<LoginRequest>,
) -> ApiResult<LoginResponse> {
    let session = state.services.accounts.login(payload, client).await?;
    Ok(Json(ApiResponse::success(session)))
}

#[utoipa::path(
    post,
    path = "/api/v1/account/refresh-token",
    request_body = RefreshTokenRequest,
    responses(
        (status = 200, description = "New token pair", body = ApiResponse<TokenPair>),
        (status = 401, description = "Invalid, expired or revoked refresh token", body = crate::errors::ErrorResponse)
    ),
    tag = "account"
)]
pub async fn refresh_token(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RefreshTokenRequest>,
) -> ApiResult<TokenPair> {
    let tokens = state.services.accounts.refresh(payload).await?;
    Ok(Json(ApiResponse::success(tokens)))
}

#[utoipa::path(
    post,
    path = "/api/v1/account/logout",
    responses(
        (status = 200, description = "Access token revoked", body = ApiResponse<serde_json::Value>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "account"
)]
pub async fn logout(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<()> {
    state.services.accounts.logout(&user).await?;
    Ok(done("Logged out"))
}

#[utoipa::path(
    get,
    path = "/api/v1/account/login-history",
    params(LoginHistoryQuery),
    responses(
        (status = 200, description = "Sessions, newest first", body = ApiResponse<Vec<login_history::Model>>),
        (status = 403, description = "Not allowed to view another user's history", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "account"
)]
pub async fn login_history(
    State(state): State<AppState>,
    user: AuthUser,
    AppQuery(query): AppQuery<LoginHistoryQuery>,
) -> ApiResult<Vec<login_history::Model>> {
    let can_view_others = user.satisfies(&Page::UserProfile.role(Action::View));
    let history = state
        .services
        .accounts
        .login_history(&user, query, can_view_others)
        .await?;
    Ok(Json(ApiResponse::success(history)))
}

pub fn routes() -> Router<AppState> {
    let public = Router::new()
        .route("/account/register", post(register))
        .route("/account/login", post(login))
        .route("/account/refresh-token", post(refresh_token))
        .route(
            "/account/send-email-verification-code",
            post(send_email_verification_code),
        )
        .route("/account/email-confirmation", post(email_confirmation));
    let authenticated = Router::new()
        .route("/account/logout", post(logout))
        .route("/account/login-history", get(login_history))
        .with_auth();

    public.merge(authenticated)
}
