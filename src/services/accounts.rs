//! Registration, email verification, login and session history.

use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use hmac::{Hmac, Mac};
use rand::Rng;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use slog::Logger;
use tracing::instrument;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::{
        catalog::{ADMIN, SUPER_ADMIN},
        password::{hash_password, verify_password},
        AuthService, AuthUser, TokenPair, TokenSubject,
    },
    config::AppConfig,
    db::DbPool,
    entities::{email_verification, login_history, organization, user},
    errors::ServiceError,
    events::{Event, EventSender},
    middleware_helpers::ClientInfo,
    services::asset_statuses::ensure_seeded_statuses,
    tracing::{log_error, ErrorKind},
    services::email::EmailSender,
    services::roles::claims_of_user,
};

type HmacSha256 = Hmac<Sha256>;

const INVALID_CREDENTIALS: &str = "Invalid email or password";
const INVALID_CODE: &str = "Invalid or expired verification code";
const CODE_EXHAUSTED: &str = "Too many incorrect codes; request a new verification code";

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 200))]
    pub full_name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    #[validate(length(min = 1, max = 200))]
    pub organization_name: String,
    #[validate(length(max = 50))]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct SendVerificationCodeRequest {
    #[validate(email)]
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct EmailConfirmationRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(equal = 6))]
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct RefreshTokenRequest {
    #[validate(length(min = 1))]
    pub refresh_token: String,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct LoginHistoryQuery {
    /// Another user of the organization; defaults to the caller
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UserSummary {
    pub id: Uuid,
    pub organization_id: i32,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub email_confirmed: bool,
    pub is_org_admin: bool,
}

impl From<&user::Model> for UserSummary {
    fn from(user: &user::Model) -> Self {
        Self {
            id: user.id,
            organization_id: user.organization_id,
            full_name: user.full_name.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            email_confirmed: user.email_confirmed,
            is_org_admin: user.is_org_admin,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RegistrationResponse {
    pub user: UserSummary,
    pub verification_sent: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub tokens: TokenPair,
    pub user: UserSummary,
    pub roles: Vec<String>,
}

/// Account settings taken from [`AppConfig`].
#[derive(Debug, Clone)]
pub struct AccountSettings {
    pub super_admin_email: Option<String>,
    pub otp_ttl: ChronoDuration,
    pub otp_max_attempts: i32,
    /// Key for the HMAC digests of verification codes
    pub otp_secret: String,
}

impl From<&AppConfig> for AccountSettings {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            super_admin_email: cfg
                .super_admin_email
                .as_ref()
                .map(|e| e.trim().to_lowercase()),
            otp_ttl: ChronoDuration::minutes(cfg.otp_ttl_minutes),
            otp_max_attempts: cfg.otp_max_attempts,
            otp_secret: cfg.jwt_secret.clone(),
        }
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn generate_code() -> String {
    format!("{:06}", rand::thread_rng().gen_range(0..1_000_000))
}

fn code_mac(secret: &str, email: &str, code: &str) -> Result<HmacSha256, ServiceError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| ServiceError::InternalError(format!("otp key: {e}")))?;
    mac.update(email.as_bytes());
    mac.update(b":");
    mac.update(code.as_bytes());
    Ok(mac)
}

/// Hex HMAC-SHA256 of a verification code; the code itself is never stored.
fn digest_code(secret: &str, email: &str, code: &str) -> Result<String, ServiceError> {
    Ok(hex::encode(code_mac(secret, email, code)?.finalize().into_bytes()))
}

fn code_matches(secret: &str, email: &str, code: &str, stored: &str) -> bool {
    let Ok(expected) = hex::decode(stored) else {
        return false;
    };
    match code_mac(secret, email, code) {
        Ok(mac) => mac.verify_slice(&expected).is_ok(),
        Err(_) => false,
    }
}

/// `SuperAdmin` for the configured super-admin, `Admin` for organization owners,
/// plus the user's synchronized claims.
pub async fn role_claims_for<C: ConnectionTrait>(
    db: &C,
    user: &user::Model,
    super_admin_email: Option<&str>,
) -> Result<Vec<String>, ServiceError> {
    let mut roles = Vec::new();
    if super_admin_email.is_some_and(|admin| admin == user.email) {
        roles.push(SUPER_ADMIN.to_string());
    }
    if user.is_org_admin {
        roles.push(ADMIN.to_string());
    }
    for claim in claims_of_user(db, user.id).await? {
        if !roles.contains(&claim) {
            roles.push(claim);
        }
    }
    Ok(roles)
}

pub async fn find_user_by_email<C: ConnectionTrait>(
    db: &C,
    email: &str,
) -> Result<Option<user::Model>, ServiceError> {
    user::Entity::find()
        .filter(user::Column::Email.eq(normalize_email(email)))
        .one(db)
        .await
        .map_err(ServiceError::db_error)
}

#[derive(Clone)]
pub struct AccountService {
    db_pool: Arc<DbPool>,
    auth: Arc<AuthService>,
    email: Arc<dyn EmailSender>,
    event_sender: Arc<EventSender>,
    settings: AccountSettings,
    logger: Logger,
}

impl AccountService {
    pub fn new(
        db_pool: Arc<DbPool>,
        auth: Arc<AuthService>,
        email: Arc<dyn EmailSender>,
        event_sender: Arc<EventSender>,
        settings: AccountSettings,
        logger: Logger,
    ) -> Self {
        Self {
            db_pool,
            auth,
            email,
            event_sender,
            settings,
            logger,
        }
    }

    /// Creates an organization and its administrator, seeds the organization's
    /// asset statuses and emails a verification code.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn register(
        &self,
        request: RegisterRequest,
    ) -> Result<RegistrationResponse, ServiceError> {
        request.validate()?;
        let email = normalize_email(&request.email);
        let full_name = request.full_name.trim().to_string();
        let organization_name = request.organization_name.trim().to_string();
        if full_name.is_empty() || organization_name.is_empty() {
            return Err(ServiceError::ValidationError(
                "Full name and organization name are required".to_string(),
            ));
        }
        if find_user_by_email(self.db_pool.as_ref(), &email).await?.is_some() {
            return Err(ServiceError::ValidationError(format!(
                "Email '{}' is already registered",
                email
            )));
        }
        let password_hash = hash_password(&request.password)?;

        let txn = self.db_pool.begin().await.map_err(ServiceError::db_error)?;
        let org = organization::ActiveModel {
            name: Set(organization_name),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(ServiceError::db_error)?;

        let owner = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            organization_id: Set(org.id),
            full_name: Set(full_name),
            email: Set(email),
            phone: Set(request.phone.map(|p| p.trim().to_string()).filter(|p| !p.is_empty())),
            employee_code: Set(None),
            password_hash: Set(Some(password_hash)),
            email_confirmed: Set(false),
            login_enabled: Set(true),
            is_self_registered: Set(true),
            is_org_admin: Set(true),
            department_id: Set(None),
            sub_department_id: Set(None),
            designation_id: Set(None),
            site_id: Set(None),
            manage_user_role_id: Set(None),
            is_deleted: Set(false),
            created_by: Set(None),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(ServiceError::db_error)?;

        ensure_seeded_statuses(&txn, org.id, Some(owner.id)).await?;
        let code = self.issue_code(&txn, &owner).await?;
        txn.commit().await.map_err(ServiceError::db_error)?;

        slog::info!(self.logger, "organization registered"; "org" => org.id, "user_id" => %owner.id);
        self.event_sender
            .publish(Event::OrganizationRegistered {
                organization_id: org.id,
                user_id: owner.id,
            })
            .await;
        let verification_sent = self.send_code(&owner, &code).await;
        Ok(RegistrationResponse {
            user: UserSummary::from(&owner),
            verification_sent,
        })
    }

    /// Invalidates unused codes of the user and stores a fresh one.
    async fn issue_code<C: ConnectionTrait>(
        &self,
        db: &C,
        user: &user::Model,
    ) -> Result<String, ServiceError> {
        let now = Utc::now();
        email_verification::Entity::update_many()
            .col_expr(email_verification::Column::ConsumedAt, Expr::value(Some(now)))
            .filter(email_verification::Column::UserId.eq(user.id))
            .filter(email_verification::Column::ConsumedAt.is_null())
            .exec(db)
            .await
            .map_err(ServiceError::db_error)?;

        let code = generate_code();
        email_verification::ActiveModel {
            user_id: Set(user.id),
            email: Set(user.email.clone()),
            code: Set(digest_code(&self.settings.otp_secret, &user.email, &code)?),
            expires_at: Set(now + self.settings.otp_ttl),
            consumed_at: Set(None),
            failed_attempts: Set(0),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await
        .map_err(ServiceError::db_error)?;
        Ok(code)
    }

    async fn send_code(&self, user: &user::Model, code: &str) -> bool {
        let body = format!(
            "Hello {},\n\nYour SAMS verification code is {}. It expires in {} minutes.",
            user.full_name,
            code,
            self.settings.otp_ttl.num_minutes()
        );
        match self
            .email
            .send(&user.email, "Verify your email address", &body)
            .await
        {
            Ok(delivered) => delivered,
            Err(e) => {
                log_error(&e, ErrorKind::Email, "sending verification code");
                false
            }
        }
    }

    /// Counts a wrong entry against the code and retires the code once the
    /// attempts run out. Returns whether it was retired.
    async fn record_failed_attempt<C: ConnectionTrait>(
        &self,
        db: &C,
        verification_id: i32,
    ) -> Result<bool, ServiceError> {
        email_verification::Entity::update_many()
            .col_expr(
                email_verification::Column::FailedAttempts,
                Expr::col(email_verification::Column::FailedAttempts).add(1),
            )
            .filter(email_verification::Column::Id.eq(verification_id))
            .exec(db)
            .await
            .map_err(ServiceError::db_error)?;
        let retired = email_verification::Entity::update_many()
            .col_expr(email_verification::Column::ConsumedAt, Expr::value(Some(Utc::now())))
            .filter(email_verification::Column::Id.eq(verification_id))
            .filter(email_verification::Column::ConsumedAt.is_null())
            .filter(email_verification::Column::FailedAttempts.gte(self.settings.otp_max_attempts))
            .exec(db)
            .await
            .map_err(ServiceError::db_error)?;
        if retired.rows_affected > 0 {
            slog::warn!(self.logger, "verification code retired after failed attempts";
                "verification_id" => verification_id);
        }
        Ok(retired.rows_affected > 0)
    }

    /// Replaces any outstanding code with a new one and emails it.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn send_email_verification_code(
        &self,
        request: SendVerificationCodeRequest,
    ) -> Result<bool, ServiceError> {
        request.validate()?;
        let user = find_user_by_email(self.db_pool.as_ref(), &request.email)
            .await?
            .filter(|u| !u.is_deleted)
            .ok_or_else(|| ServiceError::NotFound("No account uses this email".to_string()))?;
        if user.email_confirmed {
            return Err(ServiceError::InvalidOperation(
                "Email is already confirmed".to_string(),
            ));
        }

        let txn = self.db_pool.begin().await.map_err(ServiceError::db_error)?;
        let code = self.issue_code(&txn, &user).await?;
        txn.commit().await.map_err(ServiceError::db_error)?;
        Ok(self.send_code(&user, &code).await)
    }

    /// Consumes the latest code and marks the email confirmed.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn confirm_email(
        &self,
        request: EmailConfirmationRequest,
    ) -> Result<UserSummary, ServiceError> {
        request.validate()?;
        let txn = self.db_pool.begin().await.map_err(ServiceError::db_error)?;
        let user = find_user_by_email(&txn, &request.email)
            .await?
            .filter(|u| !u.is_deleted)
            .ok_or_else(|| ServiceError::ValidationError(INVALID_CODE.to_string()))?;
        if user.email_confirmed {
            return Err(ServiceError::InvalidOperation(
                "Email is already confirmed".to_string(),
            ));
        }

        let latest = email_verification::Entity::find()
            .filter(email_verification::Column::UserId.eq(user.id))
            .filter(email_verification::Column::ConsumedAt.is_null())
            .order_by_desc(email_verification::Column::CreatedAt)
            .order_by_desc(email_verification::Column::Id)
            .one(&txn)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::ValidationError(INVALID_CODE.to_string()))?;

        let now = Utc::now();
        if !latest.is_usable(now) {
            return Err(ServiceError::ValidationError(INVALID_CODE.to_string()));
        }
        let code = request.code.trim();
        if !code_matches(&self.settings.otp_secret, &user.email, code, &latest.code) {
            let exhausted = self.record_failed_attempt(&txn, latest.id).await?;
            txn.commit().await.map_err(ServiceError::db_error)?;
            let message = if exhausted { CODE_EXHAUSTED } else { INVALID_CODE };
            return Err(ServiceError::ValidationError(message.to_string()));
        }

        let mut consumed: email_verification::ActiveModel = latest.into();
        consumed.consumed_at = Set(Some(now));
        consumed.update(&txn).await.map_err(ServiceError::db_error)?;

        let mut active: user::ActiveModel = user.into();
        active.email_confirmed = Set(true);
        let confirmed = active.update(&txn).await.map_err(ServiceError::db_error)?;
        txn.commit().await.map_err(ServiceError::db_error)?;

        self.event_sender
            .publish(Event::EmailConfirmed(confirmed.id))
            .await;
        Ok(UserSummary::from(&confirmed))
    }

    fn token_subject(user: &user::Model, roles: Vec<String>) -> TokenSubject {
        TokenSubject {
            user_id: user.id,
            email: user.email.clone(),
            name: user.full_name.clone(),
            organization_id: Some(user.organization_id),
            roles,
        }
    }

    /// Verifies credentials, issues tokens and records the session.
    #[instrument(skip(self, request, client), fields(email = %request.email))]
    pub async fn login(
        &self,
        request: LoginRequest,
        client: ClientInfo,
    ) -> Result<LoginResponse, ServiceError> {
        request.validate()?;
        let db = self.db_pool.as_ref();
        let invalid = || ServiceError::Unauthorized(INVALID_CREDENTIALS.to_string());

        let user = find_user_by_email(db, &request.email)
            .await?
            .ok_or_else(invalid)?;
        let Some(hash) = user.password_hash.as_deref().filter(|_| user.login_enabled) else {
            return Err(invalid());
        };
        if !verify_password(&request.password, hash)? {
            slog::warn!(self.logger, "login rejected"; "user_id" => %user.id);
            return Err(invalid());
        }
        if user.is_deleted {
            return Err(ServiceError::ValidationError(
                "This account has been deactivated".to_string(),
            ));
        }
        if !user.email_confirmed {
            return Err(ServiceError::ValidationError(
                "Email address has not been confirmed".to_string(),
            ));
        }

        let roles = role_claims_for(db, &user, self.settings.super_admin_email.as_deref()).await?;
        let tokens = self
            .auth
            .generate_token(&Self::token_subject(&user, roles.clone()))?;

        login_history::ActiveModel {
            user_id: Set(user.id),
            organization_id: Set(user.organization_id),
            token_id: Set(tokens.access_token_id.clone()),
            ip_address: Set(client.ip_address),
            user_agent: Set(client.user_agent),
            login_at: Set(Utc::now()),
            logout_at: Set(None),
            ..Default::default()
        }
        .insert(db)
        .await
        .map_err(ServiceError::db_error)?;

        slog::info!(self.logger, "user logged in"; "user_id" => %user.id, "org" => user.organization_id);
        self.event_sender
            .publish(Event::UserLoggedIn {
                organization_id: user.organization_id,
                user_id: user.id,
            })
            .await;
        Ok(LoginResponse {
            tokens,
            user: UserSummary::from(&user),
            roles,
        })
    }

    /// Revokes the presented access token and closes its login-history row.
    #[instrument(skip(self, principal), fields(user_id = %principal.user_id))]
    pub async fn logout(&self, principal: &AuthUser) -> Result<(), ServiceError> {
        self.auth.revoke(&principal.token_id, principal.expires_at);
        login_history::Entity::update_many()
            .col_expr(login_history::Column::LogoutAt, Expr::value(Some(Utc::now())))
            .filter(login_history::Column::TokenId.eq(principal.token_id.as_str()))
            .filter(login_history::Column::UserId.eq(principal.user_id))
            .filter(login_history::Column::LogoutAt.is_null())
            .exec(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?;

        slog::info!(self.logger, "user logged out"; "user_id" => %principal.user_id);
        self.event_sender
            .publish(Event::UserLoggedOut(principal.user_id))
            .await;
        Ok(())
    }

    /// Exchanges a refresh token for a new pair carrying the current claims.
    #[instrument(skip(self, request))]
    pub async fn refresh(&self, request: RefreshTokenRequest) -> Result<TokenPair, ServiceError> {
        request.validate()?;
        let claims = self.auth.validate_refresh_token(&request.refresh_token)?;
        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| ServiceError::Unauthorized("Invalid refresh token".to_string()))?;

        let db = self.db_pool.as_ref();
        let user = user::Entity::find_by_id(user_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .filter(|u| !u.is_deleted && u.login_enabled && u.email_confirmed)
            .ok_or_else(|| ServiceError::Unauthorized("Account is not active".to_string()))?;

        let roles = role_claims_for(db, &user, self.settings.super_admin_email.as_deref()).await?;
        self.auth.revoke(&claims.jti, claims.exp);
        Ok(self
            .auth
            .generate_token(&Self::token_subject(&user, roles))?)
    }

    /// Login history, newest first. Reading another user's history needs
    /// `can_view_others`.
    pub async fn login_history(
        &self,
        principal: &AuthUser,
        query: LoginHistoryQuery,
        can_view_others: bool,
    ) -> Result<Vec<login_history::Model>, ServiceError> {
        let db = self.db_pool.as_ref();
        let target = query.user_id.unwrap_or(principal.user_id);
        if target != principal.user_id {
            if !can_view_others {
                return Err(ServiceError::Forbidden(
                    "Viewing another user's login history requires UserProfile.View".to_string(),
                ));
            }
            let in_org = user::Entity::find_by_id(target)
                .filter(user::Column::OrganizationId.eq(principal.organization_id.unwrap_or(-1)))
                .one(db)
                .await
                .map_err(ServiceError::db_error)?;
            if in_org.is_none() {
                return Err(ServiceError::not_found("User", target));
            }
        }

        login_history::Entity::find()
            .filter(login_history::Column::UserId.eq(target))
            .order_by_desc(login_history::Column::LoginAt)
            .order_by_desc(login_history::Column::Id)
            .all(db)
            .await
            .map_err(ServiceError::db_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_six_digits() {
        for _ in 0..50 {
            let code = generate_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn code_digest_is_bound_to_email() {
        let secret = "a-secret-that-is-long-enough-for-tests";
        let stored = digest_code(secret, "a@acme.test", "123456").unwrap();
        assert_ne!(stored, "123456");
        assert!(code_matches(secret, "a@acme.test", "123456", &stored));
        assert!(!code_matches(secret, "a@acme.test", "654321", &stored));
        assert!(!code_matches(secret, "b@acme.test", "123456", &stored));
        assert!(!code_matches(secret, "a@acme.test", "123456", "not-hex"));
    }

    #[test]
    fn emails_are_normalized() {
        assert_eq!(normalize_email("  Owner@ACME.test "), "owner@acme.test");
    }
}
