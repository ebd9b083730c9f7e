use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use slog::Logger;
use tracing::instrument;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::password::{generate_password, hash_password, MAX_PASSWORD_LENGTH, MIN_PASSWORD_LENGTH},
    db::DbPool,
    entities::{department, designation, manage_user_role, site, sub_department, user},
    errors::ServiceError,
    events::{Event, EventSender},
    services::accounts::{find_user_by_email, normalize_email},
    services::context::OrgContext,
    services::email::EmailSender,
    services::reference::{normalize_optional, require_reference},
    services::roles::synchronize_user_claims,
    tracing::{log_error, ErrorKind},
};

const GENERATED_PASSWORD_LENGTH: usize = 12;

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateProfileRequest {
    #[validate(length(min = 1, max = 200))]
    pub full_name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(max = 50))]
    pub phone: Option<String>,
    #[validate(length(max = 50))]
    pub employee_code: Option<String>,
    pub department_id: Option<i32>,
    pub sub_department_id: Option<i32>,
    pub designation_id: Option<i32>,
    pub site_id: Option<i32>,
    pub manage_user_role_id: Option<i32>,
}

/// Absent fields keep their stored value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateProfileRequest {
    pub id: Uuid,
    #[validate(length(min = 1, max = 200))]
    pub full_name: Option<String>,
    #[validate(length(max = 50))]
    pub phone: Option<String>,
    #[validate(length(max = 50))]
    pub employee_code: Option<String>,
    pub department_id: Option<i32>,
    pub sub_department_id: Option<i32>,
    pub designation_id: Option<i32>,
    pub site_id: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProvisionLoginRequest {
    pub user_id: Uuid,
    /// Generated when omitted
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AssignRoleRequest {
    pub user_id: Uuid,
    /// `None` clears the role
    pub manage_user_role_id: Option<i32>,
}

#[derive(Debug, Clone, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct UserIdQuery {
    pub id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UserProfile {
    pub id: Uuid,
    pub organization_id: i32,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub employee_code: Option<String>,
    pub department_id: Option<i32>,
    pub sub_department_id: Option<i32>,
    pub designation_id: Option<i32>,
    pub site_id: Option<i32>,
    pub manage_user_role_id: Option<i32>,
    pub email_confirmed: bool,
    pub has_login_access: bool,
    pub is_self_registered: bool,
    pub is_org_admin: bool,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub modified_at: Option<DateTime<Utc>>,
}

impl From<user::Model> for UserProfile {
    fn from(user: user::Model) -> Self {
        Self {
            has_login_access: user.login_enabled && user.password_hash.is_some(),
            id: user.id,
            organization_id: user.organization_id,
            full_name: user.full_name,
            email: user.email,
            phone: user.phone,
            employee_code: user.employee_code,
            department_id: user.department_id,
            sub_department_id: user.sub_department_id,
            designation_id: user.designation_id,
            site_id: user.site_id,
            manage_user_role_id: user.manage_user_role_id,
            email_confirmed: user.email_confirmed,
            is_self_registered: user.is_self_registered,
            is_org_admin: user.is_org_admin,
            is_deleted: user.is_deleted,
            created_at: user.created_at,
            modified_at: user.modified_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProvisionedLogin {
    pub profile: UserProfile,
    pub credentials_emailed: bool,
}

/// Organization placement of a profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Placement {
    department_id: Option<i32>,
    sub_department_id: Option<i32>,
    designation_id: Option<i32>,
    site_id: Option<i32>,
}

impl Placement {
    async fn check<C: ConnectionTrait>(&self, db: &C, org: i32) -> Result<(), ServiceError> {
        let org = Some(org);
        if let Some(id) = self.department_id {
            require_reference::<department::Entity, _>(db, org, id).await?;
        }
        if let Some(id) = self.sub_department_id {
            let Some(department_id) = self.department_id else {
                return Err(ServiceError::ValidationError(
                    "A sub-department requires a department".to_string(),
                ));
            };
            let sub = require_reference::<sub_department::Entity, _>(db, org, id).await?;
            if sub.department_id != department_id {
                return Err(ServiceError::ValidationError(format!(
                    "Sub-department {} does not belong to department {}",
                    id, department_id
                )));
            }
        }
        if let Some(id) = self.designation_id {
            require_reference::<designation::Entity, _>(db, org, id).await?;
        }
        if let Some(id) = self.site_id {
            require_reference::<site::Entity, _>(db, org, id).await?;
        }
        Ok(())
    }
}

/// Employee profiles created by organization administrators.
#[derive(Clone)]
pub struct ProfileService {
    db_pool: Arc<DbPool>,
    email: Arc<dyn EmailSender>,
    event_sender: Arc<EventSender>,
    logger: Logger,
}

impl ProfileService {
    pub fn new(
        db_pool: Arc<DbPool>,
        email: Arc<dyn EmailSender>,
        event_sender: Arc<EventSender>,
        logger: Logger,
    ) -> Self {
        Self {
            db_pool,
            email,
            event_sender,
            logger,
        }
    }

    async fn find_profile<C: ConnectionTrait>(
        db: &C,
        ctx: &OrgContext,
        id: Uuid,
        include_deleted: bool,
    ) -> Result<user::Model, ServiceError> {
        let mut query = user::Entity::find_by_id(id)
            .filter(user::Column::OrganizationId.eq(ctx.organization_id));
        if !include_deleted {
            query = query.filter(user::Column::IsDeleted.eq(false));
        }
        query
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::not_found("User profile", id))
    }

    #[instrument(skip(self, request), fields(org = ctx.organization_id))]
    pub async fn create_profile(
        &self,
        ctx: &OrgContext,
        request: CreateProfileRequest,
    ) -> Result<UserProfile, ServiceError> {
        request.validate()?;
        let full_name = request.full_name.trim().to_string();
        if full_name.is_empty() {
            return Err(ServiceError::ValidationError("Full name is required".to_string()));
        }
        let email = normalize_email(&request.email);

        let txn = self.db_pool.begin().await.map_err(ServiceError::db_error)?;
        if find_user_by_email(&txn, &email).await?.is_some() {
            return Err(ServiceError::ValidationError(format!(
                "Email '{}' is already registered",
                email
            )));
        }
        let placement = Placement {
            department_id: request.department_id,
            sub_department_id: request.sub_department_id,
            designation_id: request.designation_id,
            site_id: request.site_id,
        };
        placement.check(&txn, ctx.organization_id).await?;
        if let Some(role_id) = request.manage_user_role_id {
            require_reference::<manage_user_role::Entity, _>(
                &txn,
                Some(ctx.organization_id),
                role_id,
            )
            .await?;
        }

        let profile = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            organization_id: Set(ctx.organization_id),
            full_name: Set(full_name),
            email: Set(email),
            phone: Set(normalize_optional(request.phone)),
            employee_code: Set(normalize_optional(request.employee_code)),
            password_hash: Set(None),
            email_confirmed: Set(false),
            login_enabled: Set(false),
            is_self_registered: Set(false),
            is_org_admin: Set(false),
            department_id: Set(placement.department_id),
            sub_department_id: Set(placement.sub_department_id),
            designation_id: Set(placement.designation_id),
            site_id: Set(placement.site_id),
            manage_user_role_id: Set(request.manage_user_role_id),
            is_deleted: Set(false),
            created_by: Set(Some(ctx.user_id)),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(ServiceError::db_error)?;
        synchronize_user_claims(&txn, profile.id, profile.manage_user_role_id).await?;
        txn.commit().await.map_err(ServiceError::db_error)?;

        slog::info!(self.logger, "user profile created"; "user_id" => %profile.id, "org" => ctx.organization_id);
        Ok(profile.into())
    }

    #[instrument(skip(self, request), fields(org = ctx.organization_id, user_id = %request.id))]
    pub async fn update_profile(
        &self,
        ctx: &OrgContext,
        request: UpdateProfileRequest,
    ) -> Result<UserProfile, ServiceError> {
        request.validate()?;
        let db = self.db_pool.as_ref();
        let existing = Self::find_profile(db, ctx, request.id, false).await?;

        let department_changed = request.department_id.is_some()
            && request.department_id != existing.department_id;
        let placement = Placement {
            department_id: request.department_id.or(existing.department_id),
            sub_department_id: match request.sub_department_id {
                Some(id) => Some(id),
                None if department_changed => None,
                None => existing.sub_department_id,
            },
            designation_id: request.designation_id.or(existing.designation_id),
            site_id: request.site_id.or(existing.site_id),
        };
        placement.check(db, ctx.organization_id).await?;

        let mut active: user::ActiveModel = existing.into();
        if let Some(full_name) = request.full_name {
            let full_name = full_name.trim().to_string();
            if full_name.is_empty() {
                return Err(ServiceError::ValidationError("Full name is required".to_string()));
            }
            active.full_name = Set(full_name);
        }
        if let Some(phone) = request.phone {
            active.phone = Set(normalize_optional(Some(phone)));
        }
        if let Some(code) = request.employee_code {
            active.employee_code = Set(normalize_optional(Some(code)));
        }
        active.department_id = Set(placement.department_id);
        active.sub_department_id = Set(placement.sub_department_id);
        active.designation_id = Set(placement.designation_id);
        active.site_id = Set(placement.site_id);
        active.modified_by = Set(Some(ctx.user_id));

        let updated = active.update(db).await.map_err(ServiceError::db_error)?;
        Ok(updated.into())
    }

    /// Soft-deleted profiles are still returned.
    pub async fn get_profile(&self, ctx: &OrgContext, id: Uuid) -> Result<UserProfile, ServiceError> {
        Self::find_profile(self.db_pool.as_ref(), ctx, id, true)
            .await
            .map(UserProfile::from)
    }

    pub async fn list_profiles(&self, ctx: &OrgContext) -> Result<Vec<UserProfile>, ServiceError> {
        let users = user::Entity::find()
            .filter(user::Column::OrganizationId.eq(ctx.organization_id))
            .filter(user::Column::IsDeleted.eq(false))
            .order_by_asc(user::Column::FullName)
            .all(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?;
        Ok(users.into_iter().map(UserProfile::from).collect())
    }

    /// Soft-deletes the profile, removing its login access and claims.
    #[instrument(skip(self), fields(org = ctx.organization_id))]
    pub async fn delete_profile(&self, ctx: &OrgContext, id: Uuid) -> Result<(), ServiceError> {
        if id == ctx.user_id {
            return Err(ServiceError::InvalidOperation(
                "You cannot delete your own profile".to_string(),
            ));
        }
        let txn = self.db_pool.begin().await.map_err(ServiceError::db_error)?;
        let existing = Self::find_profile(&txn, ctx, id, false).await?;
        if existing.is_org_admin {
            return Err(ServiceError::InvalidOperation(
                "The organization administrator cannot be deleted".to_string(),
            ));
        }

        let mut active: user::ActiveModel = existing.into();
        active.is_deleted = Set(true);
        active.login_enabled = Set(false);
        active.password_hash = Set(None);
        active.manage_user_role_id = Set(None);
        active.modified_by = Set(Some(ctx.user_id));
        active.update(&txn).await.map_err(ServiceError::db_error)?;
        synchronize_user_claims(&txn, id, None).await?;
        txn.commit().await.map_err(ServiceError::db_error)?;

        slog::info!(self.logger, "user profile deleted"; "user_id" => %id, "org" => ctx.organization_id);
        Ok(())
    }

    /// Gives an administrator-created profile a password and emails it.
    #[instrument(skip(self, request), fields(org = ctx.organization_id, user_id = %request.user_id))]
    pub async fn provision_login(
        &self,
        ctx: &OrgContext,
        request: ProvisionLoginRequest,
    ) -> Result<ProvisionedLogin, ServiceError> {
        let db = self.db_pool.as_ref();
        let existing = Self::find_profile(db, ctx, request.user_id, false).await?;
        if existing.is_self_registered {
            return Err(ServiceError::InvalidOperation(
                "Self-registered users already have login access".to_string(),
            ));
        }
        if existing.login_enabled && existing.password_hash.is_some() {
            return Err(ServiceError::InvalidOperation(
                "This profile already has login access".to_string(),
            ));
        }

        let password = match request.password {
            Some(password) => {
                let length = password.chars().count();
                if !(MIN_PASSWORD_LENGTH..=MAX_PASSWORD_LENGTH).contains(&length) {
                    return Err(ServiceError::ValidationError(format!(
                        "Password must be between {} and {} characters",
                        MIN_PASSWORD_LENGTH, MAX_PASSWORD_LENGTH
                    )));
                }
                password
            }
            None => generate_password(GENERATED_PASSWORD_LENGTH),
        };

        let mut active: user::ActiveModel = existing.into();
        active.password_hash = Set(Some(hash_password(&password)?));
        active.login_enabled = Set(true);
        active.email_confirmed = Set(true);
        active.modified_by = Set(Some(ctx.user_id));
        let updated = active.update(db).await.map_err(ServiceError::db_error)?;

        let body = format!(
            "Hello {},\n\nA SAMS account has been created for you.\nEmail: {}\nPassword: {}\n\nPlease change your password after signing in.",
            updated.full_name, updated.email, password
        );
        let credentials_emailed = match self
            .email
            .send(&updated.email, "Your SAMS login", &body)
            .await
        {
            Ok(delivered) => delivered,
            Err(e) => {
                log_error(&e, ErrorKind::Email, "sending provisioned credentials");
                false
            }
        };

        self.event_sender
            .publish(Event::LoginProvisioned(updated.id))
            .await;
        Ok(ProvisionedLogin {
            profile: updated.into(),
            credentials_emailed,
        })
    }

    /// Sets or clears the profile's management role and recomputes its claims.
    #[instrument(skip(self, request), fields(org = ctx.organization_id, user_id = %request.user_id))]
    pub async fn assign_role(
        &self,
        ctx: &OrgContext,
        request: AssignRoleRequest,
    ) -> Result<UserProfile, ServiceError> {
        let txn = self.db_pool.begin().await.map_err(ServiceError::db_error)?;
        let existing = Self::find_profile(&txn, ctx, request.user_id, false).await?;
        if let Some(role_id) = request.manage_user_role_id {
            require_reference::<manage_user_role::Entity, _>(
                &txn,
                Some(ctx.organization_id),
                role_id,
            )
            .await?;
        }

        let mut active: user::ActiveModel = existing.into();
        active.manage_user_role_id = Set(request.manage_user_role_id);
        active.modified_by = Set(Some(ctx.user_id));
        let updated = active.update(&txn).await.map_err(ServiceError::db_error)?;
        let claims = synchronize_user_claims(&txn, updated.id, updated.manage_user_role_id).await?;
        txn.commit().await.map_err(ServiceError::db_error)?;

        slog::debug!(self.logger, "role assigned"; "user_id" => %updated.id, "claims" => claims);
        self.event_sender
            .publish(Event::UserClaimsSynchronized {
                organization_id: ctx.organization_id,
                users: 1,
            })
            .await;
        Ok(updated.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> user::Model {
        user::Model {
            id: Uuid::new_v4(),
            organization_id: 1,
            full_name: "Field Tech".into(),
            email: "tech@acme.test".into(),
            phone: None,
            employee_code: Some("E-7".into()),
            password_hash: None,
            email_confirmed: false,
            login_enabled: false,
            is_self_registered: false,
            is_org_admin: false,
            department_id: Some(2),
            sub_department_id: None,
            designation_id: None,
            site_id: None,
            manage_user_role_id: None,
            is_deleted: false,
            created_by: None,
            created_at: Utc::now(),
            modified_by: None,
            modified_at: None,
        }
    }

    #[test]
    fn profile_without_password_has_no_login_access() {
        let profile = UserProfile::from(model());
        assert!(!profile.has_login_access);
        assert_eq!(profile.employee_code.as_deref(), Some("E-7"));
    }

    #[test]
    fn login_access_needs_both_flag_and_password() {
        let mut user = model();
        user.password_hash = Some("$argon2id$stub".into());
        assert!(!UserProfile::from(user.clone()).has_login_access);
        user.login_enabled = true;
        assert!(UserProfile::from(user).has_login_access);
    }

    #[test]
    fn profile_view_never_serializes_a_password() {
        let mut user = model();
        user.password_hash = Some("$argon2id$stub".into());
        let json = serde_json::to_string(&UserProfile::from(user)).unwrap();
        assert!(!json.contains("argon2"));
    }
}
