//! Organization roles and their permission matrix.
//!
//! A management role owns detail rows granting identity roles. Authorization
//! does not read the matrix; it reads the role claims in `user_identity_roles`,
//! which are recomputed here whenever a role or a user's role assignment changes.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use slog::Logger;
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::catalog::{is_administrative, APPLICATION_ROLES},
    db::DbPool,
    entities::{identity_role, manage_user_role, manage_user_role_detail, user, user_identity_role},
    errors::ServiceError,
    events::{Event, EventSender},
    services::context::OrgContext,
    services::reference::{ensure_name_available, normalize_name, normalize_optional},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RoleDetailRequest {
    pub identity_role_id: i32,
    #[serde(default = "default_allowed")]
    pub is_allowed: bool,
}

fn default_allowed() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateRoleRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    #[serde(default)]
    pub details: Vec<RoleDetailRequest>,
}

/// Replaces the role's complete permission set.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateRoleRequest {
    pub id: i32,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    #[serde(default)]
    pub details: Vec<RoleDetailRequest>,
}

#[derive(Debug, Clone, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct RolesForUserQuery {
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RoleDetailView {
    pub id: i32,
    pub identity_role_id: i32,
    pub identity_role_name: String,
    pub is_allowed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RoleWithDetails {
    pub id: i32,
    pub organization_id: i32,
    pub name: String,
    pub description: Option<String>,
    pub is_deleted: bool,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub modified_at: Option<DateTime<Utc>>,
    pub details: Vec<RoleDetailView>,
}

/// Inserts the catalogue roles missing from `identity_roles`. Returns how many
/// were created.
pub async fn generate_roles_from_fixed_list<C: ConnectionTrait>(
    db: &C,
) -> Result<usize, ServiceError> {
    let existing: HashSet<String> = identity_role::Entity::find()
        .all(db)
        .await
        .map_err(ServiceError::db_error)?
        .into_iter()
        .map(|r| r.name)
        .collect();

    let mut created = 0;
    for name in APPLICATION_ROLES.iter().filter(|n| !existing.contains(*n)) {
        identity_role::ActiveModel {
            name: Set(name.clone()),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await
        .map_err(ServiceError::db_error)?;
        created += 1;
    }
    if created > 0 {
        info!(created, "seeded application roles");
    }
    Ok(created)
}

/// Identity role id by name.
pub async fn identity_role_id<C: ConnectionTrait>(
    db: &C,
    name: &str,
) -> Result<Option<i32>, ServiceError> {
    Ok(identity_role::Entity::find()
        .filter(identity_role::Column::Name.eq(name))
        .one(db)
        .await
        .map_err(ServiceError::db_error)?
        .map(|r| r.id))
}

/// Role claim names stored for a user.
pub async fn claims_of_user<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
) -> Result<Vec<String>, ServiceError> {
    let rows = user_identity_role::Entity::find()
        .filter(user_identity_role::Column::UserId.eq(user_id))
        .find_also_related(identity_role::Entity)
        .all(db)
        .await
        .map_err(ServiceError::db_error)?;
    let mut names: Vec<String> = rows
        .into_iter()
        .filter_map(|(_, role)| role.map(|r| r.name))
        .collect();
    names.sort();
    names.dedup();
    Ok(names)
}

/// Rewrites the user's claims from the allowed details of `manage_user_role_id`.
/// A deleted or absent role leaves the user with no claims.
pub async fn synchronize_user_claims<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
    manage_user_role_id: Option<i32>,
) -> Result<usize, ServiceError> {
    user_identity_role::Entity::delete_many()
        .filter(user_identity_role::Column::UserId.eq(user_id))
        .exec(db)
        .await
        .map_err(ServiceError::db_error)?;

    let Some(role_id) = manage_user_role_id else {
        return Ok(0);
    };
    let role = manage_user_role::Entity::find_by_id(role_id)
        .filter(manage_user_role::Column::IsDeleted.eq(false))
        .one(db)
        .await
        .map_err(ServiceError::db_error)?;
    if role.is_none() {
        return Ok(0);
    }

    let granted: HashSet<i32> = manage_user_role_detail::Entity::find()
        .filter(manage_user_role_detail::Column::ManageUserRoleId.eq(role_id))
        .filter(manage_user_role_detail::Column::IsAllowed.eq(true))
        .all(db)
        .await
        .map_err(ServiceError::db_error)?
        .into_iter()
        .map(|d| d.identity_role_id)
        .collect();

    let now = Utc::now();
    for identity_role_id in &granted {
        user_identity_role::ActiveModel {
            user_id: Set(user_id),
            identity_role_id: Set(*identity_role_id),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await
        .map_err(ServiceError::db_error)?;
    }
    Ok(granted.len())
}

/// Recomputes the claims of every non-deleted user holding the role.
async fn synchronize_role_holders<C: ConnectionTrait>(
    db: &C,
    role_id: i32,
) -> Result<usize, ServiceError> {
    let holders = user::Entity::find()
        .filter(user::Column::ManageUserRoleId.eq(role_id))
        .filter(user::Column::IsDeleted.eq(false))
        .all(db)
        .await
        .map_err(ServiceError::db_error)?;
    for holder in &holders {
        synchronize_user_claims(db, holder.id, Some(role_id)).await?;
    }
    Ok(holders.len())
}

/// Rejects duplicate, unknown and administrative identity roles.
async fn check_details<C: ConnectionTrait>(
    db: &C,
    details: &[RoleDetailRequest],
) -> Result<(), ServiceError> {
    let mut seen = HashSet::new();
    for detail in details {
        if !seen.insert(detail.identity_role_id) {
            return Err(ServiceError::ValidationError(format!(
                "Identity role {} is listed more than once",
                detail.identity_role_id
            )));
        }
    }
    if seen.is_empty() {
        return Ok(());
    }

    let found: HashMap<i32, String> = identity_role::Entity::find()
        .filter(identity_role::Column::Id.is_in(seen.iter().copied()))
        .all(db)
        .await
        .map_err(ServiceError::db_error)?
        .into_iter()
        .map(|r| (r.id, r.name))
        .collect();
    for detail in details {
        match found.get(&detail.identity_role_id) {
            None => {
                return Err(ServiceError::ValidationError(format!(
                    "Identity role {} does not exist",
                    detail.identity_role_id
                )))
            }
            Some(name) if is_administrative(name) => {
                return Err(ServiceError::ValidationError(format!(
                    "Identity role '{}' cannot be granted through a role",
                    name
                )))
            }
            Some(_) => {}
        }
    }
    Ok(())
}

async fn insert_details<C: ConnectionTrait>(
    db: &C,
    role_id: i32,
    details: impl IntoIterator<Item = RoleDetailRequest>,
) -> Result<(), ServiceError> {
    for detail in details {
        manage_user_role_detail::ActiveModel {
            manage_user_role_id: Set(role_id),
            identity_role_id: Set(detail.identity_role_id),
            is_allowed: Set(detail.is_allowed),
            ..Default::default()
        }
        .insert(db)
        .await
        .map_err(ServiceError::db_error)?;
    }
    Ok(())
}

/// Maintains organization roles and keeps the users' role claims in step.
#[derive(Clone)]
pub struct RoleService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    logger: Logger,
}

impl RoleService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>, logger: Logger) -> Self {
        Self {
            db_pool,
            event_sender,
            logger,
        }
    }

    /// Ensures the fixed catalogue of identity roles exists.
    #[instrument(skip(self))]
    pub async fn generate_roles_from_fixed_list(&self) -> Result<usize, ServiceError> {
        generate_roles_from_fixed_list(self.db_pool.as_ref()).await
    }

    pub async fn list_identity_roles(&self) -> Result<Vec<identity_role::Model>, ServiceError> {
        identity_role::Entity::find()
            .order_by_asc(identity_role::Column::Name)
            .all(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)
    }

    /// Creates the role and all of its details, or nothing.
    #[instrument(skip(self, request), fields(org = ctx.organization_id))]
    pub async fn create_role(
        &self,
        ctx: &OrgContext,
        request: CreateRoleRequest,
    ) -> Result<RoleWithDetails, ServiceError> {
        request.validate()?;
        let name = normalize_name(&request.name)?;

        let txn = self.db_pool.begin().await.map_err(ServiceError::db_error)?;
        ensure_name_available::<manage_user_role::Entity, _>(
            &txn,
            Some(ctx.organization_id),
            &name,
            None,
            None,
        )
        .await?;
        check_details(&txn, &request.details).await?;

        let role = manage_user_role::ActiveModel {
            organization_id: Set(ctx.organization_id),
            name: Set(name),
            description: Set(normalize_optional(request.description)),
            is_deleted: Set(false),
            created_by: Set(ctx.user_id),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(ServiceError::db_error)?;
        insert_details(&txn, role.id, request.details).await?;
        txn.commit().await.map_err(ServiceError::db_error)?;

        slog::info!(self.logger, "role created"; "role_id" => role.id, "org" => ctx.organization_id, "actor" => %ctx.user_id);
        self.event_sender
            .publish(Event::RoleCreated {
                organization_id: ctx.organization_id,
                role_id: role.id,
            })
            .await;
        self.get_role(ctx, role.id).await
    }

    /// Reconciles the detail rows against the request by identity role and
    /// recomputes the claims of every holder.
    #[instrument(skip(self, request), fields(org = ctx.organization_id, role_id = request.id))]
    pub async fn update_role(
        &self,
        ctx: &OrgContext,
        request: UpdateRoleRequest,
    ) -> Result<RoleWithDetails, ServiceError> {
        request.validate()?;
        let name = normalize_name(&request.name)?;

        let txn = self.db_pool.begin().await.map_err(ServiceError::db_error)?;
        let existing = self.find_role(&txn, ctx, request.id).await?;
        if existing.is_deleted {
            return Err(ServiceError::not_found("Role", request.id));
        }
        ensure_name_available::<manage_user_role::Entity, _>(
            &txn,
            Some(existing.organization_id),
            &name,
            None,
            Some(existing.id),
        )
        .await?;
        check_details(&txn, &request.details).await?;

        let current = manage_user_role_detail::Entity::find()
            .filter(manage_user_role_detail::Column::ManageUserRoleId.eq(existing.id))
            .all(&txn)
            .await
            .map_err(ServiceError::db_error)?;
        let wanted: HashMap<i32, bool> = request
            .details
            .iter()
            .map(|d| (d.identity_role_id, d.is_allowed))
            .collect();

        let mut kept = HashSet::new();
        for detail in current {
            match wanted.get(&detail.identity_role_id) {
                None => {
                    manage_user_role_detail::Entity::delete_by_id(detail.id)
                        .exec(&txn)
                        .await
                        .map_err(ServiceError::db_error)?;
                }
                Some(&allowed) => {
                    kept.insert(detail.identity_role_id);
                    if detail.is_allowed != allowed {
                        let mut active: manage_user_role_detail::ActiveModel = detail.into();
                        active.is_allowed = Set(allowed);
                        active.update(&txn).await.map_err(ServiceError::db_error)?;
                    }
                }
            }
        }
        let added = request
            .details
            .into_iter()
            .filter(|d| !kept.contains(&d.identity_role_id));
        insert_details(&txn, existing.id, added).await?;

        let role_id = existing.id;
        let organization_id = existing.organization_id;
        let mut active: manage_user_role::ActiveModel = existing.into();
        active.name = Set(name);
        if let Some(description) = request.description {
            active.description = Set(normalize_optional(Some(description)));
        }
        active.modified_by = Set(Some(ctx.user_id));
        active.update(&txn).await.map_err(ServiceError::db_error)?;

        let synchronized = synchronize_role_holders(&txn, role_id).await?;
        txn.commit().await.map_err(ServiceError::db_error)?;

        slog::info!(self.logger, "role updated"; "role_id" => role_id, "holders" => synchronized, "org" => organization_id, "actor" => %ctx.user_id);
        self.event_sender
            .publish(Event::RoleUpdated {
                organization_id,
                role_id,
            })
            .await;
        self.event_sender
            .publish(Event::UserClaimsSynchronized {
                organization_id,
                users: synchronized,
            })
            .await;
        self.get_role(ctx, role_id).await
    }

    /// Soft-deletes the role, removes its details and strips it from its holders.
    #[instrument(skip(self), fields(org = ctx.organization_id))]
    pub async fn delete_role(&self, ctx: &OrgContext, id: i32) -> Result<(), ServiceError> {
        let txn = self.db_pool.begin().await.map_err(ServiceError::db_error)?;
        let role = self.find_role(&txn, ctx, id).await?;
        if role.is_deleted {
            return Err(ServiceError::not_found("Role", id));
        }

        manage_user_role_detail::Entity::delete_many()
            .filter(manage_user_role_detail::Column::ManageUserRoleId.eq(id))
            .exec(&txn)
            .await
            .map_err(ServiceError::db_error)?;

        let holders = user::Entity::find()
            .filter(user::Column::ManageUserRoleId.eq(id))
            .all(&txn)
            .await
            .map_err(ServiceError::db_error)?;
        for holder in &holders {
            synchronize_user_claims(&txn, holder.id, None).await?;
        }
        user::Entity::update_many()
            .col_expr(user::Column::ManageUserRoleId, Expr::value(Option::<i32>::None))
            .filter(user::Column::ManageUserRoleId.eq(id))
            .exec(&txn)
            .await
            .map_err(ServiceError::db_error)?;

        let organization_id = role.organization_id;
        let mut active: manage_user_role::ActiveModel = role.into();
        active.is_deleted = Set(true);
        active.modified_by = Set(Some(ctx.user_id));
        active.update(&txn).await.map_err(ServiceError::db_error)?;
        txn.commit().await.map_err(ServiceError::db_error)?;

        slog::info!(self.logger, "role deleted"; "role_id" => id, "holders" => holders.len(), "org" => organization_id, "actor" => %ctx.user_id);
        self.event_sender
            .publish(Event::RoleDeleted {
                organization_id,
                role_id: id,
            })
            .await;
        self.event_sender
            .publish(Event::UserClaimsSynchronized {
                organization_id,
                users: holders.len(),
            })
            .await;
        Ok(())
    }

    /// Role of the caller's organization; super-admins may read any.
    async fn find_role<C: ConnectionTrait>(
        &self,
        db: &C,
        ctx: &OrgContext,
        id: i32,
    ) -> Result<manage_user_role::Model, ServiceError> {
        let mut query = manage_user_role::Entity::find_by_id(id);
        if !ctx.is_super_admin {
            query = query.filter(manage_user_role::Column::OrganizationId.eq(ctx.organization_id));
        }
        query
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::not_found("Role", id))
    }

    pub async fn get_role(&self, ctx: &OrgContext, id: i32) -> Result<RoleWithDetails, ServiceError> {
        let role = self.find_role(self.db_pool.as_ref(), ctx, id).await?;
        self.with_details(vec![role])
            .await?
            .pop()
            .ok_or_else(|| ServiceError::not_found("Role", id))
    }

    /// Non-deleted roles with details: the organization's, or every
    /// organization's for a super-admin.
    pub async fn list_roles(&self, ctx: &OrgContext) -> Result<Vec<RoleWithDetails>, ServiceError> {
        let mut query =
            manage_user_role::Entity::find().filter(manage_user_role::Column::IsDeleted.eq(false));
        if !ctx.is_super_admin {
            query = query.filter(manage_user_role::Column::OrganizationId.eq(ctx.organization_id));
        }
        let roles = query
            .order_by_asc(manage_user_role::Column::Name)
            .all(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?;
        self.with_details(roles).await
    }

    /// Non-deleted roles created by the user with `email`.
    pub async fn roles_for_user(
        &self,
        ctx: &OrgContext,
        email: &str,
    ) -> Result<Vec<RoleWithDetails>, ServiceError> {
        let db = self.db_pool.as_ref();
        let mut owner_query =
            user::Entity::find().filter(user::Column::Email.eq(email.trim().to_lowercase()));
        if !ctx.is_super_admin {
            owner_query = owner_query.filter(user::Column::OrganizationId.eq(ctx.organization_id));
        }
        let owner = owner_query
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("User {} not found", email)))?;

        let roles = manage_user_role::Entity::find()
            .filter(manage_user_role::Column::CreatedBy.eq(owner.id))
            .filter(manage_user_role::Column::OrganizationId.eq(owner.organization_id))
            .filter(manage_user_role::Column::IsDeleted.eq(false))
            .order_by_asc(manage_user_role::Column::Name)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;
        self.with_details(roles).await
    }

    async fn with_details(
        &self,
        roles: Vec<manage_user_role::Model>,
    ) -> Result<Vec<RoleWithDetails>, ServiceError> {
        if roles.is_empty() {
            return Ok(Vec::new());
        }
        let db = self.db_pool.as_ref();
        let rows = manage_user_role_detail::Entity::find()
            .filter(
                manage_user_role_detail::Column::ManageUserRoleId
                    .is_in(roles.iter().map(|r| r.id).collect::<Vec<_>>()),
            )
            .order_by_asc(manage_user_role_detail::Column::Id)
            .find_also_related(identity_role::Entity)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        let mut details: HashMap<i32, Vec<RoleDetailView>> = HashMap::new();
        for (detail, identity) in rows {
            details
                .entry(detail.manage_user_role_id)
                .or_default()
                .push(RoleDetailView {
                    id: detail.id,
                    identity_role_id: detail.identity_role_id,
                    identity_role_name: identity.map(|r| r.name).unwrap_or_default(),
                    is_allowed: detail.is_allowed,
                });
        }

        Ok(roles
            .into_iter()
            .map(|role| RoleWithDetails {
                details: details.remove(&role.id).unwrap_or_default(),
                id: role.id,
                organization_id: role.organization_id,
                name: role.name,
                description: role.description,
                is_deleted: role.is_deleted,
                created_by: role.created_by,
                created_at: role.created_at,
                modified_at: role.modified_at,
            })
            .collect())
    }
}
