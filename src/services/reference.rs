//! Shared rules for organization-scoped reference data.
//!
//! Every reference table carries `id`, `name`, `is_deleted` and the modification
//! stamps; all but `industries` also carry `organization_id`. The helpers here
//! implement the rules common to all of them: names are unique (trimmed) among
//! non-deleted rows of the same organization and parent, lookups never cross
//! organizations, and deletes only flip the flag.

use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::entities;
use crate::errors::ServiceError;

pub trait ReferenceEntity: EntityTrait {
    /// Human readable name used in messages.
    const LABEL: &'static str;

    fn id_column() -> Self::Column;
    fn name_column() -> Self::Column;
    fn deleted_column() -> Self::Column;
    fn modified_by_column() -> Self::Column;
    fn modified_at_column() -> Self::Column;
    /// `None` for global tables.
    fn organization_column() -> Option<Self::Column>;
}

macro_rules! reference_entity {
    ($module:ident, $label:literal) => {
        reference_entity!(@impl $module, $label, Some(entities::$module::Column::OrganizationId));
    };
    ($module:ident, $label:literal, global) => {
        reference_entity!(@impl $module, $label, None);
    };
    (@impl $module:ident, $label:literal, $org:expr) => {
        impl ReferenceEntity for entities::$module::Entity {
            const LABEL: &'static str = $label;

            fn id_column() -> Self::Column {
                entities::$module::Column::Id
            }
            fn name_column() -> Self::Column {
                entities::$module::Column::Name
            }
            fn deleted_column() -> Self::Column {
                entities::$module::Column::IsDeleted
            }
            fn modified_by_column() -> Self::Column {
                entities::$module::Column::ModifiedBy
            }
            fn modified_at_column() -> Self::Column {
                entities::$module::Column::ModifiedAt
            }
            fn organization_column() -> Option<Self::Column> {
                $org
            }
        }
    };
}

reference_entity!(city, "City");
reference_entity!(site, "Site");
reference_entity!(area, "Area");
reference_entity!(category, "Category");
reference_entity!(sub_category, "Sub-category");
reference_entity!(supplier, "Supplier");
reference_entity!(department, "Department");
reference_entity!(sub_department, "Sub-department");
reference_entity!(designation, "Designation");
reference_entity!(company, "Company");
reference_entity!(industry, "Industry", global);
reference_entity!(asset_status, "Asset status");
reference_entity!(manage_user_role, "Role");

/// Name and description shared by the flat reference tables.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct NamedEntityRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateNamedEntityRequest {
    pub id: i32,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
}

/// `?id=` query used by get-by-id and delete routes.
#[derive(Debug, Clone, Copy, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct IdQuery {
    pub id: i32,
}

/// Trimmed name, rejecting blanks.
pub fn normalize_name(name: &str) -> Result<String, ServiceError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::ValidationError("Name is required".to_string()));
    }
    Ok(trimmed.to_string())
}

/// Trimmed optional text; blank becomes `None`.
pub fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Row by id within the organization, soft-deleted rows included.
pub async fn find_in_org<E, C>(
    db: &C,
    organization_id: Option<i32>,
    id: i32,
) -> Result<E::Model, ServiceError>
where
    E: ReferenceEntity,
    C: ConnectionTrait,
{
    let mut query = E::find().filter(E::id_column().eq(id));
    if let (Some(column), Some(org)) = (E::organization_column(), organization_id) {
        query = query.filter(column.eq(org));
    }
    query
        .one(db)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::not_found(E::LABEL, id))
}

/// Non-deleted row by id within the organization.
pub async fn find_active_in_org<E, C>(
    db: &C,
    organization_id: Option<i32>,
    id: i32,
) -> Result<E::Model, ServiceError>
where
    E: ReferenceEntity,
    C: ConnectionTrait,
{
    let mut query = E::find()
        .filter(E::id_column().eq(id))
        .filter(E::deleted_column().eq(false));
    if let (Some(column), Some(org)) = (E::organization_column(), organization_id) {
        query = query.filter(column.eq(org));
    }
    query
        .one(db)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::not_found(E::LABEL, id))
}

/// Same as [`find_active_in_org`] but a missing row is a validation failure of
/// the referencing request rather than a 404.
pub async fn require_reference<E, C>(
    db: &C,
    organization_id: Option<i32>,
    id: i32,
) -> Result<E::Model, ServiceError>
where
    E: ReferenceEntity,
    C: ConnectionTrait,
{
    find_active_in_org::<E, C>(db, organization_id, id)
        .await
        .map_err(|err| match err {
            ServiceError::NotFound(_) => ServiceError::ValidationError(format!(
                "{} with id {} does not exist",
                E::LABEL,
                id
            )),
            other => other,
        })
}

/// Fails when another non-deleted row of the same scope already uses `name`.
pub async fn ensure_name_available<E, C>(
    db: &C,
    organization_id: Option<i32>,
    name: &str,
    parent: Option<(E::Column, i32)>,
    exclude_id: Option<i32>,
) -> Result<(), ServiceError>
where
    E: ReferenceEntity,
    C: ConnectionTrait,
{
    let mut query = E::find()
        .filter(E::name_column().eq(name))
        .filter(E::deleted_column().eq(false));
    if let (Some(column), Some(org)) = (E::organization_column(), organization_id) {
        query = query.filter(column.eq(org));
    }
    if let Some((column, parent_id)) = parent {
        query = query.filter(column.eq(parent_id));
    }
    if let Some(id) = exclude_id {
        query = query.filter(E::id_column().ne(id));
    }

    let existing = query.one(db).await.map_err(ServiceError::db_error)?;
    if existing.is_some() {
        return Err(ServiceError::ValidationError(format!(
            "{} '{}' already exists",
            E::LABEL,
            name
        )));
    }
    Ok(())
}

/// Non-deleted rows of the organization ordered by name.
pub async fn list_active<E, C>(
    db: &C,
    organization_id: Option<i32>,
) -> Result<Vec<E::Model>, ServiceError>
where
    E: ReferenceEntity,
    C: ConnectionTrait,
{
    let mut query = E::find().filter(E::deleted_column().eq(false));
    if let (Some(column), Some(org)) = (E::organization_column(), organization_id) {
        query = query.filter(column.eq(org));
    }
    query
        .order_by_asc(E::name_column())
        .all(db)
        .await
        .map_err(ServiceError::db_error)
}

/// Every row across organizations, deleted ones included.
pub async fn list_all<E, C>(db: &C) -> Result<Vec<E::Model>, ServiceError>
where
    E: ReferenceEntity,
    C: ConnectionTrait,
{
    E::find()
        .order_by_asc(E::id_column())
        .all(db)
        .await
        .map_err(ServiceError::db_error)
}

/// Flips `is_deleted`; the row stays readable by id.
pub async fn soft_delete<E, C>(
    db: &C,
    organization_id: Option<i32>,
    id: i32,
    actor: Uuid,
) -> Result<(), ServiceError>
where
    E: ReferenceEntity,
    C: ConnectionTrait,
{
    find_active_in_org::<E, C>(db, organization_id, id).await?;

    E::update_many()
        .col_expr(E::deleted_column(), Expr::value(true))
        .col_expr(E::modified_by_column(), Expr::value(Some(actor)))
        .col_expr(E::modified_at_column(), Expr::value(Some(Utc::now())))
        .filter(E::id_column().eq(id))
        .exec(db)
        .await
        .map_err(ServiceError::db_error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use proptest::prelude::*;

    #[test]
    fn names_are_trimmed_and_required() {
        assert_eq!(normalize_name("  Dubai ").unwrap(), "Dubai");
        assert_matches!(normalize_name("   "), Err(ServiceError::ValidationError(_)));
    }

    #[test]
    fn blank_optional_text_is_dropped() {
        assert_eq!(normalize_optional(Some("  ".into())), None);
        assert_eq!(
            normalize_optional(Some(" Main road ".into())),
            Some("Main road".to_string())
        );
        assert_eq!(normalize_optional(None), None);
    }

    proptest! {
        #[test]
        fn normalized_names_have_no_surrounding_whitespace(raw in "\\PC*") {
            match normalize_name(&raw) {
                Ok(name) => {
                    prop_assert_eq!(name.trim(), name.as_str());
                    prop_assert!(!name.is_empty());
                }
                Err(_) => prop_assert!(raw.trim().is_empty()),
            }
        }
    }
}
