//! Database entities.
//!
//! Every table except `organizations`, `identity_roles` and `industries` is scoped to
//! exactly one organization through an `organization_id` column.

pub mod area;
pub mod asset;
pub mod asset_assigned;
pub mod asset_disposal;
pub mod asset_history;
pub mod asset_request;
pub mod asset_status;
pub mod category;
pub mod city;
pub mod company;
pub mod department;
pub mod designation;
pub mod email_verification;
pub mod identity_role;
pub mod industry;
pub mod login_history;
pub mod manage_user_role;
pub mod manage_user_role_detail;
pub mod organization;
pub mod site;
pub mod sub_category;
pub mod sub_department;
pub mod supplier;
pub mod user;
pub mod user_identity_role;

/// Stamps `created_at` on insert and `modified_at` on every later save.
///
/// Shared by the organization-scoped reference tables, which all carry the same
/// audit column pair.
macro_rules! audited_behavior {
    () => {
        #[async_trait::async_trait]
        impl sea_orm::ActiveModelBehavior for ActiveModel {
            async fn before_save<C>(self, _db: &C, insert: bool) -> Result<Self, sea_orm::DbErr>
            where
                C: sea_orm::ConnectionTrait,
            {
                let mut active_model = self;
                let now = chrono::Utc::now();
                if insert {
                    active_model.created_at = sea_orm::Set(now);
                } else {
                    active_model.modified_at = sea_orm::Set(Some(now));
                }
                Ok(active_model)
            }
        }
    };
}

pub(crate) use audited_behavior;
