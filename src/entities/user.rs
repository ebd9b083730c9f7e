use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::Set;
use serde::{Deserialize, Serialize};

/// Login account and employee profile in one row.
///
/// Self-registered users own their organization (`is_org_admin`). Profiles created
/// by an administrator start without a password and gain one through login-access
/// provisioning.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub organization_id: i32,
    pub full_name: String,
    #[sea_orm(unique)]
    pub email: String,
    pub phone: Option<String>,
    pub employee_code: Option<String>,
    #[serde(skip_serializing)]
    #[sea_orm(column_type = "Text", nullable)]
    pub password_hash: Option<String>,
    pub email_confirmed: bool,
    pub login_enabled: bool,
    pub is_self_registered: bool,
    pub is_org_admin: bool,
    pub department_id: Option<i32>,
    pub sub_department_id: Option<i32>,
    pub designation_id: Option<i32>,
    pub site_id: Option<i32>,
    pub manage_user_role_id: Option<i32>,
    pub is_deleted: bool,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub modified_by: Option<Uuid>,
    pub modified_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::organization::Entity",
        from = "Column::OrganizationId",
        to = "super::organization::Column::Id"
    )]
    Organization,
    #[sea_orm(
        belongs_to = "super::manage_user_role::Entity",
        from = "Column::ManageUserRoleId",
        to = "super::manage_user_role::Column::Id"
    )]
    ManageUserRole,
    #[sea_orm(has_many = "super::user_identity_role::Entity")]
    IdentityRoles,
}

impl Related<super::organization::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Organization.def()
    }
}

impl Related<super::manage_user_role::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ManageUserRole.def()
    }
}

impl Related<super::user_identity_role::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::IdentityRoles.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;
        let now = Utc::now();
        if insert {
            active_model.created_at = Set(now);
        } else {
            active_model.modified_at = Set(Some(now));
        }
        Ok(active_model)
    }
}
