use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::auth::{AuthError, AuthUser};

/// Tenant and actor every service call runs under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrgContext {
    pub organization_id: i32,
    pub user_id: Uuid,
    pub email: String,
    pub is_super_admin: bool,
}

impl OrgContext {
    pub fn new(organization_id: i32, user_id: Uuid, email: impl Into<String>) -> Self {
        Self {
            organization_id,
            user_id,
            email: email.into(),
            is_super_admin: false,
        }
    }

    pub fn as_super_admin(mut self) -> Self {
        self.is_super_admin = true;
        self
    }

    pub fn from_user(user: &AuthUser) -> Result<Self, AuthError> {
        let organization_id = user.organization_id.ok_or(AuthError::MissingOrganization)?;
        Ok(Self {
            organization_id,
            user_id: user.user_id,
            email: user.email.clone(),
            is_super_admin: user.is_super_admin(),
        })
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for OrgContext
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = parts
            .extensions
            .get::<AuthUser>()
            .ok_or(AuthError::MissingAuth)?;
        Self::from_user(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn user(organization_id: Option<i32>, roles: &[&str]) -> AuthUser {
        AuthUser {
            user_id: Uuid::new_v4(),
            email: "ops@acme.test".into(),
            name: "Ops".into(),
            organization_id,
            roles: roles.iter().map(|r| r.to_string()).collect(),
            token_id: "jti".into(),
            expires_at: 0,
        }
    }

    #[test]
    fn principal_without_organization_is_forbidden() {
        assert_matches!(
            OrgContext::from_user(&user(None, &["Admin"])),
            Err(AuthError::MissingOrganization)
        );
    }

    #[test]
    fn super_admin_flag_follows_role_claims() {
        let ctx = OrgContext::from_user(&user(Some(3), &["SuperAdmin"])).unwrap();
        assert_eq!(ctx.organization_id, 3);
        assert!(ctx.is_super_admin);

        let ctx = OrgContext::from_user(&user(Some(3), &["City.View"])).unwrap();
        assert!(!ctx.is_super_admin);
    }
}
