//! Fixed catalogue of application roles.
//!
//! Every role name is either one of the two administrative roles or a
//! `<Page>.<Action>` pair. The catalogue is seeded into `identity_roles` at startup
//! and is what route groups check against.

use lazy_static::lazy_static;
use strum::{AsRefStr, EnumIter, IntoEnumIterator};

pub const SUPER_ADMIN: &str = "SuperAdmin";
pub const ADMIN: &str = "Admin";

/// Management pages a role can be granted access to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, EnumIter)]
pub enum Page {
    Asset,
    AssetStatus,
    City,
    Site,
    Area,
    Category,
    SubCategory,
    Supplier,
    Company,
    Industry,
    Department,
    SubDepartment,
    Designation,
    UserProfile,
    Role,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, EnumIter)]
pub enum Action {
    View,
    Create,
    Edit,
    Delete,
    Transfer,
    Dispose,
    Approve,
}

impl Action {
    const CRUD: [Action; 4] = [Action::View, Action::Create, Action::Edit, Action::Delete];
}

impl Page {
    pub fn role(self, action: Action) -> String {
        format!("{}.{}", self.as_ref(), action.as_ref())
    }

    fn actions(self) -> Vec<Action> {
        let mut actions = Action::CRUD.to_vec();
        if self == Page::Asset {
            actions.extend([Action::Transfer, Action::Dispose, Action::Approve]);
        }
        actions
    }
}

lazy_static! {
    /// Every role name the application knows about, administrative roles first.
    pub static ref APPLICATION_ROLES: Vec<String> = {
        let mut roles = vec![SUPER_ADMIN.to_string(), ADMIN.to_string()];
        for page in Page::iter() {
            roles.extend(page.actions().into_iter().map(|action| page.role(action)));
        }
        roles
    };
}

pub fn is_known_role(name: &str) -> bool {
    APPLICATION_ROLES.iter().any(|r| r == name)
}

/// Roles that pass every role check.
pub fn is_administrative(name: &str) -> bool {
    name == SUPER_ADMIN || name == ADMIN
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("SuperAdmin" => true)]
    #[test_case("Admin" => true)]
    #[test_case("City.View" => true)]
    #[test_case("Asset.Approve" => true)]
    #[test_case("UserProfile.Delete" => true)]
    #[test_case("City.Approve" => false ; "workflow actions are asset only")]
    #[test_case("Warehouse.View" => false ; "unknown page")]
    #[test_case("city.view" => false ; "names are case sensitive")]
    fn catalogue_membership(name: &str) -> bool {
        is_known_role(name)
    }

    #[test]
    fn catalogue_has_no_duplicates() {
        let mut sorted = APPLICATION_ROLES.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), APPLICATION_ROLES.len());
        // 15 pages x 4 CRUD actions, 3 asset workflow actions, 2 administrative roles
        assert_eq!(APPLICATION_ROLES.len(), 15 * 4 + 3 + 2);
    }

    #[test]
    fn role_names_are_page_dot_action() {
        assert_eq!(Page::SubCategory.role(Action::Edit), "SubCategory.Edit");
    }
}
