pub mod accounts;
pub mod assets;
pub mod categories;
pub mod common;
pub mod health;
pub mod locations;
pub mod organization;
pub mod profiles;
pub mod roles;
pub mod suppliers;

use slog::Logger;
use std::sync::Arc;

use crate::auth::AuthService;
use crate::config::AppConfig;
use crate::db::DbPool;
use crate::events::EventSender;
use crate::logging::component;
use crate::services::{
    accounts::{AccountService, AccountSettings},
    asset_statuses::AssetStatusService,
    assets::{ApprovalPolicy, AssetService},
    categories::CategoryService,
    email::EmailSender,
    locations::LocationService,
    organization_structure::OrganizationStructureService,
    profiles::ProfileService,
    roles::RoleService,
    storage::FileStorage,
    suppliers::SupplierService,
};

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub accounts: Arc<AccountService>,
    pub profiles: Arc<ProfileService>,
    pub roles: Arc<RoleService>,
    pub locations: Arc<LocationService>,
    pub categories: Arc<CategoryService>,
    pub suppliers: Arc<SupplierService>,
    pub organization: Arc<OrganizationStructureService>,
    pub asset_statuses: Arc<AssetStatusService>,
    pub assets: Arc<AssetService>,
}

impl AppServices {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        auth: Arc<AuthService>,
        email: Arc<dyn EmailSender>,
        storage: Arc<dyn FileStorage>,
        config: &AppConfig,
        logger: &Logger,
    ) -> Self {
        let accounts = Arc::new(AccountService::new(
            db_pool.clone(),
            auth,
            email.clone(),
            event_sender.clone(),
            AccountSettings::from(config),
            component(logger, "account_service"),
        ));
        let profiles = Arc::new(ProfileService::new(
            db_pool.clone(),
            email,
            event_sender.clone(),
            component(logger, "profile_service"),
        ));
        let roles = Arc::new(RoleService::new(
            db_pool.clone(),
            event_sender.clone(),
            component(logger, "role_service"),
        ));
        let locations = Arc::new(LocationService::new(
            db_pool.clone(),
            component(logger, "location_service"),
        ));
        let categories = Arc::new(CategoryService::new(
            db_pool.clone(),
            component(logger, "category_service"),
        ));
        let suppliers = Arc::new(SupplierService::new(
            db_pool.clone(),
            storage.clone(),
            component(logger, "supplier_service"),
        ));
        let organization = Arc::new(OrganizationStructureService::new(
            db_pool.clone(),
            component(logger, "organization_service"),
        ));
        let asset_statuses = Arc::new(AssetStatusService::new(
            db_pool.clone(),
            component(logger, "asset_status_service"),
        ));
        let assets = Arc::new(AssetService::new(
            db_pool,
            storage,
            event_sender,
            ApprovalPolicy::from(config),
            component(logger, "asset_service"),
        ));

        Self {
            accounts,
            profiles,
            roles,
            locations,
            categories,
            suppliers,
            organization,
            asset_statuses,
            assets,
        }
    }
}
