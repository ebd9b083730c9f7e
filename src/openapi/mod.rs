use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "SAMS API",
        version = "1.0.0",
        description = r#"
# Stock & Asset Management System API

Multi-tenant backend for tracking an organization's physical assets.

## Features

- **Reference data**: cities, sites, areas, categories, sub-categories, suppliers,
  companies, departments, sub-departments, designations and industries
- **Asset lifecycle**: registration, transfer, disposal and history
- **Approval workflow**: optional multi-level sign-off for transfers and disposals
- **Accounts**: self-registration, email verification, login and token refresh
- **User profiles**: employee records, login provisioning and role assignment
- **Roles**: organization roles mapping to page-level permissions

## Authentication

Everything except registration, login, token refresh and email verification
requires a bearer token:

```
Authorization: Bearer <access-token>
```

## Error Handling

Failures share one envelope:

```json
{
  "success": false,
  "error": "Bad Request",
  "message": "Name already exists",
  "timestamp": "2024-01-01T00:00:00Z"
}
```
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "health", description = "Service health"),
        (name = "account", description = "Registration, verification and sessions"),
        (name = "user-profiles", description = "Employee profiles and login provisioning"),
        (name = "roles", description = "Organization roles and identity roles"),
        (name = "cities", description = "Cities"),
        (name = "sites", description = "Sites within a city"),
        (name = "areas", description = "Areas within a site"),
        (name = "categories", description = "Asset categories"),
        (name = "sub-categories", description = "Sub-categories within a category"),
        (name = "suppliers", description = "Suppliers"),
        (name = "companies", description = "Companies"),
        (name = "departments", description = "Departments"),
        (name = "sub-departments", description = "Sub-departments within a department"),
        (name = "designations", description = "Designations"),
        (name = "industries", description = "Platform-wide industries"),
        (name = "assets", description = "Asset lifecycle and approval workflow"),
        (name = "asset-statuses", description = "Organization asset statuses")
    ),
    paths(
        crate::handlers::health::readiness_check,

        // Accounts
        crate::handlers::accounts::register,
        crate::handlers::accounts::send_email_verification_code,
        crate::handlers::accounts::email_confirmation,
        crate::handlers::accounts::login,
        crate::handlers::accounts::refresh_token,
        crate::handlers::accounts::logout,
        crate::handlers::accounts::login_history,

        // Profiles
        crate::handlers::profiles::create_profile,
        crate::handlers::profiles::update_profile,
        crate::handlers::profiles::get_profile,
        crate::handlers::profiles::list_profiles,
        crate::handlers::profiles::delete_profile,
        crate::handlers::profiles::provision_login,
        crate::handlers::profiles::assign_role,

        // Roles
        crate::handlers::roles::create_role,
        crate::handlers::roles::update_role,
        crate::handlers::roles::delete_role,
        crate::handlers::roles::get_role,
        crate::handlers::roles::list_roles,
        crate::handlers::roles::roles_for_user,
        crate::handlers::roles::list_identity_roles,

        // Locations
        crate::handlers::locations::create_city,
        crate::handlers::locations::update_city,
        crate::handlers::locations::get_city,
        crate::handlers::locations::list_cities,
        crate::handlers::locations::list_all_cities,
        crate::handlers::locations::delete_city,
        crate::handlers::locations::create_site,
        crate::handlers::locations::update_site,
        crate::handlers::locations::get_site,
        crate::handlers::locations::list_sites,
        crate::handlers::locations::list_all_sites,
        crate::handlers::locations::delete_site,
        crate::handlers::locations::create_area,
        crate::handlers::locations::update_area,
        crate::handlers::locations::get_area,
        crate::handlers::locations::list_areas,
        crate::handlers::locations::list_all_areas,
        crate::handlers::locations::delete_area,

        // Categories
        crate::handlers::categories::create_category,
        crate::handlers::categories::update_category,
        crate::handlers::categories::get_category,
        crate::handlers::categories::list_categories,
        crate::handlers::categories::list_all_categories,
        crate::handlers::categories::delete_category,
        crate::handlers::categories::create_sub_category,
        crate::handlers::categories::update_sub_category,
        crate::handlers::categories::get_sub_category,
        crate::handlers::categories::list_sub_categories,
        crate::handlers::categories::list_all_sub_categories,
        crate::handlers::categories::delete_sub_category,
        crate::handlers::categories::list_sub_categories_of,

        // Suppliers
        crate::handlers::suppliers::create_supplier,
        crate::handlers::suppliers::update_supplier,
        crate::handlers::suppliers::get_supplier,
        crate::handlers::suppliers::list_suppliers,
        crate::handlers::suppliers::list_all_suppliers,
        crate::handlers::suppliers::delete_supplier,

        // Organization
        crate::handlers::organization::create_company,
        crate::handlers::organization::update_company,
        crate::handlers::organization::get_company,
        crate::handlers::organization::list_companies,
        crate::handlers::organization::list_all_companies,
        crate::handlers::organization::delete_company,
        crate::handlers::organization::create_department,
        crate::handlers::organization::update_department,
        crate::handlers::organization::get_department,
        crate::handlers::organization::list_departments,
        crate::handlers::organization::list_all_departments,
        crate::handlers::organization::delete_department,
        crate::handlers::organization::create_sub_department,
        crate::handlers::organization::update_sub_department,
        crate::handlers::organization::get_sub_department,
        crate::handlers::organization::list_sub_departments,
        crate::handlers::organization::list_all_sub_departments,
        crate::handlers::organization::delete_sub_department,
        crate::handlers::organization::create_designation,
        crate::handlers::organization::update_designation,
        crate::handlers::organization::get_designation,
        crate::handlers::organization::list_designations,
        crate::handlers::organization::list_all_designations,
        crate::handlers::organization::delete_designation,
        crate::handlers::organization::create_industry,
        crate::handlers::organization::update_industry,
        crate::handlers::organization::get_industry,
        crate::handlers::organization::list_industries,
        crate::handlers::organization::delete_industry,

        // Assets
        crate::handlers::assets::create_asset,
        crate::handlers::assets::update_asset,
        crate::handlers::assets::transfer_asset,
        crate::handlers::assets::dispose_asset,
        crate::handlers::assets::approve_request,
        crate::handlers::assets::reject_request,
        crate::handlers::assets::delete_asset,
        crate::handlers::assets::get_asset,
        crate::handlers::assets::list_assets,
        crate::handlers::assets::asset_history,
        crate::handlers::assets::pending_requests,
        crate::handlers::assets::create_status,
        crate::handlers::assets::list_statuses,
        crate::handlers::assets::delete_status,
    ),
    components(
        schemas(
            crate::ApiResponse<serde_json::Value>,
            crate::errors::ErrorResponse,
            crate::handlers::health::HealthResponse,
            crate::auth::TokenPair,
            crate::services::storage::FilePayload,
            crate::entities::asset::Model,
            crate::entities::asset_assigned::Model,
            crate::entities::asset_disposal::Model,
            crate::entities::organization::Model
        )
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Registers the `bearer_auth` scheme referenced by protected paths.
pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_covers_every_resource() {
        let openapi = ApiDoc::openapi();
        let json = serde_json::to_string_pretty(&openapi).unwrap();
        assert!(json.contains("SAMS API"));
        for path in [
            "/health",
            "/api/v1/account/login",
            "/api/v1/asset/transfer",
            "/api/v1/city/get-by-org",
            "/api/v1/manage-user-roles/create",
            "/api/v1/user-profile/provision-login",
        ] {
            assert!(json.contains(path), "missing {path}");
        }
        assert!(json.contains("bearer_auth"));
    }
}
