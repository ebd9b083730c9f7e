//! Organization reference data: cities, sites, areas, categories,
//! organization structure, suppliers and industries.

mod common;

use axum::http::{Method, StatusCode};
use common::{TestApp, PASSWORD, SUPER_ADMIN_EMAIL};
use serde_json::json;

#[tokio::test]
async fn city_crud_round_trip() {
    let app = TestApp::new().await;
    let admin = app.admin_session().await;

    let id = app
        .create("city", json!({ "name": "  Dubai ", "description": "HQ" }), &admin)
        .await;

    let city = app
        .ok(Method::GET, &format!("/api/v1/city/get-by-id?id={id}"), None, &admin)
        .await;
    assert_eq!(city["name"], "Dubai");
    assert_eq!(city["organization_id"], admin.organization_id);

    let updated = app
        .ok(
            Method::PUT,
            "/api/v1/city/update",
            Some(json!({ "id": id, "name": "Abu Dhabi" })),
            &admin,
        )
        .await;
    assert_eq!(updated["name"], "Abu Dhabi");
    assert_eq!(updated["description"], "HQ");
    assert_eq!(updated["modified_by"], admin.user_id.as_str());

    app.ok(Method::DELETE, &format!("/api/v1/city/delete?id={id}"), None, &admin)
        .await;

    let listed = app.ok(Method::GET, "/api/v1/city/get-by-org", None, &admin).await;
    assert!(listed.as_array().unwrap().is_empty());

    // Soft-deleted rows stay readable by id.
    let deleted = app
        .ok(Method::GET, &format!("/api/v1/city/get-by-id?id={id}"), None, &admin)
        .await;
    assert_eq!(deleted["is_deleted"], true);

    app.fails(
        Method::DELETE,
        &format!("/api/v1/city/delete?id={id}"),
        None,
        &admin,
        StatusCode::NOT_FOUND,
    )
    .await;
}

#[tokio::test]
async fn names_are_unique_among_live_rows() {
    let app = TestApp::new().await;
    let admin = app.admin_session().await;

    let first = app.create("category", json!({ "name": "Laptops" }), &admin).await;
    let envelope = app
        .fails(
            Method::POST,
            "/api/v1/category/create",
            Some(json!({ "name": "Laptops" })),
            &admin,
            StatusCode::BAD_REQUEST,
        )
        .await;
    assert_eq!(envelope["success"], false);
    assert!(envelope["message"].as_str().unwrap().contains("already exists"));

    app.ok(
        Method::DELETE,
        &format!("/api/v1/category/delete?id={first}"),
        None,
        &admin,
    )
    .await;
    app.create("category", json!({ "name": "Laptops" }), &admin).await;
}

#[tokio::test]
async fn organizations_do_not_see_each_other() {
    let app = TestApp::new().await;
    let acme = app.admin_session().await;
    let globex = app.admin_session().await;

    let id = app.create("department", json!({ "name": "Finance" }), &acme).await;

    app.fails(
        Method::GET,
        &format!("/api/v1/department/get-by-id?id={id}"),
        None,
        &globex,
        StatusCode::NOT_FOUND,
    )
    .await;
    let listed = app
        .ok(Method::GET, "/api/v1/department/get-by-org", None, &globex)
        .await;
    assert!(listed.as_array().unwrap().is_empty());

    // The same name is free in another organization.
    app.create("department", json!({ "name": "Finance" }), &globex).await;
}

#[tokio::test]
async fn child_rows_require_a_live_parent_in_the_same_organization() {
    let app = TestApp::new().await;
    let acme = app.admin_session().await;
    let globex = app.admin_session().await;

    let foreign_city = app.create("city", json!({ "name": "Oslo" }), &globex).await;
    app.fails(
        Method::POST,
        "/api/v1/site/create",
        Some(json!({ "name": "Branch", "city_id": foreign_city })),
        &acme,
        StatusCode::BAD_REQUEST,
    )
    .await;

    let city = app.create("city", json!({ "name": "Oslo" }), &acme).await;
    let site = app
        .create(
            "site",
            json!({ "name": "Branch", "city_id": city, "address": "Karl Johans gate 1" }),
            &acme,
        )
        .await;
    let area = app
        .create("area", json!({ "name": "Floor 2", "site_id": site }), &acme)
        .await;
    assert!(area > 0);

    app.ok(Method::DELETE, &format!("/api/v1/site/delete?id={site}"), None, &acme)
        .await;
    app.fails(
        Method::POST,
        "/api/v1/area/create",
        Some(json!({ "name": "Floor 3", "site_id": site })),
        &acme,
        StatusCode::BAD_REQUEST,
    )
    .await;
}

#[tokio::test]
async fn sub_categories_are_listed_per_category() {
    let app = TestApp::new().await;
    let admin = app.admin_session().await;

    let it = app.create("category", json!({ "name": "IT" }), &admin).await;
    let furniture = app.create("category", json!({ "name": "Furniture" }), &admin).await;
    app.create("sub-category", json!({ "name": "Monitors", "category_id": it }), &admin)
        .await;
    app.create("sub-category", json!({ "name": "Laptops", "category_id": it }), &admin)
        .await;
    app.create(
        "sub-category",
        json!({ "name": "Desks", "category_id": furniture }),
        &admin,
    )
    .await;

    let of_it = app
        .ok(
            Method::GET,
            &format!("/api/v1/sub-category/get-by-category?id={it}"),
            None,
            &admin,
        )
        .await;
    let names: Vec<&str> = of_it
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["Laptops", "Monitors"]);
}

#[tokio::test]
async fn sub_department_names_repeat_across_departments() {
    let app = TestApp::new().await;
    let admin = app.admin_session().await;

    let sales = app.create("department", json!({ "name": "Sales" }), &admin).await;
    let support = app.create("department", json!({ "name": "Support" }), &admin).await;
    app.create(
        "sub-department",
        json!({ "name": "EMEA", "department_id": sales }),
        &admin,
    )
    .await;
    app.create(
        "sub-department",
        json!({ "name": "EMEA", "department_id": support }),
        &admin,
    )
    .await;
}

#[tokio::test]
async fn supplier_contact_details_are_validated() {
    let app = TestApp::new().await;
    let admin = app.admin_session().await;

    app.fails(
        Method::POST,
        "/api/v1/supplier/create",
        Some(json!({ "name": "Contoso", "email": "not-an-email" })),
        &admin,
        StatusCode::BAD_REQUEST,
    )
    .await;

    let supplier = app
        .ok(
            Method::POST,
            "/api/v1/supplier/create",
            Some(json!({
                "name": "Contoso",
                "contact_person": "Ada",
                "email": "sales@contoso.test",
                "document": {
                    "file_name": "contract.pdf",
                    "content_base64": "JVBERi0xLjQK"
                }
            })),
            &admin,
        )
        .await;
    assert_eq!(supplier["email"], "sales@contoso.test");
    assert!(supplier["document_path"].as_str().is_some());
}

#[tokio::test]
async fn get_all_is_reserved_for_the_platform_operator() {
    let app = TestApp::new().await;
    let admin = app.admin_session().await;
    app.create("designation", json!({ "name": "Engineer" }), &admin).await;

    app.fails(
        Method::GET,
        "/api/v1/designation/get-all",
        None,
        &admin,
        StatusCode::FORBIDDEN,
    )
    .await;

    app.register(SUPER_ADMIN_EMAIL).await;
    let operator = app.login(SUPER_ADMIN_EMAIL, PASSWORD).await;
    assert!(operator.roles.iter().any(|r| r == "SuperAdmin"));

    let all = app
        .ok(Method::GET, "/api/v1/designation/get-all", None, &operator)
        .await;
    assert_eq!(all.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn industries_are_shared_across_organizations() {
    let app = TestApp::new().await;
    let acme = app.admin_session().await;
    let globex = app.admin_session().await;

    let id = app.create("industry", json!({ "name": "Logistics" }), &acme).await;

    let seen = app
        .ok(Method::GET, &format!("/api/v1/industry/get-by-id?id={id}"), None, &globex)
        .await;
    assert_eq!(seen["name"], "Logistics");

    let company = app
        .ok(
            Method::POST,
            "/api/v1/company/create",
            Some(json!({ "name": "Globex Freight", "industry_id": id })),
            &globex,
        )
        .await;
    assert_eq!(company["industry_id"], id);
}

#[tokio::test]
async fn members_without_the_page_role_are_forbidden() {
    let app = TestApp::new().await;
    let admin = app.admin_session().await;
    let viewer = app.member_session(&admin, &["City.View"]).await;

    app.create("city", json!({ "name": "Lagos" }), &admin).await;
    let listed = app.ok(Method::GET, "/api/v1/city/get-by-org", None, &viewer).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);

    app.fails(
        Method::POST,
        "/api/v1/city/create",
        Some(json!({ "name": "Abuja" })),
        &viewer,
        StatusCode::FORBIDDEN,
    )
    .await;
    app.fails(
        Method::GET,
        "/api/v1/site/get-by-org",
        None,
        &viewer,
        StatusCode::FORBIDDEN,
    )
    .await;
}
