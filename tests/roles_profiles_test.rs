//! Organization roles, employee profiles and the claims they grant.

mod common;

use axum::http::{Method, StatusCode};
use common::{response_json, Session, TestApp, PASSWORD};
use serde_json::{json, Value};

async fn identity_role(app: &TestApp, admin: &Session, name: &str) -> Value {
    let roles = app
        .ok(
            Method::GET,
            "/api/v1/manage-user-roles/identity-roles",
            None,
            admin,
        )
        .await;
    roles
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["name"] == name)
        .unwrap_or_else(|| panic!("identity role {name}"))["id"]
        .clone()
}

#[tokio::test]
async fn identity_roles_cover_every_page_action() {
    let app = TestApp::new().await;
    let admin = app.admin_session().await;

    let roles = app
        .ok(
            Method::GET,
            "/api/v1/manage-user-roles/identity-roles",
            None,
            &admin,
        )
        .await;
    let names: Vec<&str> = roles
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["name"].as_str().unwrap())
        .collect();
    assert!(names.contains(&"City.View"));
    assert!(names.contains(&"Asset.Dispose"));
    assert!(names.contains(&"UserProfile.Delete"));
    assert_eq!(names.len(), 65);
}

#[tokio::test]
async fn roles_cannot_grant_administrative_claims() {
    let app = TestApp::new().await;
    let admin = app.admin_session().await;

    for name in ["Admin", "SuperAdmin"] {
        let id = identity_role(&app, &admin, name).await;
        app.fails(
            Method::POST,
            "/api/v1/manage-user-roles/create",
            Some(json!({ "name": "Escalation", "details": [{ "identity_role_id": id }] })),
            &admin,
            StatusCode::BAD_REQUEST,
        )
        .await;
    }

    let view = identity_role(&app, &admin, "City.View").await;
    app.fails(
        Method::POST,
        "/api/v1/manage-user-roles/create",
        Some(json!({
            "name": "Twice",
            "details": [{ "identity_role_id": view }, { "identity_role_id": view }]
        })),
        &admin,
        StatusCode::BAD_REQUEST,
    )
    .await;
}

#[tokio::test]
async fn unknown_identity_role_leaves_nothing_behind() {
    let app = TestApp::new().await;
    let admin = app.admin_session().await;
    let view = identity_role(&app, &admin, "City.View").await;

    app.fails(
        Method::POST,
        "/api/v1/manage-user-roles/create",
        Some(json!({
            "name": "Partial",
            "details": [
                { "identity_role_id": view, "is_allowed": true },
                { "identity_role_id": 987_654, "is_allowed": true }
            ]
        })),
        &admin,
        StatusCode::BAD_REQUEST,
    )
    .await;

    let roles = app
        .ok(Method::GET, "/api/v1/manage-user-roles/get-all", None, &admin)
        .await;
    assert!(roles.as_array().unwrap().is_empty());

    // The name is still free.
    app.ok(
        Method::POST,
        "/api/v1/manage-user-roles/create",
        Some(json!({
            "name": "Partial",
            "details": [{ "identity_role_id": view, "is_allowed": true }]
        })),
        &admin,
    )
    .await;
}

#[tokio::test]
async fn role_changes_reach_holders_on_their_next_login() {
    let app = TestApp::new().await;
    let admin = app.admin_session().await;
    let member = app.member_session(&admin, &["City.View"]).await;
    assert_eq!(member.roles, ["City.View"]);

    let roles = app
        .ok(Method::GET, "/api/v1/manage-user-roles/get-all", None, &admin)
        .await;
    let role = &roles[0];
    assert_eq!(role["details"][0]["identity_role_name"], "City.View");

    let create = identity_role(&app, &admin, "City.Create").await;
    let view = identity_role(&app, &admin, "City.View").await;
    app.ok(
        Method::PUT,
        "/api/v1/manage-user-roles/update",
        Some(json!({
            "id": role["id"],
            "name": role["name"],
            "details": [{ "identity_role_id": view }, { "identity_role_id": create }]
        })),
        &admin,
    )
    .await;

    let refreshed = app.login(&member.email, PASSWORD).await;
    let mut claims = refreshed.roles.clone();
    claims.sort();
    assert_eq!(claims, ["City.Create", "City.View"]);
    app.create("city", json!({ "name": "Nairobi" }), &refreshed).await;

    app.ok(
        Method::DELETE,
        &format!("/api/v1/manage-user-roles/delete?id={}", role["id"]),
        None,
        &admin,
    )
    .await;
    let stripped = app.login(&member.email, PASSWORD).await;
    assert!(stripped.roles.is_empty());
}

#[tokio::test]
async fn roles_for_user_lists_roles_the_user_created() {
    let app = TestApp::new().await;
    let admin = app.admin_session().await;
    app.member_session(&admin, &["Site.View"]).await;

    let roles = app
        .ok(
            Method::GET,
            &format!(
                "/api/v1/manage-user-roles/get-for-user?email={}",
                admin.email
            ),
            None,
            &admin,
        )
        .await;
    assert_eq!(roles.as_array().unwrap().len(), 1);

    app.fails(
        Method::GET,
        "/api/v1/manage-user-roles/get-for-user?email=stranger@else.test",
        None,
        &admin,
        StatusCode::NOT_FOUND,
    )
    .await;
}

#[tokio::test]
async fn profile_placement_must_be_consistent() {
    let app = TestApp::new().await;
    let admin = app.admin_session().await;

    let sales = app.create("department", json!({ "name": "Sales" }), &admin).await;
    let ops = app.create("department", json!({ "name": "Ops" }), &admin).await;
    let emea = app
        .create(
            "sub-department",
            json!({ "name": "EMEA", "department_id": sales }),
            &admin,
        )
        .await;

    app.fails(
        Method::POST,
        "/api/v1/user-profile/create",
        Some(json!({
            "full_name": "Misfiled",
            "email": "misfiled@acme.test",
            "department_id": ops,
            "sub_department_id": emea,
        })),
        &admin,
        StatusCode::BAD_REQUEST,
    )
    .await;

    let profile = app
        .ok(
            Method::POST,
            "/api/v1/user-profile/create",
            Some(json!({
                "full_name": "Filed",
                "email": "filed@acme.test",
                "department_id": sales,
                "sub_department_id": emea,
            })),
            &admin,
        )
        .await;
    assert_eq!(profile["has_login_access"], false);
    assert_eq!(profile["is_self_registered"], false);

    // Moving department drops the old sub-department.
    let moved = app
        .ok(
            Method::PUT,
            "/api/v1/user-profile/update",
            Some(json!({ "id": profile["id"], "department_id": ops })),
            &admin,
        )
        .await;
    assert_eq!(moved["department_id"], ops);
    assert!(moved["sub_department_id"].is_null());
}

#[tokio::test]
async fn provisioning_emails_credentials_once() {
    let app = TestApp::new().await;
    let admin = app.admin_session().await;

    let profile = app
        .ok(
            Method::POST,
            "/api/v1/user-profile/create",
            Some(json!({ "full_name": "Katherine", "email": "kj@acme.test" })),
            &admin,
        )
        .await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/account/login",
            Some(json!({ "email": "kj@acme.test", "password": PASSWORD })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let provisioned = app
        .ok(
            Method::POST,
            "/api/v1/user-profile/provision-login",
            Some(json!({ "user_id": profile["id"] })),
            &admin,
        )
        .await;
    assert_eq!(provisioned["credentials_emailed"], true);
    assert_eq!(provisioned["profile"]["has_login_access"], true);
    let mail = app.emails.sent_to("kj@acme.test");
    assert_eq!(mail.len(), 1);
    assert!(mail[0].body.contains("Password: "));

    app.fails(
        Method::POST,
        "/api/v1/user-profile/provision-login",
        Some(json!({ "user_id": profile["id"] })),
        &admin,
        StatusCode::BAD_REQUEST,
    )
    .await;
    app.fails(
        Method::POST,
        "/api/v1/user-profile/provision-login",
        Some(json!({ "user_id": admin.user_id })),
        &admin,
        StatusCode::BAD_REQUEST,
    )
    .await;
}

#[tokio::test]
async fn deleting_a_profile_ends_its_access() {
    let app = TestApp::new().await;
    let admin = app.admin_session().await;
    let member = app.member_session(&admin, &["City.View"]).await;

    app.fails(
        Method::DELETE,
        &format!("/api/v1/user-profile/delete?id={}", admin.user_id),
        None,
        &admin,
        StatusCode::BAD_REQUEST,
    )
    .await;

    app.ok(
        Method::DELETE,
        &format!("/api/v1/user-profile/delete?id={}", member.user_id),
        None,
        &admin,
    )
    .await;

    let listed = app
        .ok(Method::GET, "/api/v1/user-profile/get-by-org", None, &admin)
        .await;
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let deleted = app
        .ok(
            Method::GET,
            &format!("/api/v1/user-profile/get-by-id?id={}", member.user_id),
            None,
            &admin,
        )
        .await;
    assert_eq!(deleted["is_deleted"], true);
    assert_eq!(deleted["has_login_access"], false);

    let response = app
        .request(
            Method::POST,
            "/api/v1/account/login",
            Some(json!({ "email": member.email, "password": PASSWORD })),
            None,
        )
        .await;
    let status = response.status();
    let envelope = response_json(response).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED, "{envelope}");
}

#[tokio::test]
async fn assigning_a_role_replaces_the_claims() {
    let app = TestApp::new().await;
    let admin = app.admin_session().await;
    let member = app.member_session(&admin, &["City.View"]).await;

    let asset_view = identity_role(&app, &admin, "Asset.View").await;
    let role = app
        .ok(
            Method::POST,
            "/api/v1/manage-user-roles/create",
            Some(json!({ "name": "Auditor", "details": [{ "identity_role_id": asset_view }] })),
            &admin,
        )
        .await;

    let profile = app
        .ok(
            Method::POST,
            "/api/v1/user-profile/assign-role",
            Some(json!({ "user_id": member.user_id, "manage_user_role_id": role["id"] })),
            &admin,
        )
        .await;
    assert_eq!(profile["manage_user_role_id"], role["id"]);

    let relogged = app.login(&member.email, PASSWORD).await;
    assert_eq!(relogged.roles, ["Asset.View"]);
}
