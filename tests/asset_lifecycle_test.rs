//! Asset registration, transfer, disposal and the approval workflow.

mod common;

use axum::http::{Method, StatusCode};
use base64::Engine as _;
use common::{Session, TestApp};
use sams_api::services::storage::MAX_FILE_BYTES;
use serde_json::{json, Value};

struct Fixture {
    category: i64,
    site: i64,
    area: i64,
    other_site: i64,
}

async fn fixture(app: &TestApp, admin: &Session) -> Fixture {
    let category = app.create("category", json!({ "name": "IT" }), admin).await;
    let site = app.create("site", json!({ "name": "HQ" }), admin).await;
    let area = app
        .create("area", json!({ "name": "Server room", "site_id": site }), admin)
        .await;
    let other_site = app.create("site", json!({ "name": "Warehouse" }), admin).await;
    Fixture {
        category,
        site,
        area,
        other_site,
    }
}

async fn create_laptop(app: &TestApp, admin: &Session, fx: &Fixture) -> Value {
    app.ok(
        Method::POST,
        "/api/v1/asset/create",
        Some(json!({
            "name": "ThinkPad X1",
            "brand": "Lenovo",
            "serial_number": "PF-1234",
            "unit_price": "1499.99",
            "category_id": fx.category,
            "site_id": fx.site,
            "acquisition_date": "2024-03-01",
        })),
        admin,
    )
    .await
}

fn today() -> String {
    chrono::Utc::now().date_naive().to_string()
}

#[tokio::test]
async fn new_asset_is_available_with_resolved_names() {
    let app = TestApp::new().await;
    let admin = app.admin_session().await;
    let fx = fixture(&app, &admin).await;

    let asset = create_laptop(&app, &admin, &fx).await;
    assert_eq!(asset["name"], "ThinkPad X1");
    assert_eq!(asset["category_name"], "IT");
    assert_eq!(asset["site_name"], "HQ");
    assert_eq!(asset["status_name"], "Available");
    assert_eq!(asset["quantity"], 1);
    assert_eq!(asset["is_disposed"], false);

    let history = app
        .ok(
            Method::GET,
            &format!("/api/v1/asset/history?id={}", asset["id"]),
            None,
            &admin,
        )
        .await;
    assert_eq!(history.as_array().unwrap().len(), 1);
    assert_eq!(history[0]["event"], "Created");
}

#[tokio::test]
async fn images_up_to_the_file_limit_are_accepted() {
    let app = TestApp::new().await;
    let admin = app.admin_session().await;
    let fx = fixture(&app, &admin).await;
    let image = base64::engine::general_purpose::STANDARD.encode(vec![0xA5u8; MAX_FILE_BYTES]);

    let asset = app
        .ok(
            Method::POST,
            "/api/v1/asset/create",
            Some(json!({
                "name": "Projector",
                "unit_price": "820.00",
                "category_id": fx.category,
                "site_id": fx.site,
                "image": { "file_name": "projector.png", "content_base64": image },
            })),
            &admin,
        )
        .await;
    let path = asset["image_path"].as_str().expect("image stored");
    assert!(path.ends_with("-projector.png"));
}

#[tokio::test]
async fn asset_references_must_exist() {
    let app = TestApp::new().await;
    let admin = app.admin_session().await;
    let fx = fixture(&app, &admin).await;

    app.fails(
        Method::POST,
        "/api/v1/asset/create",
        Some(json!({
            "name": "Ghost",
            "unit_price": "10",
            "category_id": fx.category + 1000,
            "site_id": fx.site,
        })),
        &admin,
        StatusCode::BAD_REQUEST,
    )
    .await;
    app.fails(
        Method::POST,
        "/api/v1/asset/create",
        Some(json!({
            "name": "Misplaced",
            "unit_price": "10",
            "category_id": fx.category,
            "site_id": fx.other_site,
            "area_id": fx.area,
        })),
        &admin,
        StatusCode::BAD_REQUEST,
    )
    .await;
}

#[tokio::test]
async fn transfer_to_location_then_dispose() {
    let app = TestApp::new().await;
    let admin = app.admin_session().await;
    let fx = fixture(&app, &admin).await;
    let asset = create_laptop(&app, &admin, &fx).await;
    let id = asset["id"].as_i64().unwrap();

    let outcome = app
        .ok(
            Method::POST,
            "/api/v1/asset/transfer",
            Some(json!({
                "asset_id": id,
                "assign_to_type": "Location",
                "site_id": fx.site,
                "area_id": fx.area,
                "transfer_date": today(),
                "note": "Rack 4",
            })),
            &admin,
        )
        .await;
    assert_eq!(outcome["outcome"], "applied");
    assert_eq!(outcome["asset"]["status_name"], "In Use");
    assert_eq!(outcome["asset"]["assignment"]["assign_to_type"], "Location");
    assert_eq!(outcome["asset"]["assignment"]["area_name"], "Server room");

    let disposed = app
        .ok(
            Method::POST,
            "/api/v1/asset/dispose",
            Some(json!({
                "asset_id": id,
                "disposal_method": "Recycled",
                "disposal_date": today(),
                "comment": "End of life",
            })),
            &admin,
        )
        .await;
    assert_eq!(disposed["outcome"], "applied");
    assert_eq!(disposed["asset"]["is_disposed"], true);
    assert_eq!(disposed["asset"]["status_name"], "Disposed");

    // Disposal is terminal.
    app.fails(
        Method::PUT,
        "/api/v1/asset/update",
        Some(json!({ "id": id, "name": "Renamed" })),
        &admin,
        StatusCode::BAD_REQUEST,
    )
    .await;
    app.fails(
        Method::POST,
        "/api/v1/asset/dispose",
        Some(json!({
            "asset_id": id,
            "disposal_method": "Sold",
            "disposal_date": today(),
        })),
        &admin,
        StatusCode::BAD_REQUEST,
    )
    .await;
    let refused = app
        .fails(
            Method::POST,
            "/api/v1/asset/transfer",
            Some(json!({
                "asset_id": id,
                "assign_to_type": "Location",
                "site_id": fx.other_site,
                "transfer_date": today(),
            })),
            &admin,
            StatusCode::BAD_REQUEST,
        )
        .await;
    assert!(refused["message"].as_str().unwrap().contains("already disposed"));

    let events: Vec<String> = app
        .ok(Method::GET, &format!("/api/v1/asset/history?id={id}"), None, &admin)
        .await
        .as_array()
        .unwrap()
        .iter()
        .map(|h| h["event"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(events, ["Disposed", "Transferred", "Created"]);

    let live = app.ok(Method::GET, "/api/v1/asset/get-by-org", None, &admin).await;
    assert!(live.as_array().unwrap().is_empty());
    let all = app
        .ok(
            Method::GET,
            "/api/v1/asset/get-by-org?include_disposed=true",
            None,
            &admin,
        )
        .await;
    assert_eq!(all.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn transfer_rejects_inconsistent_targets() {
    let app = TestApp::new().await;
    let admin = app.admin_session().await;
    let fx = fixture(&app, &admin).await;
    let id = create_laptop(&app, &admin, &fx).await["id"].clone();
    let before = app
        .ok(Method::GET, &format!("/api/v1/asset/get-by-id?id={id}"), None, &admin)
        .await;

    for body in [
        json!({ "asset_id": id, "assign_to_type": "User", "transfer_date": today() }),
        json!({
            "asset_id": id,
            "assign_to_type": "Location",
            "site_id": fx.other_site,
            "area_id": fx.area,
            "transfer_date": today(),
        }),
        json!({
            "asset_id": id,
            "assign_to_type": "Location",
            "site_id": fx.site,
            "transfer_date": "2024-05-10",
            "due_date": "2024-05-01",
        }),
    ] {
        app.fails(
            Method::POST,
            "/api/v1/asset/transfer",
            Some(body),
            &admin,
            StatusCode::BAD_REQUEST,
        )
        .await;
    }

    // Refused transfers leave the assignment and history as they were.
    let after = app
        .ok(Method::GET, &format!("/api/v1/asset/get-by-id?id={id}"), None, &admin)
        .await;
    assert_eq!(after["assignment"], before["assignment"]);
    assert_eq!(after["assignment"]["assign_to_type"], "NotAssigned");
    assert_eq!(after["status_name"], "Available");
    let history = app
        .ok(Method::GET, &format!("/api/v1/asset/history?id={id}"), None, &admin)
        .await;
    assert_eq!(history.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn transfer_to_user_records_the_holder() {
    let app = TestApp::new().await;
    let admin = app.admin_session().await;
    let fx = fixture(&app, &admin).await;
    let id = create_laptop(&app, &admin, &fx).await["id"].clone();

    let outcome = app
        .ok(
            Method::POST,
            "/api/v1/asset/transfer",
            Some(json!({
                "asset_id": id,
                "assign_to_type": "User",
                "user_id": admin.user_id,
                "transfer_date": today(),
            })),
            &admin,
        )
        .await;
    let assignment = &outcome["asset"]["assignment"];
    assert_eq!(assignment["assign_to_type"], "User");
    assert_eq!(assignment["user_id"], admin.user_id.as_str());
    assert!(assignment["site_id"].is_null());
}

#[tokio::test]
async fn approval_workflow_needs_a_second_person() {
    let app = TestApp::with_config(|cfg| {
        cfg.asset_approval_required = true;
        cfg.asset_approval_levels = 1;
    })
    .await;
    let admin = app.admin_session().await;
    let approver = app
        .member_session(&admin, &["Asset.View", "Asset.Approve"])
        .await;
    let fx = fixture(&app, &admin).await;
    let id = create_laptop(&app, &admin, &fx).await["id"].clone();

    let raised = app
        .ok(
            Method::POST,
            "/api/v1/asset/transfer",
            Some(json!({
                "asset_id": id,
                "assign_to_type": "Location",
                "site_id": fx.other_site,
                "transfer_date": today(),
            })),
            &admin,
        )
        .await;
    assert_eq!(raised["outcome"], "pending_approval");
    let request_id = raised["request"]["id"].clone();

    // Nothing moves until the request is approved.
    let asset = app
        .ok(Method::GET, &format!("/api/v1/asset/get-by-id?id={id}"), None, &admin)
        .await;
    assert_eq!(asset["status_name"], "Available");

    let pending = app
        .ok(Method::GET, "/api/v1/asset/pending-requests", None, &approver)
        .await;
    assert_eq!(pending.as_array().unwrap().len(), 1);

    // A second request on the same asset waits for the first.
    app.fails(
        Method::POST,
        "/api/v1/asset/dispose",
        Some(json!({ "asset_id": id, "disposal_method": "Sold", "disposal_date": today() })),
        &admin,
        StatusCode::BAD_REQUEST,
    )
    .await;
    app.fails(
        Method::DELETE,
        &format!("/api/v1/asset/delete?id={id}"),
        None,
        &admin,
        StatusCode::BAD_REQUEST,
    )
    .await;

    app.fails(
        Method::POST,
        "/api/v1/asset/approve",
        Some(json!({ "request_id": request_id })),
        &admin,
        StatusCode::FORBIDDEN,
    )
    .await;

    let decision = app
        .ok(
            Method::POST,
            "/api/v1/asset/approve",
            Some(json!({ "request_id": request_id })),
            &approver,
        )
        .await;
    assert_eq!(decision["request"]["status"], "Approved");
    assert_eq!(decision["asset"]["site_name"], "Warehouse");
    assert_eq!(decision["asset"]["status_name"], "In Use");

    app.fails(
        Method::POST,
        "/api/v1/asset/approve",
        Some(json!({ "request_id": request_id })),
        &approver,
        StatusCode::BAD_REQUEST,
    )
    .await;
}

#[tokio::test]
async fn every_level_needs_a_different_approver() {
    let app = TestApp::with_config(|cfg| {
        cfg.asset_approval_required = true;
        cfg.asset_approval_levels = 2;
    })
    .await;
    let admin = app.admin_session().await;
    let first = app.member_session(&admin, &["Asset.Approve"]).await;
    let second = app.member_session(&admin, &["Asset.Approve"]).await;
    let fx = fixture(&app, &admin).await;
    let id = create_laptop(&app, &admin, &fx).await["id"].clone();

    let raised = app
        .ok(
            Method::POST,
            "/api/v1/asset/transfer",
            Some(json!({
                "asset_id": id,
                "assign_to_type": "Location",
                "site_id": fx.other_site,
                "transfer_date": today(),
            })),
            &admin,
        )
        .await;
    let request_id = raised["request"]["id"].clone();
    assert_eq!(raised["request"]["required_levels"], 2);

    let signed = app
        .ok(
            Method::POST,
            "/api/v1/asset/approve",
            Some(json!({ "request_id": request_id })),
            &first,
        )
        .await;
    assert_eq!(signed["request"]["status"], "Pending");
    assert_eq!(signed["request"]["approved_levels"], 1);
    assert!(signed["asset"].is_null());

    let asset = app
        .ok(Method::GET, &format!("/api/v1/asset/get-by-id?id={id}"), None, &admin)
        .await;
    assert_eq!(asset["status_name"], "Available");
    assert_eq!(asset["assignment"]["assign_to_type"], "NotAssigned");

    app.fails(
        Method::POST,
        "/api/v1/asset/approve",
        Some(json!({ "request_id": request_id })),
        &first,
        StatusCode::BAD_REQUEST,
    )
    .await;

    let decision = app
        .ok(
            Method::POST,
            "/api/v1/asset/approve",
            Some(json!({ "request_id": request_id })),
            &second,
        )
        .await;
    assert_eq!(decision["request"]["status"], "Approved");
    assert_eq!(decision["request"]["approved_levels"], 2);
    assert_eq!(decision["asset"]["site_name"], "Warehouse");
    assert_eq!(decision["asset"]["assignment"]["assign_to_type"], "Location");
}

#[tokio::test]
async fn simultaneous_approvals_apply_the_effect_once() {
    let app = TestApp::with_config(|cfg| {
        cfg.asset_approval_required = true;
        cfg.asset_approval_levels = 1;
    })
    .await;
    let admin = app.admin_session().await;
    let first = app.member_session(&admin, &["Asset.Approve"]).await;
    let second = app.member_session(&admin, &["Asset.Approve"]).await;
    let fx = fixture(&app, &admin).await;
    let id = create_laptop(&app, &admin, &fx).await["id"].clone();

    let raised = app
        .ok(
            Method::POST,
            "/api/v1/asset/transfer",
            Some(json!({
                "asset_id": id,
                "assign_to_type": "Location",
                "site_id": fx.other_site,
                "transfer_date": today(),
            })),
            &admin,
        )
        .await;
    let body = json!({ "request_id": raised["request"]["id"] });

    let (a, b) = tokio::join!(
        app.request(
            Method::POST,
            "/api/v1/asset/approve",
            Some(body.clone()),
            Some(&first.token),
        ),
        app.request(
            Method::POST,
            "/api/v1/asset/approve",
            Some(body.clone()),
            Some(&second.token),
        ),
    );
    let approved = [a.status(), b.status()]
        .iter()
        .filter(|status| **status == StatusCode::OK)
        .count();
    assert_eq!(approved, 1);

    let events: Vec<String> = app
        .ok(Method::GET, &format!("/api/v1/asset/history?id={id}"), None, &admin)
        .await
        .as_array()
        .unwrap()
        .iter()
        .map(|h| h["event"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(events, ["Transferred", "Created"]);
    let pending = app
        .ok(Method::GET, "/api/v1/asset/pending-requests", None, &admin)
        .await;
    assert!(pending.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn rejected_request_leaves_the_asset_alone() {
    let app = TestApp::with_config(|cfg| cfg.asset_approval_required = true).await;
    let admin = app.admin_session().await;
    let approver = app.member_session(&admin, &["Asset.Approve"]).await;
    let fx = fixture(&app, &admin).await;
    let id = create_laptop(&app, &admin, &fx).await["id"].clone();

    let raised = app
        .ok(
            Method::POST,
            "/api/v1/asset/dispose",
            Some(json!({ "asset_id": id, "disposal_method": "Donated", "disposal_date": today() })),
            &admin,
        )
        .await;
    let request_id = raised["request"]["id"].clone();

    let decision = app
        .ok(
            Method::POST,
            "/api/v1/asset/reject",
            Some(json!({ "request_id": request_id, "reason": "Still in warranty" })),
            &approver,
        )
        .await;
    assert_eq!(decision["request"]["status"], "Rejected");
    assert_eq!(decision["request"]["rejection_reason"], "Still in warranty");

    let asset = app
        .ok(Method::GET, &format!("/api/v1/asset/get-by-id?id={id}"), None, &admin)
        .await;
    assert_eq!(asset["is_disposed"], false);
    app.ok(Method::DELETE, &format!("/api/v1/asset/delete?id={id}"), None, &admin)
        .await;
}

#[tokio::test]
async fn approve_role_is_required_to_decide() {
    let app = TestApp::with_config(|cfg| cfg.asset_approval_required = true).await;
    let admin = app.admin_session().await;
    let clerk = app
        .member_session(&admin, &["Asset.View", "Asset.Transfer"])
        .await;

    app.fails(
        Method::POST,
        "/api/v1/asset/approve",
        Some(json!({ "request_id": 1 })),
        &clerk,
        StatusCode::FORBIDDEN,
    )
    .await;
    app.fails(
        Method::POST,
        "/api/v1/asset/create",
        Some(json!({ "name": "x", "unit_price": "1", "category_id": 1, "site_id": 1 })),
        &clerk,
        StatusCode::FORBIDDEN,
    )
    .await;
}

#[tokio::test]
async fn custom_statuses_sit_beside_the_seeded_ones() {
    let app = TestApp::new().await;
    let admin = app.admin_session().await;

    let statuses = app
        .ok(Method::GET, "/api/v1/asset-status/get-by-org", None, &admin)
        .await;
    assert_eq!(statuses.as_array().unwrap().len(), 4);

    let custom = app
        .ok(
            Method::POST,
            "/api/v1/asset-status/create",
            Some(json!({ "name": "Reserved" })),
            &admin,
        )
        .await;
    app.fails(
        Method::POST,
        "/api/v1/asset-status/create",
        Some(json!({ "name": "Available" })),
        &admin,
        StatusCode::BAD_REQUEST,
    )
    .await;
    app.ok(
        Method::DELETE,
        &format!("/api/v1/asset-status/delete?id={}", custom["id"]),
        None,
        &admin,
    )
    .await;

    let seeded = statuses[0]["id"].clone();
    app.fails(
        Method::DELETE,
        &format!("/api/v1/asset-status/delete?id={seeded}"),
        None,
        &admin,
        StatusCode::BAD_REQUEST,
    )
    .await;
}
