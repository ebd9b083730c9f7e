//! Registration, email verification and session lifecycle.

mod common;

use axum::http::{Method, StatusCode};
use common::{response_json, TestApp, PASSWORD};
use serde_json::{json, Value};

async fn post(app: &TestApp, uri: &str, body: Value) -> (StatusCode, Value) {
    let response = app.request(Method::POST, uri, Some(body), None).await;
    let status = response.status();
    (status, response_json(response).await)
}

fn registration(email: &str) -> Value {
    json!({
        "full_name": "Grace Hopper",
        "email": email,
        "password": PASSWORD,
        "organization_name": "Acme Holdings",
        "phone": "+971 4 000 0000",
    })
}

#[tokio::test]
async fn registration_requires_email_confirmation_before_login() {
    let app = TestApp::new().await;
    let email = "grace@acme.test";

    let (status, envelope) = post(&app, "/api/v1/account/register", registration(email)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(envelope["data"]["verification_sent"], true);
    assert_eq!(envelope["data"]["user"]["is_org_admin"], true);
    assert_eq!(envelope["data"]["user"]["email_confirmed"], false);

    let (status, envelope) = post(
        &app,
        "/api/v1/account/login",
        json!({ "email": email, "password": PASSWORD }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{envelope}");

    let (status, _) = post(
        &app,
        "/api/v1/account/email-confirmation",
        json!({ "email": email, "code": "000000" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let code = app.emails.latest_code(email).expect("code emailed");
    let (status, envelope) = post(
        &app,
        "/api/v1/account/email-confirmation",
        json!({ "email": email, "code": code }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(envelope["data"]["email_confirmed"], true);

    let session = app.login(email, PASSWORD).await;
    assert_eq!(session.roles, ["Admin"]);
}

#[tokio::test]
async fn resent_code_replaces_the_previous_one() {
    let app = TestApp::new().await;
    let email = "linus@acme.test";
    post(&app, "/api/v1/account/register", registration(email)).await;
    let first = app.emails.latest_code(email).unwrap();

    let (status, envelope) = post(
        &app,
        "/api/v1/account/send-email-verification-code",
        json!({ "email": email }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(envelope["data"], true);
    assert_eq!(app.emails.sent_to(email).len(), 2);
    let second = app.emails.latest_code(email).unwrap();

    if first != second {
        let (status, _) = post(
            &app,
            "/api/v1/account/email-confirmation",
            json!({ "email": email, "code": first }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
    let (status, _) = post(
        &app,
        "/api/v1/account/email-confirmation",
        json!({ "email": email, "code": second }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = post(
        &app,
        "/api/v1/account/send-email-verification-code",
        json!({ "email": email }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn repeated_wrong_codes_retire_the_code() {
    let app = TestApp::with_config(|cfg| cfg.otp_max_attempts = 3).await;
    let email = "grace@acme.test";
    post(&app, "/api/v1/account/register", registration(email)).await;
    let code = app.emails.latest_code(email).unwrap();
    let wrong = if code == "000000" { "111111" } else { "000000" };

    for attempt in 1..=3 {
        let (status, envelope) = post(
            &app,
            "/api/v1/account/email-confirmation",
            json!({ "email": email, "code": wrong }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let message = envelope["message"].as_str().unwrap();
        assert_eq!(message.contains("Too many"), attempt == 3, "{message}");
    }

    // The correct code no longer works once retired.
    let (status, _) = post(
        &app,
        "/api/v1/account/email-confirmation",
        json!({ "email": email, "code": code }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post(
        &app,
        "/api/v1/account/send-email-verification-code",
        json!({ "email": email }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let fresh = app.emails.latest_code(email).unwrap();
    let (status, _) = post(
        &app,
        "/api/v1/account/email-confirmation",
        json!({ "email": email, "code": fresh }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn duplicate_email_is_rejected_case_insensitively() {
    let app = TestApp::new().await;
    app.register("ada@acme.test").await;

    let (status, envelope) =
        post(&app, "/api/v1/account/register", registration("ADA@acme.test")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(envelope["success"], false);
}

#[tokio::test]
async fn registration_validates_its_payload() {
    let app = TestApp::new().await;
    let mut body = registration("short@acme.test");
    body["password"] = json!("short");
    let (status, _) = post(&app, "/api/v1/account/register", body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post(&app, "/api/v1/account/register", registration("not-an-email")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn bad_credentials_are_unauthorized() {
    let app = TestApp::new().await;
    app.register("alan@acme.test").await;

    for (email, password) in [
        ("alan@acme.test", "wrong-password"),
        ("nobody@acme.test", PASSWORD),
    ] {
        let (status, envelope) = post(
            &app,
            "/api/v1/account/login",
            json!({ "email": email, "password": password }),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(envelope["success"], false);
    }
}

#[tokio::test]
async fn refresh_rotates_the_token_pair() {
    let app = TestApp::new().await;
    let admin = app.admin_session().await;

    let (status, envelope) = post(
        &app,
        "/api/v1/account/refresh-token",
        json!({ "refresh_token": admin.refresh_token }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let fresh = envelope["data"]["access_token"].as_str().unwrap().to_string();
    assert_eq!(envelope["data"]["token_type"], "Bearer");

    let response = app
        .request(Method::GET, "/api/v1/city/get-by-org", None, Some(&fresh))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let (status, _) = post(
        &app,
        "/api/v1/account/refresh-token",
        json!({ "refresh_token": admin.refresh_token }),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = post(
        &app,
        "/api/v1/account/refresh-token",
        json!({ "refresh_token": admin.token }),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_revokes_the_access_token_and_closes_the_session() {
    let app = TestApp::new().await;
    let admin = app.admin_session().await;

    let history = app
        .ok(Method::GET, "/api/v1/account/login-history", None, &admin)
        .await;
    assert_eq!(history.as_array().unwrap().len(), 1);
    assert!(history[0]["logout_at"].is_null());

    app.ok(Method::POST, "/api/v1/account/logout", None, &admin).await;

    let response = app
        .request(
            Method::GET,
            "/api/v1/account/login-history",
            None,
            Some(&admin.token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let again = app.login(&admin.email, PASSWORD).await;
    let history = app
        .ok(Method::GET, "/api/v1/account/login-history", None, &again)
        .await;
    assert_eq!(history.as_array().unwrap().len(), 2);
    assert!(history[1]["logout_at"].is_string());
}

#[tokio::test]
async fn login_history_of_others_needs_profile_access() {
    let app = TestApp::new().await;
    let admin = app.admin_session().await;
    let member = app.member_session(&admin, &["City.View"]).await;

    let others = app
        .ok(
            Method::GET,
            &format!("/api/v1/account/login-history?user_id={}", member.user_id),
            None,
            &admin,
        )
        .await;
    assert_eq!(others.as_array().unwrap().len(), 1);

    app.fails(
        Method::GET,
        &format!("/api/v1/account/login-history?user_id={}", admin.user_id),
        None,
        &member,
        StatusCode::FORBIDDEN,
    )
    .await;
}
