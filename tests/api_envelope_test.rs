//! Health probes and the error envelope returned by every endpoint.

mod common;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
};
use common::{response_json, TestApp};
use tower::ServiceExt;

#[tokio::test]
async fn health_reports_the_database() {
    let app = TestApp::new().await;

    let response = app.request(Method::GET, "/health", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["status"], "up");
    assert_eq!(body["database"]["status"], "up");

    let response = app.request(Method::GET, "/health/live", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn protected_routes_need_a_bearer_token() {
    let app = TestApp::new().await;

    for (method, uri) in [
        (Method::GET, "/api/v1/city/get-by-org"),
        (Method::POST, "/api/v1/asset/create"),
        (Method::GET, "/api/v1/account/login-history"),
    ] {
        let response = app.request(method, uri, None, None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
        let envelope = response_json(response).await;
        assert_eq!(envelope["success"], false);
        assert!(envelope["timestamp"].is_string());
    }

    let response = app
        .request(
            Method::GET,
            "/api/v1/city/get-by-org",
            None,
            Some("not-a-jwt"),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn malformed_input_is_a_bad_request() {
    let app = TestApp::new().await;
    let admin = app.admin_session().await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/city/create")
        .header("authorization", format!("Bearer {}", admin.token))
        .header("content-type", "application/json")
        .body(Body::from("{\"name\":"))
        .unwrap();
    let response = app.router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let envelope = response_json(response).await;
    assert_eq!(envelope["success"], false);
    assert_eq!(envelope["error"], "Bad Request");

    let envelope = app
        .fails(
            Method::GET,
            "/api/v1/city/get-by-id?id=abc",
            None,
            &admin,
            StatusCode::BAD_REQUEST,
        )
        .await;
    assert_eq!(envelope["success"], false);
}

#[tokio::test]
async fn missing_rows_are_not_found() {
    let app = TestApp::new().await;
    let admin = app.admin_session().await;

    let envelope = app
        .fails(
            Method::GET,
            "/api/v1/category/get-by-id?id=4242",
            None,
            &admin,
            StatusCode::NOT_FOUND,
        )
        .await;
    assert_eq!(envelope["error"], "Not Found");
    assert!(envelope["message"].as_str().unwrap().contains("4242"));
}
