#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::{self, Body},
    http::{Method, Request, StatusCode},
    middleware,
    response::Response,
    Router,
};
use fake::{faker::company::en::CompanyName, faker::name::en::Name, Fake};
use once_cell::sync::Lazy;
use regex::Regex;
use sams_api::{
    auth::{AuthConfig, AuthService},
    config::AppConfig,
    db,
    errors::ServiceError,
    events::{self, EventSender},
    handlers::{health, AppServices},
    services::{email::EmailSender, storage::LocalFileStorage},
    AppState,
};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::sync::mpsc;
use tower::ServiceExt;

pub const PASSWORD: &str = "Sup3r-Secret!";
pub const SUPER_ADMIN_EMAIL: &str = "operator@sams.test";

static CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d{6})\b").unwrap());

#[derive(Debug, Clone)]
pub struct SentEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Keeps every message instead of delivering it.
#[derive(Default)]
pub struct RecordingEmailSender {
    sent: Mutex<Vec<SentEmail>>,
}

impl RecordingEmailSender {
    pub fn sent_to(&self, to: &str) -> Vec<SentEmail> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.to == to)
            .cloned()
            .collect()
    }

    /// Most recent verification code mailed to `to`.
    pub fn latest_code(&self, to: &str) -> Option<String> {
        self.sent_to(to)
            .iter()
            .rev()
            .find_map(|m| CODE.captures(&m.body).map(|c| c[1].to_string()))
    }
}

#[async_trait]
impl EmailSender for RecordingEmailSender {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<bool, ServiceError> {
        self.sent.lock().unwrap().push(SentEmail {
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(true)
    }
}

/// Signed-in caller.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub refresh_token: String,
    pub user_id: String,
    pub organization_id: i64,
    pub email: String,
    pub roles: Vec<String>,
}

/// Application backed by a throwaway SQLite file and local file storage.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub emails: Arc<RecordingEmailSender>,
    _dir: TempDir,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    pub async fn with_config(configure: impl FnOnce(&mut AppConfig)) -> Self {
        let dir = tempfile::tempdir().expect("temp dir");
        let db_path = dir.path().join("sams_test.db");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            "test_secret_key_for_testing_purposes_only_32chars".to_string(),
            3600,
            86_400,
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.db_max_connections = 4;
        cfg.db_min_connections = 1;
        cfg.super_admin_email = Some(SUPER_ADMIN_EMAIL.to_string());
        cfg.file_storage_root = dir.path().join("files").display().to_string();
        configure(&mut cfg);

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db_arc = Arc::new(pool);
        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = Arc::new(EventSender::new(event_tx));
        let event_task = tokio::spawn(events::process_events(event_rx));

        let auth_service = Arc::new(AuthService::new(AuthConfig::from(&cfg)));
        let emails = Arc::new(RecordingEmailSender::default());
        let logger = sams_api::logging::setup_logger(sams_api::logging::LoggerConfig::quiet());

        let services = AppServices::new(
            db_arc.clone(),
            event_sender,
            auth_service.clone(),
            emails.clone(),
            Arc::new(LocalFileStorage::new(cfg.file_storage_root.clone())),
            &cfg,
            &logger,
        );
        services
            .roles
            .generate_roles_from_fixed_list()
            .await
            .expect("seed identity roles");

        let state = AppState {
            db: db_arc,
            config: cfg,
            auth: auth_service.clone(),
            services,
        };

        let router = Router::new()
            .merge(health::health_routes())
            .nest("/api/v1", sams_api::api_v1_routes())
            .layer(middleware::from_fn_with_state(
                auth_service,
                sams_api::auth::provide_auth_service,
            ))
            .with_state(state.clone());

        Self {
            router,
            state,
            emails,
            _dir: dir,
            _event_task: event_task,
        }
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Request that must succeed; returns the `data` of the envelope.
    pub async fn ok(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        session: &Session,
    ) -> Value {
        let response = self.request(method, uri, body, Some(&session.token)).await;
        let status = response.status();
        let envelope = response_json(response).await;
        assert_eq!(status, StatusCode::OK, "{uri} failed: {envelope}");
        assert_eq!(envelope["success"], true);
        envelope["data"].clone()
    }

    /// Request that must fail with `expected`; returns the error envelope.
    pub async fn fails(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        session: &Session,
        expected: StatusCode,
    ) -> Value {
        let response = self.request(method, uri, body, Some(&session.token)).await;
        let status = response.status();
        let envelope = response_json(response).await;
        assert_eq!(status, expected, "{uri} returned {envelope}");
        envelope
    }

    /// Registers a new organization and confirms the owner's email.
    pub async fn register(&self, email: &str) -> Value {
        let org: String = CompanyName().fake();
        let name: String = Name().fake();
        let response = self
            .request(
                Method::POST,
                "/api/v1/account/register",
                Some(json!({
                    "full_name": name,
                    "email": email,
                    "password": PASSWORD,
                    "organization_name": org,
                })),
                None,
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let registered = response_json(response).await["data"].clone();

        let code = self
            .emails
            .latest_code(email)
            .expect("verification code emailed");
        let response = self
            .request(
                Method::POST,
                "/api/v1/account/email-confirmation",
                Some(json!({ "email": email, "code": code })),
                None,
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        registered
    }

    pub async fn login(&self, email: &str, password: &str) -> Session {
        let response = self
            .request(
                Method::POST,
                "/api/v1/account/login",
                Some(json!({ "email": email, "password": password })),
                None,
            )
            .await;
        let status = response.status();
        let envelope = response_json(response).await;
        assert_eq!(status, StatusCode::OK, "login failed: {envelope}");
        let data = &envelope["data"];
        Session {
            token: data["tokens"]["access_token"].as_str().unwrap().to_string(),
            refresh_token: data["tokens"]["refresh_token"].as_str().unwrap().to_string(),
            user_id: data["user"]["id"].as_str().unwrap().to_string(),
            organization_id: data["user"]["organization_id"].as_i64().unwrap(),
            email: email.to_string(),
            roles: data["roles"]
                .as_array()
                .unwrap()
                .iter()
                .map(|r| r.as_str().unwrap().to_string())
                .collect(),
        }
    }

    /// Fresh organization whose owner is signed in as `Admin`.
    pub async fn admin_session(&self) -> Session {
        let email = format!("owner-{}@acme.test", uuid::Uuid::new_v4().simple());
        self.register(&email).await;
        self.login(&email, PASSWORD).await
    }

    /// Employee of the admin's organization holding a role made of `grants`.
    pub async fn member_session(&self, admin: &Session, grants: &[&str]) -> Session {
        let identity_roles = self
            .ok(
                Method::GET,
                "/api/v1/manage-user-roles/identity-roles",
                None,
                admin,
            )
            .await;
        let details: Vec<Value> = grants
            .iter()
            .map(|grant| {
                let id = identity_roles
                    .as_array()
                    .unwrap()
                    .iter()
                    .find(|r| r["name"] == *grant)
                    .unwrap_or_else(|| panic!("identity role {grant} seeded"))["id"]
                    .clone();
                json!({ "identity_role_id": id, "is_allowed": true })
            })
            .collect();
        let role = self
            .ok(
                Method::POST,
                "/api/v1/manage-user-roles/create",
                Some(json!({
                    "name": format!("role-{}", uuid::Uuid::new_v4().simple()),
                    "details": details,
                })),
                admin,
            )
            .await;

        let email = format!("member-{}@acme.test", uuid::Uuid::new_v4().simple());
        let name: String = Name().fake();
        let profile = self
            .ok(
                Method::POST,
                "/api/v1/user-profile/create",
                Some(json!({
                    "full_name": name,
                    "email": email,
                    "manage_user_role_id": role["id"],
                })),
                admin,
            )
            .await;
        self.ok(
            Method::POST,
            "/api/v1/user-profile/provision-login",
            Some(json!({ "user_id": profile["id"], "password": PASSWORD })),
            admin,
        )
        .await;
        self.login(&email, PASSWORD).await
    }

    /// Creates `/<slug>/create` with `body` and returns the new id.
    pub async fn create(&self, slug: &str, body: Value, session: &Session) -> i64 {
        let created = self
            .ok(
                Method::POST,
                &format!("/api/v1/{slug}/create"),
                Some(body),
                session,
            )
            .await;
        created["id"].as_i64().expect("created id")
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}
