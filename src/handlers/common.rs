use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::request::Parts,
    routing::MethodRouter,
    Json, Router,
};
use serde::de::DeserializeOwned;

use crate::auth::catalog::{Action, Page, SUPER_ADMIN};
use crate::auth::AuthRouterExt;
use crate::errors::ApiError;
use crate::{ApiResponse, AppState};

/// `Json` whose rejection uses the standard error envelope.
#[derive(Debug, Clone, Copy, Default)]
pub struct AppJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for AppJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

/// `Query` whose rejection uses the standard error envelope.
#[derive(Debug, Clone, Copy, Default)]
pub struct AppQuery<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for AppQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

/// Envelope for operations that return nothing but a confirmation.
pub fn done(message: impl Into<String>) -> Json<ApiResponse<()>> {
    Json(ApiResponse::message(message.into()))
}

/// Handlers of one reference-data resource.
pub struct CrudRoutes {
    pub create: MethodRouter<AppState>,
    pub update: MethodRouter<AppState>,
    pub get_by_id: MethodRouter<AppState>,
    pub get_by_org: MethodRouter<AppState>,
    pub get_all: MethodRouter<AppState>,
    pub delete: MethodRouter<AppState>,
}

/// Mounts `/<slug>/{create,update,get-by-id,get-by-org,get-all,delete}`, each
/// gated by the matching `<Page>.<Action>` role; `get-all` needs SuperAdmin.
pub fn crud_routes(slug: &str, page: Page, handlers: CrudRoutes) -> Router<AppState> {
    let view = Router::new()
        .route(&format!("/{slug}/get-by-id"), handlers.get_by_id)
        .route(&format!("/{slug}/get-by-org"), handlers.get_by_org)
        .with_role(&page.role(Action::View));
    let create = Router::new()
        .route(&format!("/{slug}/create"), handlers.create)
        .with_role(&page.role(Action::Create));
    let edit = Router::new()
        .route(&format!("/{slug}/update"), handlers.update)
        .with_role(&page.role(Action::Edit));
    let delete = Router::new()
        .route(&format!("/{slug}/delete"), handlers.delete)
        .with_role(&page.role(Action::Delete));
    let all = Router::new()
        .route(&format!("/{slug}/get-all"), handlers.get_all)
        .with_role(SUPER_ADMIN);

    Router::new()
        .merge(view)
        .merge(create)
        .merge(edit)
        .merge(delete)
        .merge(all)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::StatusCode, response::IntoResponse, routing::post, Router};
    use serde::Deserialize;
    use tower::ServiceExt;

    #[derive(Deserialize)]
    struct Payload {
        name: String,
    }

    async fn echo(AppJson(payload): AppJson<Payload>) -> String {
        payload.name
    }

    #[tokio::test]
    async fn malformed_json_is_a_bad_request_envelope() {
        let app = Router::new().route("/echo", post(echo));
        let response = app
            .oneshot(
                axum::http::Request::post("/echo")
                    .header("content-type", "application/json")
                    .body(Body::from("{\"name\":"))
                    .unwrap(),
            )
            .await
            .unwrap()
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let envelope: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(envelope["success"], false);
    }
}
