/*!
 * # Authentication and Authorization Module
 *
 * Bearer-token authentication for the SAMS API:
 *
 * - HS256 access/refresh token pairs carrying the caller's organization and role claims
 * - An in-memory revocation list consulted on every validation
 * - `auth_middleware` / `role_middleware` layered onto route groups via [`AuthRouterExt`]
 *
 * Role claims are names from the fixed catalogue in [`catalog`].
 */

use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{Duration as ChronoDuration, Utc};
use dashmap::DashMap;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::errors::{ErrorResponse, ServiceError};

pub mod catalog;
pub mod password;

pub use catalog::{Action, Page, ADMIN, APPLICATION_ROLES, SUPER_ADMIN};

const ACCESS_TOKEN: &str = "access";
const REFRESH_TOKEN: &str = "refresh";

/// Claim structure for JWT tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,              // User id
    pub email: String,
    pub name: String,
    pub org_id: Option<i32>,      // Tenant
    pub roles: Vec<String>,       // Synchronized role-claim set
    pub token_use: String,        // "access" or "refresh"
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
    pub nbf: i64,
    pub iss: String,
    pub aud: String,
}

/// Authenticated principal extracted from a validated access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: String,
    pub name: String,
    pub organization_id: Option<i32>,
    pub roles: Vec<String>,
    pub token_id: String,
    pub expires_at: i64,
}

impl AuthUser {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn is_super_admin(&self) -> bool {
        self.has_role(SUPER_ADMIN)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(ADMIN) || self.is_super_admin()
    }

    /// `SuperAdmin` passes every check; `Admin` passes every check except `SuperAdmin` itself.
    pub fn satisfies(&self, required_role: &str) -> bool {
        if self.is_super_admin() {
            return true;
        }
        if required_role == SUPER_ADMIN {
            return false;
        }
        self.has_role(ADMIN) || self.has_role(required_role)
    }

    fn from_claims(claims: Claims) -> Result<Self, AuthError> {
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidToken)?;
        Ok(Self {
            user_id,
            email: claims.email,
            name: claims.name,
            organization_id: claims.org_id,
            roles: claims.roles,
            token_id: claims.jti,
            expires_at: claims.exp,
        })
    }
}

/// Authentication configuration
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_audience: String,
    pub jwt_issuer: String,
    pub access_token_expiration: Duration,
    pub refresh_token_expiration: Duration,
}

impl AuthConfig {
    pub fn new(
        jwt_secret: String,
        jwt_audience: String,
        jwt_issuer: String,
        access_token_expiration: Duration,
        refresh_token_expiration: Duration,
    ) -> Self {
        Self {
            jwt_secret,
            jwt_audience,
            jwt_issuer,
            access_token_expiration,
            refresh_token_expiration,
        }
    }
}

impl From<&AppConfig> for AuthConfig {
    fn from(cfg: &AppConfig) -> Self {
        Self::new(
            cfg.jwt_secret.clone(),
            cfg.jwt_audience.clone(),
            cfg.jwt_issuer.clone(),
            Duration::from_secs(cfg.jwt_expiration as u64),
            Duration::from_secs(cfg.refresh_token_expiration as u64),
        )
    }
}

/// Identity a token pair is issued for
#[derive(Debug, Clone)]
pub struct TokenSubject {
    pub user_id: Uuid,
    pub email: String,
    pub name: String,
    pub organization_id: Option<i32>,
    pub roles: Vec<String>,
}

/// Token pair response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub refresh_expires_in: i64,
    #[serde(skip)]
    pub access_token_id: String,
}

/// Issues, validates and revokes tokens
#[derive(Debug, Clone)]
pub struct AuthService {
    pub config: AuthConfig,
    revoked_tokens: Arc<DashMap<String, i64>>,
}

impl AuthService {
    pub fn new(config: AuthConfig) -> Self {
        Self {
            config,
            revoked_tokens: Arc::new(DashMap::new()),
        }
    }

    fn sign(&self, claims: &Claims) -> Result<String, AuthError> {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| AuthError::TokenCreation(e.to_string()))
    }

    /// Generate an access/refresh token pair for a subject
    pub fn generate_token(&self, subject: &TokenSubject) -> Result<TokenPair, AuthError> {
        let now = Utc::now();
        let access_exp = now
            + ChronoDuration::from_std(self.config.access_token_expiration)
                .map_err(|_| AuthError::InternalError("Invalid token duration".to_string()))?;
        let refresh_exp = now
            + ChronoDuration::from_std(self.config.refresh_token_expiration)
                .map_err(|_| AuthError::InternalError("Invalid token duration".to_string()))?;

        let access_claims = Claims {
            sub: subject.user_id.to_string(),
            email: subject.email.clone(),
            name: subject.name.clone(),
            org_id: subject.organization_id,
            roles: subject.roles.clone(),
            token_use: ACCESS_TOKEN.to_string(),
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: access_exp.timestamp(),
            nbf: now.timestamp(),
            iss: self.config.jwt_issuer.clone(),
            aud: self.config.jwt_audience.clone(),
        };

        // Refresh tokens carry identity only; roles are reloaded on refresh.
        let refresh_claims = Claims {
            roles: vec![],
            token_use: REFRESH_TOKEN.to_string(),
            jti: Uuid::new_v4().to_string(),
            exp: refresh_exp.timestamp(),
            ..access_claims.clone()
        };

        Ok(TokenPair {
            access_token: self.sign(&access_claims)?,
            refresh_token: self.sign(&refresh_claims)?,
            token_type: "Bearer".to_string(),
            expires_in: self.config.access_token_expiration.as_secs() as i64,
            refresh_expires_in: self.config.refresh_token_expiration.as_secs() as i64,
            access_token_id: access_claims.jti,
        })
    }

    /// Validate signature, issuer, audience, expiry and revocation
    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.config.jwt_issuer.as_str()]);
        validation.set_audience(&[self.config.jwt_audience.as_str()]);
        validation.validate_nbf = true;

        let claims = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &validation,
        )
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        })?
        .claims;

        if self.is_token_revoked(&claims.jti) {
            return Err(AuthError::RevokedToken);
        }

        Ok(claims)
    }

    pub fn validate_access_token(&self, token: &str) -> Result<AuthUser, AuthError> {
        let claims = self.validate_token(token)?;
        if claims.token_use != ACCESS_TOKEN {
            return Err(AuthError::InvalidToken);
        }
        AuthUser::from_claims(claims)
    }

    pub fn validate_refresh_token(&self, token: &str) -> Result<Claims, AuthError> {
        let claims = self.validate_token(token)?;
        if claims.token_use != REFRESH_TOKEN {
            return Err(AuthError::InvalidToken);
        }
        Ok(claims)
    }

    /// Add a token id to the revocation list until it would have expired anyway
    pub fn revoke(&self, jti: &str, expires_at: i64) {
        self.revoked_tokens.insert(jti.to_string(), expires_at);
        self.prune_revoked();
        debug!(jti, "token revoked");
    }

    pub fn revoke_token(&self, token: &str) -> Result<Claims, AuthError> {
        let claims = self.validate_token(token)?;
        self.revoke(&claims.jti, claims.exp);
        Ok(claims)
    }

    fn is_token_revoked(&self, jti: &str) -> bool {
        self.revoked_tokens.contains_key(jti)
    }

    fn prune_revoked(&self) {
        let now = Utc::now().timestamp();
        self.revoked_tokens.retain(|_, exp| *exp > now);
    }
}

/// Authentication error types
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Authentication required")]
    MissingAuth,

    #[error("Invalid authentication token")]
    InvalidToken,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Token has been revoked")]
    RevokedToken,

    #[error("Token creation failed: {0}")]
    TokenCreation(String),

    #[error("Insufficient permissions")]
    InsufficientPermissions,

    #[error("Principal is not a member of any organization")]
    MissingOrganization,

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingAuth | Self::InvalidToken | Self::TokenExpired | Self::RevokedToken => {
                StatusCode::UNAUTHORIZED
            }
            Self::InsufficientPermissions | Self::MissingOrganization => StatusCode::FORBIDDEN,
            Self::TokenCreation(_) | Self::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = if status.is_server_error() {
            warn!(error = %self, "authentication failure");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };
        (status, Json(ErrorResponse::new(status, message))).into_response()
    }
}

impl From<AuthError> for ServiceError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InsufficientPermissions | AuthError::MissingOrganization => {
                ServiceError::Forbidden(err.to_string())
            }
            AuthError::TokenCreation(msg) => ServiceError::JwtError(msg),
            AuthError::InternalError(msg) => ServiceError::InternalError(msg),
            other => ServiceError::Unauthorized(other.to_string()),
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(AuthError::MissingAuth)
    }
}

/// Pull the bearer token out of the `Authorization` header
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Role middleware to check if a user has the required role
pub async fn role_middleware(
    State(required_role): State<String>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let user = request
        .extensions()
        .get::<AuthUser>()
        .ok_or(AuthError::MissingAuth)?;

    if !user.satisfies(&required_role) {
        debug!(user_id = %user.user_id, required_role, "role check failed");
        return Err(AuthError::InsufficientPermissions);
    }

    Ok(next.run(request).await)
}

/// Authentication middleware that validates the bearer token and inserts [`AuthUser`]
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let auth_service = match request.extensions().get::<Arc<AuthService>>() {
        Some(service) => service.clone(),
        None => {
            return AuthError::InternalError("Authentication service not available".into())
                .into_response();
        }
    };

    let user = match bearer_token(request.headers()) {
        Some(token) => auth_service.validate_access_token(token),
        None => Err(AuthError::MissingAuth),
    };

    match user {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

/// Outermost layer: makes the shared [`AuthService`] visible to [`auth_middleware`].
pub async fn provide_auth_service(
    State(auth): State<Arc<AuthService>>,
    mut request: Request,
    next: Next,
) -> Response {
    request.extensions_mut().insert(auth);
    next.run(request).await
}

/// Extension methods for Router to add auth middleware
pub trait AuthRouterExt {
    fn with_auth(self) -> Self;
    fn with_role(self, role: &str) -> Self;
}

impl<S> AuthRouterExt for axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_auth(self) -> Self {
        self.layer(axum::middleware::from_fn(auth_middleware))
    }

    fn with_role(self, role: &str) -> Self {
        self.layer(axum::middleware::from_fn_with_state(
            role.to_string(),
            role_middleware,
        ))
        .with_auth()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn service() -> AuthService {
        AuthService::new(AuthConfig::new(
            "super_secure_jwt_secret_that_is_long_enough_123".into(),
            "sams-api".into(),
            "sams-auth".into(),
            Duration::from_secs(900),
            Duration::from_secs(3600),
        ))
    }

    fn subject(roles: &[&str]) -> TokenSubject {
        TokenSubject {
            user_id: Uuid::new_v4(),
            email: "owner@acme.test".into(),
            name: "Owner".into(),
            organization_id: Some(4),
            roles: roles.iter().map(|r| r.to_string()).collect(),
        }
    }

    #[test]
    fn access_token_round_trips_claims() {
        let auth = service();
        let subject = subject(&["City.View"]);
        let pair = auth.generate_token(&subject).unwrap();

        let user = auth.validate_access_token(&pair.access_token).unwrap();
        assert_eq!(user.user_id, subject.user_id);
        assert_eq!(user.organization_id, Some(4));
        assert_eq!(user.roles, vec!["City.View".to_string()]);
        assert_eq!(user.token_id, pair.access_token_id);
    }

    #[test]
    fn refresh_token_is_not_an_access_token() {
        let auth = service();
        let pair = auth.generate_token(&subject(&[])).unwrap();
        assert_matches!(
            auth.validate_access_token(&pair.refresh_token),
            Err(AuthError::InvalidToken)
        );
        assert!(auth.validate_refresh_token(&pair.refresh_token).is_ok());
    }

    #[test]
    fn revoked_token_is_rejected() {
        let auth = service();
        let pair = auth.generate_token(&subject(&[])).unwrap();
        auth.revoke_token(&pair.access_token).unwrap();
        assert_matches!(
            auth.validate_access_token(&pair.access_token),
            Err(AuthError::RevokedToken)
        );
    }

    #[test]
    fn token_from_other_issuer_is_rejected() {
        let auth = service();
        let mut other_config = auth.config.clone();
        other_config.jwt_issuer = "someone-else".into();
        let other = AuthService::new(other_config);
        let pair = other.generate_token(&subject(&[])).unwrap();
        assert_matches!(
            auth.validate_access_token(&pair.access_token),
            Err(AuthError::InvalidToken)
        );
    }

    #[test]
    fn administrative_roles_satisfy_page_roles() {
        let auth = service();
        let pair = auth.generate_token(&subject(&[ADMIN])).unwrap();
        let admin = auth.validate_access_token(&pair.access_token).unwrap();
        assert!(admin.satisfies("Asset.Approve"));
        assert!(!admin.satisfies(SUPER_ADMIN));

        let pair = auth.generate_token(&subject(&[SUPER_ADMIN])).unwrap();
        let root = auth.validate_access_token(&pair.access_token).unwrap();
        assert!(root.satisfies(SUPER_ADMIN));

        let pair = auth.generate_token(&subject(&["City.View"])).unwrap();
        let viewer = auth.validate_access_token(&pair.access_token).unwrap();
        assert!(viewer.satisfies("City.View"));
        assert!(!viewer.satisfies("City.Create"));
    }

    #[test]
    fn bearer_token_requires_scheme() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Basic abc".parse().unwrap());
        assert_eq!(bearer_token(&headers), None);
        headers.insert(header::AUTHORIZATION, "Bearer abc.def".parse().unwrap());
        assert_eq!(bearer_token(&headers), Some("abc.def"));
    }
}
