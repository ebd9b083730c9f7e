//! Runtime settings for the SAMS server.
//!
//! Sources are layered: built-in defaults, `config/default.toml`,
//! `config/<env>.toml`, then `APP__*` environment variables.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::collections::HashSet;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError, ValidationErrors};

const CONFIG_DIR: &str = "config";
const DEV_JWT_SECRET: &str = "sams_development_only_jwt_secret_key_0123456789";
const PLACEHOLDER_SECRETS: [&str; 4] = [
    "changeme",
    "change-me-in-production",
    "your-secret-key",
    "default-secret-key",
];

#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    #[serde(default = "defaults::port")]
    pub port: u16,
    /// `development`, `staging`, `production`, ...
    pub environment: String,
    #[serde(default = "defaults::log_level")]
    #[validate(custom = "check_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_json: bool,
    #[serde(default)]
    pub auto_migrate: bool,

    // Tokens
    #[validate(length(min = 32), custom = "check_jwt_secret")]
    pub jwt_secret: String,
    #[serde(default = "defaults::jwt_issuer")]
    pub jwt_issuer: String,
    #[serde(default = "defaults::jwt_audience")]
    pub jwt_audience: String,
    /// Access token lifetime, seconds
    #[validate(range(min = 60, max = 86400))]
    pub jwt_expiration: usize,
    /// Refresh token lifetime, seconds
    #[validate(range(min = 3600, max = 2592000))]
    pub refresh_token_expiration: usize,

    // CORS
    /// Comma separated
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,
    #[serde(default)]
    pub cors_allow_any_origin: bool,
    #[serde(default)]
    pub cors_allow_credentials: bool,

    // Database pool
    #[serde(default = "defaults::db_max_connections")]
    pub db_max_connections: u32,
    #[serde(default = "defaults::db_min_connections")]
    pub db_min_connections: u32,
    #[serde(default = "defaults::db_connect_timeout_secs")]
    pub db_connect_timeout_secs: u64,
    #[serde(default = "defaults::db_idle_timeout_secs")]
    pub db_idle_timeout_secs: u64,
    #[serde(default = "defaults::db_acquire_timeout_secs")]
    pub db_acquire_timeout_secs: u64,

    #[serde(default = "defaults::event_channel_capacity")]
    #[validate(range(min = 1))]
    pub event_channel_capacity: usize,

    /// Account that receives the `SuperAdmin` claim at login.
    #[serde(default)]
    pub super_admin_email: Option<String>,

    // Asset workflow
    /// Transfers and disposals wait for approval instead of applying at once.
    #[serde(default)]
    pub asset_approval_required: bool,
    #[serde(default = "defaults::asset_approval_levels")]
    #[validate(range(min = 1, max = 3))]
    pub asset_approval_levels: i32,

    #[serde(default = "defaults::otp_ttl_minutes")]
    #[validate(range(min = 1, max = 1440))]
    pub otp_ttl_minutes: i64,
    /// Wrong entries after which a verification code stops working
    #[serde(default = "defaults::otp_max_attempts")]
    #[validate(range(min = 1, max = 20))]
    pub otp_max_attempts: i32,

    #[serde(default = "defaults::file_storage_root")]
    pub file_storage_root: String,

    // Outgoing mail
    /// `log` or `sendgrid`
    #[serde(default = "defaults::email_provider")]
    #[validate(custom = "check_email_provider")]
    pub email_provider: String,
    #[serde(default = "defaults::email_from")]
    #[validate(email)]
    pub email_from: String,
    #[serde(default)]
    pub sendgrid_api_key: Option<String>,
}

impl AppConfig {
    /// Settings with every optional knob at its default.
    pub fn new(
        database_url: String,
        jwt_secret: String,
        jwt_expiration: usize,
        refresh_token_expiration: usize,
        host: String,
        port: u16,
        environment: String,
    ) -> Self {
        Self {
            database_url,
            host,
            port,
            environment,
            log_level: defaults::log_level(),
            log_json: false,
            auto_migrate: false,
            jwt_secret,
            jwt_issuer: defaults::jwt_issuer(),
            jwt_audience: defaults::jwt_audience(),
            jwt_expiration,
            refresh_token_expiration,
            cors_allowed_origins: None,
            cors_allow_any_origin: false,
            cors_allow_credentials: false,
            db_max_connections: defaults::db_max_connections(),
            db_min_connections: defaults::db_min_connections(),
            db_connect_timeout_secs: defaults::db_connect_timeout_secs(),
            db_idle_timeout_secs: defaults::db_idle_timeout_secs(),
            db_acquire_timeout_secs: defaults::db_acquire_timeout_secs(),
            event_channel_capacity: defaults::event_channel_capacity(),
            super_admin_email: None,
            asset_approval_required: false,
            asset_approval_levels: defaults::asset_approval_levels(),
            otp_ttl_minutes: defaults::otp_ttl_minutes(),
            otp_max_attempts: defaults::otp_max_attempts(),
            file_storage_root: defaults::file_storage_root(),
            email_provider: defaults::email_provider(),
            email_from: defaults::email_from(),
            sendgrid_api_key: None,
        }
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    /// Non-blank entries of `cors_allowed_origins`.
    pub fn cors_origins(&self) -> Vec<&str> {
        self.cors_allowed_origins
            .as_deref()
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|origin| !origin.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Development deployments and explicit opt-ins get `CorsLayer::permissive`.
    pub fn should_allow_permissive_cors(&self) -> bool {
        self.is_development() || self.cors_allow_any_origin
    }

    /// Cross-field rules the derive cannot express.
    fn check_deployment(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if self.cors_origins().is_empty() && !self.should_allow_permissive_cors() {
            errors.add(
                "cors_allowed_origins",
                violation(
                    "cors_allowed_origins_required",
                    "outside development set APP__CORS_ALLOWED_ORIGINS or APP__CORS_ALLOW_ANY_ORIGIN=true",
                ),
            );
        }
        if !self.is_development() && self.jwt_secret.trim() == DEV_JWT_SECRET {
            errors.add(
                "jwt_secret",
                violation(
                    "jwt_secret_dev_only",
                    "the development JWT secret is only accepted in development",
                ),
            );
        }
        let sendgrid_key_missing = self
            .sendgrid_api_key
            .as_deref()
            .map_or(true, |key| key.trim().is_empty());
        if self.email_provider.eq_ignore_ascii_case("sendgrid") && sendgrid_key_missing {
            errors.add(
                "sendgrid_api_key",
                violation(
                    "sendgrid_api_key_required",
                    "APP__SENDGRID_API_KEY is required for the sendgrid email provider",
                ),
            );
        }

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] ValidationErrors),
}

mod defaults {
    pub(super) const ENVIRONMENT: &str = "development";
    pub(super) const LOG_LEVEL: &str = "info";
    pub(super) const PORT: u16 = 8080;

    pub(super) fn port() -> u16 {
        PORT
    }
    pub(super) fn log_level() -> String {
        LOG_LEVEL.to_string()
    }
    pub(super) fn jwt_issuer() -> String {
        "sams-auth".to_string()
    }
    pub(super) fn jwt_audience() -> String {
        "sams-api".to_string()
    }
    pub(super) fn db_max_connections() -> u32 {
        16
    }
    pub(super) fn db_min_connections() -> u32 {
        2
    }
    pub(super) fn db_connect_timeout_secs() -> u64 {
        30
    }
    pub(super) fn db_idle_timeout_secs() -> u64 {
        600
    }
    pub(super) fn db_acquire_timeout_secs() -> u64 {
        8
    }
    pub(super) fn event_channel_capacity() -> usize {
        1024
    }
    pub(super) fn asset_approval_levels() -> i32 {
        1
    }
    pub(super) fn otp_ttl_minutes() -> i64 {
        15
    }
    pub(super) fn otp_max_attempts() -> i32 {
        5
    }
    pub(super) fn file_storage_root() -> String {
        "./storage".to_string()
    }
    pub(super) fn email_provider() -> String {
        "log".to_string()
    }
    pub(super) fn email_from() -> String {
        "no-reply@sams.local".to_string()
    }
}

fn violation(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

fn check_log_level(level: &str) -> Result<(), ValidationError> {
    match level.to_ascii_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(violation(
            "log_level",
            "expected one of trace, debug, info, warn, error",
        )),
    }
}

fn check_email_provider(provider: &str) -> Result<(), ValidationError> {
    match provider.to_ascii_lowercase().as_str() {
        "log" | "sendgrid" => Ok(()),
        _ => Err(violation("email_provider", "expected log or sendgrid")),
    }
}

fn check_jwt_secret(secret: &str) -> Result<(), ValidationError> {
    let secret = secret.trim();
    if PLACEHOLDER_SECRETS
        .iter()
        .any(|placeholder| secret.eq_ignore_ascii_case(placeholder))
    {
        return Err(violation(
            "jwt_secret",
            "replace the placeholder JWT secret with a random value",
        ));
    }
    // Rejects repeated-character secrets as well.
    if secret.chars().collect::<HashSet<_>>().len() < 10 {
        return Err(violation(
            "jwt_secret",
            "JWT secret needs at least 10 distinct characters",
        ));
    }
    Ok(())
}

/// Installs the global `tracing` subscriber. `RUST_LOG` overrides `level`.
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| format!("sams_api={},tower_http=debug", level));
    let subscriber = fmt().with_env_filter(EnvFilter::new(directive));
    let _ = if json {
        subscriber.json().try_init()
    } else {
        subscriber.try_init()
    };
}

/// Reads and validates the settings for `RUN_ENV` (or `APP_ENV`).
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| defaults::ENVIRONMENT.to_string());
    info!(environment = %run_env, "loading configuration");
    if !Path::new(CONFIG_DIR).exists() {
        info!(dir = CONFIG_DIR, "no config directory, using defaults and APP__* variables");
    }

    let config = Config::builder()
        .set_default("database_url", "sqlite://sams.db?mode=rwc")?
        .set_default("host", "0.0.0.0")?
        .set_default("port", i64::from(defaults::PORT))?
        .set_default("environment", run_env.as_str())?
        .set_default("log_level", defaults::LOG_LEVEL)?
        .set_default("jwt_expiration", 3600)?
        .set_default("refresh_token_expiration", 604800)?
        .add_source(File::with_name(&format!("{CONFIG_DIR}/default")).required(false))
        .add_source(File::with_name(&format!("{CONFIG_DIR}/{run_env}")).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    // No default secret: it must be supplied explicitly.
    if config.get_string("jwt_secret").is_err() {
        error!("jwt_secret is not configured; set APP__JWT_SECRET");
        return Err(AppConfigError::Load(ConfigError::NotFound(
            "jwt_secret (set APP__JWT_SECRET)".into(),
        )));
    }

    let settings: AppConfig = config.try_deserialize()?;
    settings
        .validate()
        .and_then(|_| settings.check_deployment())
        .map_err(|e| {
            error!(errors = ?e, "invalid configuration");
            AppConfigError::Validation(e)
        })?;

    info!("configuration loaded");
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn production() -> AppConfig {
        AppConfig::new(
            "sqlite::memory:".into(),
            "a8Fq2LmZx9Rt4Vb7Nc1Kd6Hj3Pw5Sy0E".into(),
            3600,
            86_400,
            "127.0.0.1".into(),
            8080,
            "production".into(),
        )
    }

    #[test]
    fn production_needs_cors_origins_or_opt_in() {
        let mut cfg = production();
        assert!(cfg.check_deployment().is_err());

        cfg.cors_allowed_origins = Some(" https://portal.sams.test, ".into());
        assert_eq!(cfg.cors_origins(), ["https://portal.sams.test"]);
        assert!(cfg.check_deployment().is_ok());

        cfg.cors_allowed_origins = None;
        cfg.cors_allow_any_origin = true;
        assert!(cfg.check_deployment().is_ok());
    }

    #[test]
    fn development_secret_is_refused_in_production() {
        let mut cfg = production();
        cfg.cors_allow_any_origin = true;
        cfg.jwt_secret = DEV_JWT_SECRET.into();
        assert!(cfg.check_deployment().is_err());

        cfg.environment = "development".into();
        assert!(cfg.check_deployment().is_ok());
    }

    #[test]
    fn sendgrid_requires_api_key() {
        let mut cfg = production();
        cfg.environment = "development".into();
        cfg.email_provider = "sendgrid".into();
        assert!(cfg.check_deployment().is_err());

        cfg.sendgrid_api_key = Some("SG.test-key".into());
        assert!(cfg.check_deployment().is_ok());
    }

    #[test]
    fn approval_levels_are_bounded() {
        let mut cfg = production();
        assert!(cfg.validate().is_ok());
        cfg.asset_approval_levels = 4;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn weak_jwt_secrets_are_rejected() {
        let mut cfg = production();
        cfg.jwt_secret = "a".repeat(40);
        assert!(cfg.validate().is_err());
        cfg.jwt_secret = "your-secret-key".into();
        assert!(cfg.validate().is_err());
    }
}
