//! Outbound email.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use crate::config::AppConfig;
use crate::errors::ServiceError;

const SENDGRID_API_BASE: &str = "https://api.sendgrid.com";

#[async_trait]
pub trait EmailSender: Send + Sync {
    /// `Ok(false)` when the provider declined the message.
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<bool, ServiceError>;
}

/// Writes messages to the log instead of delivering them.
#[derive(Debug, Clone, Default)]
pub struct LogEmailSender;

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<bool, ServiceError> {
        info!(to, subject, body_len = body.len(), "email (log provider)");
        Ok(true)
    }
}

/// SendGrid v3 mail-send client.
#[derive(Debug, Clone)]
pub struct SendGridEmailSender {
    client: Client,
    api_key: String,
    from: String,
    base_url: String,
}

impl SendGridEmailSender {
    pub fn new(api_key: String, from: String) -> Result<Self, ServiceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| ServiceError::InternalError(format!("email client: {e}")))?;
        Ok(Self::with_client(client, api_key, from, SENDGRID_API_BASE))
    }

    /// Build from an existing client and base URL (used by tests).
    pub fn with_client(
        client: Client,
        api_key: String,
        from: String,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_key,
            from,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl EmailSender for SendGridEmailSender {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<bool, ServiceError> {
        let payload = json!({
            "personalizations": [{ "to": [{ "email": to }] }],
            "from": { "email": self.from },
            "subject": subject,
            "content": [{ "type": "text/plain", "value": body }],
        });

        let response = self
            .client
            .post(format!("{}/v3/mail/send", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "SendGrid request failed");
                ServiceError::ExternalServiceError(e.to_string())
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(true);
        }
        error!(status = status.as_u16(), to, "SendGrid declined message");
        Ok(false)
    }
}

/// Provider selected by `email_provider`.
pub fn email_sender_from_config(config: &AppConfig) -> Result<Arc<dyn EmailSender>, ServiceError> {
    match config.email_provider.as_str() {
        "sendgrid" => {
            let api_key = config.sendgrid_api_key.clone().ok_or_else(|| {
                ServiceError::InternalError("sendgrid_api_key is not configured".into())
            })?;
            Ok(Arc::new(SendGridEmailSender::new(
                api_key,
                config.email_from.clone(),
            )?))
        }
        _ => Ok(Arc::new(LogEmailSender)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sender(server: &MockServer) -> SendGridEmailSender {
        SendGridEmailSender::with_client(
            Client::new(),
            "SG.test".into(),
            "no-reply@sams.local".into(),
            server.uri(),
        )
    }

    #[tokio::test]
    async fn sendgrid_accepted_message_reports_true() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v3/mail/send"))
            .and(header("authorization", "Bearer SG.test"))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        let delivered = sender(&server)
            .send("user@acme.test", "Verify your email", "Your code is 123456")
            .await
            .unwrap();
        assert!(delivered);
    }

    #[tokio::test]
    async fn sendgrid_rejection_reports_false() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v3/mail/send"))
            .respond_with(ResponseTemplate::new(400))
            .mount(&server)
            .await;

        let delivered = sender(&server)
            .send("user@acme.test", "subject", "body")
            .await
            .unwrap();
        assert!(!delivered);
    }

    #[tokio::test]
    async fn log_sender_always_delivers() {
        assert!(LogEmailSender.send("a@b.c", "s", "b").await.unwrap());
    }
}
