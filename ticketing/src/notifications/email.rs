//! Transactional-email API notifier.
//!
//! Posts `{from, to, subject, text}` as JSON with a bearer API key, the shape
//! accepted by the common hosted providers.

use super::{ConfirmationMessage, NotificationError, Notifier};
use crate::config::EmailConfig;
use futures::future::BoxFuture;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

/// Sends confirmations through an HTTP email API.
#[derive(Clone)]
pub struct HttpEmailNotifier {
    client: Client,
    api_url: String,
    api_key: String,
    from_address: String,
}

impl HttpEmailNotifier {
    /// Builds the notifier from configuration.
    ///
    /// # Errors
    ///
    /// [`NotificationError::Configuration`] if no API key is configured or
    /// the HTTP client cannot be built.
    pub fn new(config: &EmailConfig) -> Result<Self, NotificationError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| NotificationError::Configuration("missing API key".to_string()))?;
        Self::with_timeout(&config.api_url, &api_key, &config.from_address, config.timeout())
    }

    /// Builds the notifier with explicit settings.
    ///
    /// # Errors
    ///
    /// [`NotificationError::Configuration`] if the HTTP client cannot be built.
    pub fn with_timeout(
        api_url: &str,
        api_key: &str,
        from_address: &str,
        timeout: Duration,
    ) -> Result<Self, NotificationError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                NotificationError::Configuration(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            api_url: api_url.to_string(),
            api_key: api_key.to_string(),
            from_address: from_address.to_string(),
        })
    }
}

impl Notifier for HttpEmailNotifier {
    fn send<'a>(
        &'a self,
        message: &'a ConfirmationMessage,
    ) -> BoxFuture<'a, Result<(), NotificationError>> {
        Box::pin(async move {
            let response = self
                .client
                .post(&self.api_url)
                .bearer_auth(&self.api_key)
                .json(&json!({
                    "from": self.from_address,
                    "to": [message.to],
                    "subject": message.subject,
                    "text": message.body,
                }))
                .send()
                .await
                .map_err(|e| NotificationError::Transport(e.to_string()))?;

            let status = response.status();
            if status.is_success() {
                tracing::debug!(reference = %message.reference, "Confirmation email accepted");
                Ok(())
            } else {
                let body = response.text().await.unwrap_or_default();
                Err(NotificationError::Rejected(format!(
                    "{status}: {}",
                    body.chars().take(200).collect::<String>()
                )))
            }
        })
    }
}
