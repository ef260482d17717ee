//! Outbound delivery over a generic webhook.

use async_trait::async_trait;
use gantry_core::ports::NotificationTransport;
use gantry_core::{Error, Result};
use serde::Serialize;
use tracing::{debug, info};

#[derive(Debug, Serialize)]
struct WebhookMessage<'a> {
    subject: &'a str,
    recipient: &'a str,
    body: &'a str,
}

/// Posts consolidated notifications to a configured webhook endpoint.
pub struct WebhookTransport {
    url: String,
    client: reqwest::Client,
}

impl WebhookTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl NotificationTransport for WebhookTransport {
    async fn send(&self, subject: &str, recipient: &str, body: &str) -> Result<()> {
        debug!(url = %self.url, subject, "Sending webhook notification");

        let message = WebhookMessage {
            subject,
            recipient,
            body,
        };
        let response = self
            .client
            .post(&self.url)
            .json(&message)
            .send()
            .await
            .map_err(|e| Error::Notify(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(Error::Notify(format!(
                "webhook returned {}: {}",
                status, text
            )));
        }

        info!(subject, "Notification delivered");
        Ok(())
    }
}
