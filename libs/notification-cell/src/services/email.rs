use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, error, info};

use shared_config::AppConfig;

use crate::models::{EmailMessage, NotificationError};

#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), NotificationError>;
}

/// Transactional email API client (`POST {EMAIL_API_URL}` with a bearer key).
pub struct HttpEmailSender {
    client: Client,
    api_url: String,
    api_key: String,
}

// Manual impl so the API key never ends up in `{:?}` output.
impl std::fmt::Debug for HttpEmailSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpEmailSender")
            .field("api_url", &self.api_url)
            .finish_non_exhaustive()
    }
}

impl HttpEmailSender {
    pub fn new(config: &AppConfig) -> Result<Self, NotificationError> {
        if !config.is_email_configured() {
            return Err(NotificationError::NotConfigured);
        }

        Ok(Self {
            client: Client::new(),
            api_url: config.email_api_url.clone(),
            api_key: config.email_api_key.clone(),
        })
    }
}

#[async_trait]
impl EmailSender for HttpEmailSender {
    async fn send(&self, message: &EmailMessage) -> Result<(), NotificationError> {
        debug!("Sending email '{}' to {}", message.subject, message.to);

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&json!({
                "from": message.from,
                "to": [message.to],
                "subject": message.subject,
                "html": message.html,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Email API returned {}: {}", status, body);
            return Err(NotificationError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        Ok(())
    }
}

const OUTBOX_LIMIT: usize = 100;

/// Stand-in used when no email API is configured. Logs each message and
/// keeps the most recent ones for inspection.
#[derive(Default)]
pub struct LoggingEmailSender {
    outbox: Mutex<VecDeque<EmailMessage>>,
}

impl LoggingEmailSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<EmailMessage> {
        self.outbox
            .lock()
            .map(|outbox| outbox.iter().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl EmailSender for LoggingEmailSender {
    async fn send(&self, message: &EmailMessage) -> Result<(), NotificationError> {
        info!("Email delivery disabled, not sending '{}' to {}", message.subject, message.to);

        let mut outbox = self.outbox.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if outbox.len() == OUTBOX_LIMIT {
            outbox.pop_front();
        }
        outbox.push_back(message.clone());
        Ok(())
    }
}
