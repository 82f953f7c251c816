use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::EmailConfig;

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("email API error: {0}")]
    Api(String),
    #[error("email transport error: {0}")]
    Transport(String),
}

#[derive(Debug, Error)]
pub enum NewsletterError {
    #[error("invalid email address")]
    InvalidEmail,
    #[error("already subscribed")]
    AlreadySubscribed,
    #[error("newsletter API error: {0}")]
    Api(String),
}

/// A single transactional message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailMessage {
    pub to: String,
    pub from: String,
    pub subject: String,
    pub html_body: String,
}

/// Transactional email API client.
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError>;
}

/// Newsletter API client.
#[async_trait]
pub trait NewsletterClient: Send + Sync {
    async fn subscribe(&self, email: &str, name: Option<&str>) -> Result<(), NewsletterError>;
}

/// reqwest-backed transactional email client.
pub struct HttpEmailClient {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl HttpEmailClient {
    pub fn new(cfg: &EmailConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: cfg.api_url.trim_end_matches('/').to_string(),
            api_key: cfg.api_key.clone(),
        }
    }
}

#[async_trait]
impl EmailSender for HttpEmailClient {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
        let response = self
            .client
            .post(format!("{}/v1/send", self.api_url))
            .bearer_auth(&self.api_key)
            .json(message)
            .send()
            .await
            .map_err(|e| EmailError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EmailError::Api(format!("{status}: {body}")));
        }

        Ok(())
    }
}

#[derive(Serialize)]
struct SubscribeBody<'a> {
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

/// reqwest-backed newsletter client.
pub struct HttpNewsletterClient {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl HttpNewsletterClient {
    pub fn new(cfg: &EmailConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: cfg.newsletter_api_url.trim_end_matches('/').to_string(),
            api_key: cfg.newsletter_api_key.clone(),
        }
    }
}

#[async_trait]
impl NewsletterClient for HttpNewsletterClient {
    async fn subscribe(&self, email: &str, name: Option<&str>) -> Result<(), NewsletterError> {
        let response = self
            .client
            .post(format!("{}/v1/subscribers", self.api_url))
            .bearer_auth(&self.api_key)
            .json(&SubscribeBody { email, name })
            .send()
            .await
            .map_err(|e| NewsletterError::Api(e.to_string()))?;

        match response.status() {
            s if s.is_success() => Ok(()),
            reqwest::StatusCode::CONFLICT => Err(NewsletterError::AlreadySubscribed),
            reqwest::StatusCode::BAD_REQUEST | reqwest::StatusCode::UNPROCESSABLE_ENTITY => {
                Err(NewsletterError::InvalidEmail)
            }
            s => {
                let body = response.text().await.unwrap_or_default();
                Err(NewsletterError::Api(format!("{s}: {body}")))
            }
        }
    }
}
