//! LINE Messaging API client
//!
//! Communicates with LINE Messaging API

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, error};

use lb_core::ChannelConfig;

use crate::error::{LineError, Result};
use crate::types::{LineApiErrorBody, MessageContent, PushMessage};

/// Default LINE API endpoint
pub const DEFAULT_API_BASE_URL: &str = "https://api.line.me/v2";

/// Outbound side of the messaging platform
#[async_trait]
pub trait MessagingApi: Send + Sync {
    /// Deliver one message to a user, group or room
    async fn push_message(&self, to: &str, message: MessageContent) -> Result<()>;
}

/// Builds a per-bot API client from that bot's channel configuration
pub trait MessagingApiFactory: Send + Sync {
    fn create(&self, config: &ChannelConfig) -> Result<Arc<dyn MessagingApi>>;
}

/// LINE Messaging API client
#[derive(Clone)]
pub struct LineApiClient {
    client: Client,
    channel_access_token: String,
    base_url: String,
}

impl LineApiClient {
    /// Create a new LINE API client
    pub fn new(channel_access_token: &str) -> Result<Self> {
        Self::with_base_url(channel_access_token, DEFAULT_API_BASE_URL)
    }

    /// Create a client talking to a custom endpoint
    pub fn with_base_url(channel_access_token: &str, base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(LineError::HttpError)?;

        Ok(Self {
            client,
            channel_access_token: channel_access_token.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl MessagingApi for LineApiClient {
    async fn push_message(&self, to: &str, message: MessageContent) -> Result<()> {
        let url = format!("{}/bot/message/push", self.base_url);

        let body = PushMessage {
            to: to.to_string(),
            messages: vec![message],
        };

        debug!("Pushing message to: {}", to);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.channel_access_token)
            .json(&body)
            .send()
            .await
            .map_err(LineError::HttpError)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<LineApiErrorBody>(&error_text)
                .map(|e| e.message)
                .unwrap_or(error_text);
            error!("Push message failed: {} - {}", status, detail);
            return Err(LineError::ApiError(format!("{}: {}", status, detail)));
        }

        Ok(())
    }
}

/// Factory producing [`LineApiClient`]s against one API endpoint
#[derive(Debug, Clone)]
pub struct LineApiFactory {
    base_url: String,
}

impl LineApiFactory {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

impl Default for LineApiFactory {
    fn default() -> Self {
        Self::new(DEFAULT_API_BASE_URL)
    }
}

impl MessagingApiFactory for LineApiFactory {
    fn create(&self, config: &ChannelConfig) -> Result<Arc<dyn MessagingApi>> {
        let client = LineApiClient::with_base_url(&config.channel_access_token, &self.base_url)?;
        Ok(Arc::new(client))
    }
}
