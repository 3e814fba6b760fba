//! Per-bot LINE client

use std::sync::Arc;

use tracing::{error, info};

use lb_core::{ChannelConfig, Event, EventBus, MiddlewareOutcome};

use crate::api::MessagingApiFactory;
use crate::error::{LineError, Result};
use crate::inbound::{InboundReport, InboundTranslator};
use crate::outgoing::OutgoingDispatcher;
use crate::signature::verify_signature;
use crate::types::WebhookBody;

/// Placeholder substituted with the bot id in webhook URLs
pub const BOT_ID_PLACEHOLDER: &str = "BOT_ID";

/// Everything one bot needs to talk to LINE
pub struct LineClient {
    bot_id: String,
    config: ChannelConfig,
    webhook_url: String,
    translator: InboundTranslator,
    dispatcher: OutgoingDispatcher,
}

impl LineClient {
    /// Set up the client for a bot
    ///
    /// Fails when either credential is missing; `webhook_template` is the
    /// public webhook URL containing [`BOT_ID_PLACEHOLDER`].
    pub fn initialize(
        bot_id: &str,
        config: ChannelConfig,
        api_factory: &dyn MessagingApiFactory,
        bus: Arc<dyn EventBus>,
        webhook_template: &str,
    ) -> Result<Self> {
        if config.channel_access_token.is_empty() {
            error!(
                "[{}] channel_access_token, channel_secret must be configured to use this channel.",
                bot_id
            );
            return Err(LineError::AccessTokenNotConfigured);
        }
        if config.channel_secret.is_empty() {
            error!(
                "[{}] channel_access_token, channel_secret must be configured to use this channel.",
                bot_id
            );
            return Err(LineError::ChannelSecretNotConfigured);
        }

        let api = api_factory.create(&config)?;
        let webhook_url = webhook_template.replace(BOT_ID_PLACEHOLDER, bot_id);

        info!("[{}] LINE webhook listening at {}", bot_id, webhook_url);

        Ok(Self {
            bot_id: bot_id.to_string(),
            config,
            webhook_url,
            translator: InboundTranslator::new(bot_id, bus),
            dispatcher: OutgoingDispatcher::new(api),
        })
    }

    pub fn bot_id(&self) -> &str {
        &self.bot_id
    }

    pub fn webhook_url(&self) -> &str {
        &self.webhook_url
    }

    /// Check a webhook request's signature against this bot's secret
    pub fn auth(&self, body: &[u8], signature: Option<&str>) -> bool {
        match signature {
            Some(signature) => verify_signature(&self.config.channel_secret, body, signature),
            None => false,
        }
    }

    /// Publish the events of a verified webhook request to the host
    pub async fn handle_webhook_request(&self, body: &WebhookBody) -> Result<InboundReport> {
        self.translator.process(body).await
    }

    /// Deliver an outgoing host event
    pub async fn handle_outgoing_event(&self, event: &Event) -> Result<MiddlewareOutcome> {
        self.dispatcher.dispatch(event).await
    }
}
