//! Module lifecycle
//!
//! Hooks the host calls as the server starts, bots are mounted and
//! unmounted, and the module is torn down.

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use tracing::{debug, info};

use lb_core::{
    ConfigStore, Direction, Event, EventBus, Middleware, MiddlewareChain, MiddlewareHandler,
    MiddlewareOutcome,
};

use crate::api::MessagingApiFactory;
use crate::client::{LineClient, BOT_ID_PLACEHOLDER};
use crate::error::Result;
use crate::registry::BotRegistry;
use crate::webhook::{create_webhook_router, WebhookState};

/// Module name used to look up per-bot configuration
pub const MODULE_NAME: &str = "channel-line";
/// Display name of the module
pub const MODULE_FULL_NAME: &str = "LINE";
/// Not yet considered stable by the host
pub const MODULE_EXPERIMENTAL: bool = true;
/// Channel tag on host events
pub const CHANNEL: &str = "line";
/// Name of the outgoing middleware
pub const MIDDLEWARE_NAME: &str = "line.sendMessage";
/// Runs late; the middleware swallows events it sends
pub const MIDDLEWARE_ORDER: i32 = 100;

const MIDDLEWARE_DESCRIPTION: &str = "Sends out messages that targets platform = LINE. \
     This middleware should be placed at the end as it swallows events once sent.";

/// Where a bot ended up after mounting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotState {
    /// Client registered; webhooks and outgoing events are served
    Active,
    /// Channel disabled in the bot's configuration
    Disabled,
    /// Channel enabled but the client could not be set up
    Unconfigured,
}

/// The LINE channel module
pub struct LineModule {
    registry: BotRegistry,
    bus: Arc<dyn EventBus>,
    middleware: MiddlewareChain,
    config_store: Arc<dyn ConfigStore>,
    api_factory: Arc<dyn MessagingApiFactory>,
    public_url: String,
}

impl LineModule {
    pub fn new(
        bus: Arc<dyn EventBus>,
        middleware: MiddlewareChain,
        config_store: Arc<dyn ConfigStore>,
        api_factory: Arc<dyn MessagingApiFactory>,
        public_url: impl Into<String>,
    ) -> Self {
        Self {
            registry: BotRegistry::new(),
            bus,
            middleware,
            config_store,
            api_factory,
            public_url: public_url.into(),
        }
    }

    pub fn registry(&self) -> &BotRegistry {
        &self.registry
    }

    /// Public webhook URL with the bot id left as a placeholder
    pub fn webhook_template(&self) -> String {
        format!(
            "{}/bots/{}/webhook",
            self.public_url.trim_end_matches('/'),
            BOT_ID_PLACEHOLDER
        )
    }

    /// Register the outgoing middleware
    pub async fn on_server_started(&self) {
        self.middleware
            .register_middleware(Middleware {
                name: MIDDLEWARE_NAME.to_string(),
                description: MIDDLEWARE_DESCRIPTION.to_string(),
                direction: Direction::Outgoing,
                order: MIDDLEWARE_ORDER,
                handler: Arc::new(OutgoingMiddleware {
                    registry: self.registry.clone(),
                }),
            })
            .await;

        if MODULE_EXPERIMENTAL {
            info!("{} module is experimental", MODULE_FULL_NAME);
        }
    }

    /// Webhook routes, to be merged into the host's HTTP server
    pub fn router(&self) -> Router {
        create_webhook_router(WebhookState {
            registry: self.registry.clone(),
        })
    }

    /// Activate the channel for a bot if its configuration allows it
    pub async fn on_bot_mount(&self, bot_id: &str) -> Result<BotState> {
        let config = self.config_store.channel_config(MODULE_NAME, bot_id).await?;

        if !config.enabled {
            debug!("[{}] {} channel disabled", bot_id, MODULE_FULL_NAME);
            return Ok(BotState::Disabled);
        }

        match LineClient::initialize(
            bot_id,
            config,
            self.api_factory.as_ref(),
            Arc::clone(&self.bus),
            &self.webhook_template(),
        ) {
            Ok(client) => {
                self.registry.add(client);
                Ok(BotState::Active)
            }
            // already logged by the client
            Err(_) => Ok(BotState::Unconfigured),
        }
    }

    /// Forget a bot. Returns whether it was active.
    pub fn on_bot_unmount(&self, bot_id: &str) -> bool {
        let removed = self.registry.remove(bot_id).is_some();
        if removed {
            info!("[{}] {} channel unmounted", bot_id, MODULE_FULL_NAME);
        }
        removed
    }

    /// Deregister the outgoing middleware for every bot at once
    pub async fn on_module_unmount(&self) -> bool {
        self.middleware.remove_middleware(MIDDLEWARE_NAME).await
    }
}

/// Routes outgoing `line` events to the owning bot's client
struct OutgoingMiddleware {
    registry: BotRegistry,
}

#[async_trait]
impl MiddlewareHandler for OutgoingMiddleware {
    async fn handle(&self, event: &Event) -> lb_core::Result<MiddlewareOutcome> {
        if event.channel != CHANNEL {
            return Ok(MiddlewareOutcome::Continue);
        }

        let Some(client) = self.registry.find(&event.bot_id) else {
            return Ok(MiddlewareOutcome::Continue);
        };

        Ok(client.handle_outgoing_event(event).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MessagingApi;
    use crate::error::LineError;
    use crate::types::MessageContent;
    use lb_core::{BroadcastEventBus, ChannelConfig, GatewayConfig};
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingApi {
        pushed: Mutex<Vec<(String, MessageContent)>>,
    }

    #[async_trait]
    impl MessagingApi for RecordingApi {
        async fn push_message(&self, to: &str, message: MessageContent) -> Result<()> {
            self.pushed.lock().unwrap().push((to.to_string(), message));
            Ok(())
        }
    }

    struct SharedApi(Arc<RecordingApi>);

    impl MessagingApiFactory for SharedApi {
        fn create(&self, _config: &ChannelConfig) -> Result<Arc<dyn MessagingApi>> {
            Ok(self.0.clone())
        }
    }

    const CONFIG: &str = r#"
[bots.active.channel-line]
enabled = true
channel_access_token = "token"
channel_secret = "secret"

[bots.disabled.channel-line]
enabled = false
channel_access_token = "token"
channel_secret = "secret"

[bots.missing.channel-line]
enabled = true
channel_access_token = "token"
"#;

    fn module() -> (LineModule, MiddlewareChain, Arc<RecordingApi>) {
        let api = Arc::new(RecordingApi::default());
        let chain = MiddlewareChain::new();
        let module = LineModule::new(
            Arc::new(BroadcastEventBus::default()),
            chain.clone(),
            Arc::new(GatewayConfig::from_toml_str(CONFIG).unwrap()),
            Arc::new(SharedApi(api.clone())),
            "https://bot.example.com/",
        );
        (module, chain, api)
    }

    #[tokio::test]
    async fn test_mount_states() {
        let (module, _, _) = module();

        assert_eq!(module.on_bot_mount("active").await.unwrap(), BotState::Active);
        assert_eq!(module.on_bot_mount("disabled").await.unwrap(), BotState::Disabled);
        assert_eq!(module.on_bot_mount("missing").await.unwrap(), BotState::Unconfigured);
        assert_eq!(module.on_bot_mount("unknown").await.unwrap(), BotState::Disabled);

        assert_eq!(module.registry().bot_ids(), vec!["active"]);
        let client = module.registry().find("active").unwrap();
        assert_eq!(client.webhook_url(), "https://bot.example.com/bots/active/webhook");
    }

    #[tokio::test]
    async fn test_unmount_removes_bot() {
        let (module, _, _) = module();
        module.on_bot_mount("active").await.unwrap();

        assert!(module.on_bot_unmount("active"));
        assert!(module.registry().is_empty());
        assert!(!module.on_bot_unmount("active"));
    }

    #[tokio::test]
    async fn test_middleware_lifecycle() {
        let (module, chain, _) = module();
        module.on_server_started().await;
        assert_eq!(chain.names().await, vec![MIDDLEWARE_NAME]);

        assert!(module.on_module_unmount().await);
        assert!(chain.is_empty().await);
    }

    #[tokio::test]
    async fn test_middleware_delivers_line_events() {
        let (module, chain, api) = module();
        module.on_server_started().await;
        module.on_bot_mount("active").await.unwrap();

        let event = Event::outgoing("active", CHANNEL, "text", json!({"text": "hi"}), "U1");
        assert_eq!(chain.process(&event).await.unwrap(), MiddlewareOutcome::Handled);
        assert_eq!(
            *api.pushed.lock().unwrap(),
            vec![("U1".to_string(), MessageContent::text("hi"))]
        );
    }

    #[tokio::test]
    async fn test_middleware_passes_through_other_events() {
        let (module, chain, api) = module();
        module.on_server_started().await;
        module.on_bot_mount("active").await.unwrap();

        let other_channel = Event::outgoing("active", "web", "text", json!({"text": "hi"}), "U1");
        assert_eq!(chain.process(&other_channel).await.unwrap(), MiddlewareOutcome::Continue);

        let unknown_bot = Event::outgoing("ghost", CHANNEL, "text", json!({"text": "hi"}), "U1");
        assert_eq!(chain.process(&unknown_bot).await.unwrap(), MiddlewareOutcome::Continue);

        assert!(api.pushed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unsupported_type_surfaces_error() {
        let (module, chain, api) = module();
        module.on_server_started().await;
        module.on_bot_mount("active").await.unwrap();

        let event = Event::outgoing("active", CHANNEL, "unknown_kind", json!({}), "U1");
        let err = chain.process(&event).await.unwrap_err();
        let lb_core::Error::Channel(source) = err else {
            panic!("expected a channel error");
        };
        assert!(matches!(
            source.downcast_ref::<LineError>(),
            Some(LineError::UnsupportedEventType(t)) if t == "unknown_kind"
        ));
        assert!(api.pushed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_after_module_unmount_events_pass_through() {
        let (module, chain, api) = module();
        module.on_server_started().await;
        module.on_bot_mount("active").await.unwrap();
        module.on_module_unmount().await;

        let event = Event::outgoing("active", CHANNEL, "text", json!({"text": "hi"}), "U1");
        assert_eq!(chain.process(&event).await.unwrap(), MiddlewareOutcome::Continue);
        assert!(api.pushed.lock().unwrap().is_empty());
    }
}
