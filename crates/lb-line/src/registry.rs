//! Registry of bots with an active LINE client
//!
//! Thread-safe storage using DashMap; lookups never block each other.

use std::sync::Arc;

use dashmap::DashMap;

use crate::client::LineClient;

/// Active bots keyed by bot id
#[derive(Clone, Default)]
pub struct BotRegistry {
    bots: Arc<DashMap<String, Arc<LineClient>>>,
}

impl BotRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a client, returning the one it replaced
    pub fn add(&self, client: LineClient) -> Option<Arc<LineClient>> {
        self.bots.insert(client.bot_id().to_string(), Arc::new(client))
    }

    /// Unregister a bot
    pub fn remove(&self, bot_id: &str) -> Option<Arc<LineClient>> {
        self.bots.remove(bot_id).map(|(_, client)| client)
    }

    pub fn find(&self, bot_id: &str) -> Option<Arc<LineClient>> {
        self.bots.get(bot_id).map(|entry| Arc::clone(entry.value()))
    }

    pub fn contains(&self, bot_id: &str) -> bool {
        self.bots.contains_key(bot_id)
    }

    /// Registered bot ids, sorted
    pub fn bot_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.bots.iter().map(|entry| entry.key().clone()).collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.bots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::LineApiFactory;
    use lb_core::{BroadcastEventBus, ChannelConfig};

    fn client(bot_id: &str) -> LineClient {
        LineClient::initialize(
            bot_id,
            ChannelConfig {
                enabled: true,
                channel_access_token: "token".to_string(),
                channel_secret: "secret".to_string(),
            },
            &LineApiFactory::default(),
            Arc::new(BroadcastEventBus::default()),
            "http://localhost/bots/BOT_ID/webhook",
        )
        .unwrap()
    }

    #[test]
    fn test_add_find_remove() {
        let registry = BotRegistry::new();
        assert!(registry.is_empty());

        assert!(registry.add(client("bot1")).is_none());
        registry.add(client("bot2"));
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.bot_ids(), vec!["bot1", "bot2"]);

        let found = registry.find("bot1").unwrap();
        assert_eq!(found.bot_id(), "bot1");

        assert!(registry.remove("bot1").is_some());
        assert!(registry.find("bot1").is_none());
        assert!(!registry.contains("bot1"));
        assert!(registry.remove("bot1").is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_add_replaces_existing() {
        let registry = BotRegistry::new();
        registry.add(client("bot1"));
        let replaced = registry.add(client("bot1"));
        assert!(replaced.is_some());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_clones_share_state() {
        let registry = BotRegistry::new();
        let handle = registry.clone();
        registry.add(client("bot1"));
        assert!(handle.contains("bot1"));
    }
}
