//! Host event exchanged between the bot runtime and its channels

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Which way an event travels relative to the bot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// From a user, through a channel, into the bot
    Incoming,
    /// From the bot out to a channel
    Outgoing,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Incoming => "incoming",
            Self::Outgoing => "outgoing",
        }
    }
}

/// An event on the host bus
///
/// Channels construct incoming events and read outgoing ones; the bus owns
/// their lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub bot_id: String,
    pub channel: String,
    pub direction: Direction,
    #[serde(rename = "type")]
    pub event_type: String,
    pub payload: JsonValue,
    /// Channel-specific recipient or sender identifier
    pub target: String,
    pub created_at: DateTime<Utc>,
}

impl Event {
    /// Create an event travelling from a channel into the bot
    pub fn incoming(
        bot_id: impl Into<String>,
        channel: impl Into<String>,
        event_type: impl Into<String>,
        payload: JsonValue,
        target: impl Into<String>,
    ) -> Self {
        Self::new(Direction::Incoming, bot_id, channel, event_type, payload, target)
    }

    /// Create an event travelling from the bot out to a channel
    pub fn outgoing(
        bot_id: impl Into<String>,
        channel: impl Into<String>,
        event_type: impl Into<String>,
        payload: JsonValue,
        target: impl Into<String>,
    ) -> Self {
        Self::new(Direction::Outgoing, bot_id, channel, event_type, payload, target)
    }

    fn new(
        direction: Direction,
        bot_id: impl Into<String>,
        channel: impl Into<String>,
        event_type: impl Into<String>,
        payload: JsonValue,
        target: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            bot_id: bot_id.into(),
            channel: channel.into(),
            direction,
            event_type: event_type.into(),
            payload,
            target: target.into(),
            created_at: Utc::now(),
        }
    }

    /// Text carried in the payload, if any
    pub fn text(&self) -> Option<&str> {
        self.payload.get("text").and_then(JsonValue::as_str)
    }
}
