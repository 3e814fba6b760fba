//! LINE Messaging API types

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

// ============================================================================
// Webhook (inbound)
// ============================================================================

/// Webhook request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookBody {
    #[serde(default)]
    pub destination: String,
    #[serde(default)]
    pub events: Vec<WebhookEvent>,
}

/// LINE source (user, group, or room)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventSource {
    #[serde(rename = "type")]
    pub source_type: String,
    #[serde(rename = "userId", default)]
    pub user_id: Option<String>,
    #[serde(rename = "groupId", default)]
    pub group_id: Option<String>,
    #[serde(rename = "roomId", default)]
    pub room_id: Option<String>,
}

/// Postback payload attached to a postback event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Postback {
    pub data: String,
}

/// LINE webhook event
///
/// Only the fields the adapter reads are typed; the message object is kept
/// as received so it can be forwarded to the host untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(rename = "replyToken", default)]
    pub reply_token: Option<String>,
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub source: Option<EventSource>,
    #[serde(default)]
    pub message: Option<JsonValue>,
    #[serde(default)]
    pub postback: Option<Postback>,
}

/// What a webhook event carries, as far as the adapter is concerned
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InboundKind<'a> {
    /// A `message` event whose message type is `text`
    TextMessage(&'a JsonValue),
    /// A `postback` event with its raw data string
    Postback(&'a str),
    /// Any other event or message kind
    Unhandled,
}

fn message_type(message: &JsonValue) -> Option<&str> {
    message.get("type").and_then(JsonValue::as_str)
}

impl WebhookEvent {
    pub fn kind(&self) -> InboundKind<'_> {
        match self.event_type.as_str() {
            "message" => match &self.message {
                Some(message) if message_type(message) == Some("text") => {
                    InboundKind::TextMessage(message)
                }
                _ => InboundKind::Unhandled,
            },
            "postback" => match &self.postback {
                Some(postback) => InboundKind::Postback(&postback.data),
                None => InboundKind::Unhandled,
            },
            _ => InboundKind::Unhandled,
        }
    }

    /// Sending user's id, if the source has one
    pub fn user_id(&self) -> Option<&str> {
        self.source.as_ref()?.user_id.as_deref()
    }

    /// Human-readable event kind for logs, e.g. `message/image`
    pub fn describe(&self) -> String {
        match self.message.as_ref().and_then(message_type) {
            Some(kind) => format!("{}/{}", self.event_type, kind),
            None => self.event_type.clone(),
        }
    }
}

// ============================================================================
// Messages (outbound)
// ============================================================================

/// Push message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushMessage {
    pub to: String,
    pub messages: Vec<MessageContent>,
}

/// Message content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
#[serde(rename_all = "lowercase")]
pub enum MessageContent {
    Text {
        text: String,
        #[serde(rename = "quickReply", default, skip_serializing_if = "Option::is_none")]
        quick_reply: Option<QuickReply>,
    },
    Image {
        #[serde(rename = "originalContentUrl")]
        original_content_url: String,
        #[serde(rename = "previewImageUrl")]
        preview_image_url: String,
    },
    Template {
        #[serde(rename = "altText")]
        alt_text: String,
        template: Template,
    },
}

impl MessageContent {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text {
            text: text.into(),
            quick_reply: None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Image { .. } => "image",
            Self::Template { .. } => "template",
        }
    }
}

/// Quick reply panel attached to a text message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuickReply {
    pub items: Vec<QuickReplyItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuickReplyItem {
    /// Always `action`
    #[serde(rename = "type")]
    pub item_type: String,
    pub action: Action,
}

impl QuickReplyItem {
    pub fn action(action: Action) -> Self {
        Self {
            item_type: "action".to_string(),
            action,
        }
    }
}

/// Action attached to quick replies and template columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Postback {
        label: String,
        data: String,
        #[serde(rename = "displayText")]
        display_text: String,
    },
    Message {
        label: String,
        text: String,
    },
}

/// Template message body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
#[serde(rename_all = "lowercase")]
pub enum Template {
    Carousel {
        columns: Vec<CarouselColumn>,
        #[serde(rename = "imageAspectRatio")]
        image_aspect_ratio: String,
        #[serde(rename = "imageSize")]
        image_size: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarouselColumn {
    #[serde(rename = "thumbnailImageUrl", default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_image_url: Option<String>,
    #[serde(rename = "imageBackgroundColor")]
    pub image_background_color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub text: String,
    pub actions: Vec<Action>,
}

/// Error body returned by the LINE API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineApiErrorBody {
    pub message: String,
    #[serde(default)]
    pub details: Vec<ErrorDetail>,
}

/// Error detail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub message: String,
    pub property: Option<String>,
}

// ============================================================================
// Host payloads
// ============================================================================

/// Payload of an outgoing host event
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutgoingPayload {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub quick_replies: Option<Vec<QuickReplyChoice>>,
    /// Only read for carousels; `null` counts as absent
    #[serde(default)]
    pub elements: Option<Vec<CarouselElement>>,
}

/// One suggested answer offered as a quick reply
#[derive(Debug, Clone, Deserialize)]
pub struct QuickReplyChoice {
    pub title: String,
    #[serde(default)]
    pub payload: JsonValue,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CarouselElement {
    #[serde(default)]
    pub picture: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub buttons: Vec<CarouselButton>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CarouselButton {
    pub title: String,
}
