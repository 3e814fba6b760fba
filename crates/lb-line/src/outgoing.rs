//! Host outgoing events to LINE push messages

use std::fmt;
use std::sync::Arc;

use serde_json::json;
use tracing::debug;

use lb_core::{Event, MiddlewareOutcome};

use crate::api::MessagingApi;
use crate::error::{LineError, Result};
use crate::types::{
    Action, CarouselColumn, CarouselElement, MessageContent, OutgoingPayload, QuickReply,
    QuickReplyChoice, QuickReplyItem, Template,
};

const CAROUSEL_ALT_TEXT: &str = "this is a carousel template";
const CAROUSEL_BACKGROUND: &str = "#FFFFFF";
const CAROUSEL_ASPECT_RATIO: &str = "rectangle";
const CAROUSEL_IMAGE_SIZE: &str = "cover";

/// Outgoing event kinds this channel can deliver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutgoingKind {
    Typing,
    Text,
    File,
    Carousel,
}

impl OutgoingKind {
    /// Resolve a host event type; `default` is plain text
    pub fn resolve(event_type: &str) -> Result<Self> {
        match event_type {
            "typing" => Ok(Self::Typing),
            "text" | "default" => Ok(Self::Text),
            "file" => Ok(Self::File),
            "carousel" => Ok(Self::Carousel),
            other => Err(LineError::UnsupportedEventType(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Typing => "typing",
            Self::Text => "text",
            Self::File => "file",
            Self::Carousel => "carousel",
        }
    }
}

impl fmt::Display for OutgoingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build the LINE message for an outgoing event, or `None` when nothing
/// needs to be sent
///
/// Quick replies take precedence over the event kind (except typing).
pub fn build_message(
    kind: OutgoingKind,
    payload: &OutgoingPayload,
) -> Result<Option<MessageContent>> {
    if kind == OutgoingKind::Typing {
        return Ok(None);
    }

    if let Some(choices) = &payload.quick_replies {
        return quick_reply_message(kind, payload, choices).map(Some);
    }

    let message = match kind {
        OutgoingKind::Typing => return Ok(None),
        OutgoingKind::Text => MessageContent::text(required_text(kind, payload)?),
        OutgoingKind::File => {
            let url = payload.url.clone().ok_or_else(|| LineError::InvalidPayload {
                kind: kind.as_str(),
                reason: "missing url".to_string(),
            })?;
            // LINE wants a separate preview; the original doubles as one
            MessageContent::Image {
                original_content_url: url.clone(),
                preview_image_url: url,
            }
        }
        OutgoingKind::Carousel => {
            carousel_message(payload.elements.as_deref().unwrap_or_default())
        }
    };

    Ok(Some(message))
}

fn required_text(kind: OutgoingKind, payload: &OutgoingPayload) -> Result<String> {
    payload.text.clone().ok_or_else(|| LineError::InvalidPayload {
        kind: kind.as_str(),
        reason: "missing text".to_string(),
    })
}

fn quick_reply_message(
    kind: OutgoingKind,
    payload: &OutgoingPayload,
    choices: &[QuickReplyChoice],
) -> Result<MessageContent> {
    let items = choices
        .iter()
        .map(|choice| {
            let mut data = json!({
                "type": "quick_reply",
                "text": choice.title,
            });
            if !choice.payload.is_null() {
                data["payload"] = choice.payload.clone();
            }
            QuickReplyItem::action(Action::Postback {
                label: choice.title.clone(),
                data: data.to_string(),
                display_text: choice.title.clone(),
            })
        })
        .collect();

    Ok(MessageContent::Text {
        text: required_text(kind, payload)?,
        quick_reply: Some(QuickReply { items }),
    })
}

fn carousel_message(elements: &[CarouselElement]) -> MessageContent {
    let columns = elements
        .iter()
        .map(|element| CarouselColumn {
            thumbnail_image_url: element.picture.clone(),
            image_background_color: CAROUSEL_BACKGROUND.to_string(),
            title: element.title.clone(),
            text: element.subtitle.clone().unwrap_or_default(),
            actions: element
                .buttons
                .iter()
                .map(|button| Action::Message {
                    label: button.title.clone(),
                    text: button.title.clone(),
                })
                .collect(),
        })
        .collect();

    MessageContent::Template {
        alt_text: CAROUSEL_ALT_TEXT.to_string(),
        template: Template::Carousel {
            columns,
            image_aspect_ratio: CAROUSEL_ASPECT_RATIO.to_string(),
            image_size: CAROUSEL_IMAGE_SIZE.to_string(),
        },
    }
}

/// Delivers outgoing host events through the messaging API
#[derive(Clone)]
pub struct OutgoingDispatcher {
    api: Arc<dyn MessagingApi>,
}

impl OutgoingDispatcher {
    pub fn new(api: Arc<dyn MessagingApi>) -> Self {
        Self { api }
    }

    /// Send one outgoing event
    ///
    /// Makes at most one push call and never retries. Unsupported event
    /// types fail before anything is sent.
    pub async fn dispatch(&self, event: &Event) -> Result<MiddlewareOutcome> {
        let kind = OutgoingKind::resolve(&event.event_type)?;

        // Typing indicators carry nothing worth reading
        if kind == OutgoingKind::Typing {
            debug!("Nothing to send for {} event", kind);
            return Ok(MiddlewareOutcome::Handled);
        }

        let payload: OutgoingPayload = serde_json::from_value(event.payload.clone()).map_err(|e| {
            LineError::InvalidPayload {
                kind: kind.as_str(),
                reason: e.to_string(),
            }
        })?;

        match build_message(kind, &payload)? {
            Some(message) => {
                debug!("Sending {} message to {}", message.kind(), event.target);
                self.api.push_message(&event.target, message).await?;
            }
            None => debug!("Nothing to send for {} event", kind),
        }

        Ok(MiddlewareOutcome::Handled)
    }
}
