//! Webhook events to host incoming events

use std::fmt;
use std::sync::Arc;

use serde_json::Value as JsonValue;
use tracing::debug;

use lb_core::{Event, EventBus};

use crate::error::{LineError, Result};
use crate::module::CHANNEL;
use crate::types::{InboundKind, WebhookBody, WebhookEvent};

/// Result of translating one webhook event
#[derive(Debug, Clone)]
pub enum Translation {
    /// Forward this event to the host
    Emit(Event),
    /// Nothing to forward; the reason is kept for logs and tests
    Ignored(String),
}

/// Counts of what happened to one webhook request's events
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InboundReport {
    pub emitted: usize,
    pub ignored: usize,
}

impl fmt::Display for InboundReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} emitted, {} ignored", self.emitted, self.ignored)
    }
}

/// Translates LINE webhook events for one bot and publishes them
#[derive(Clone)]
pub struct InboundTranslator {
    bot_id: String,
    bus: Arc<dyn EventBus>,
}

impl InboundTranslator {
    pub fn new(bot_id: impl Into<String>, bus: Arc<dyn EventBus>) -> Self {
        Self {
            bot_id: bot_id.into(),
            bus,
        }
    }

    /// Map a single webhook event to a host event
    pub fn translate(&self, event: &WebhookEvent) -> Result<Translation> {
        let payload = match event.kind() {
            InboundKind::TextMessage(message) => message.clone(),
            InboundKind::Postback(data) => serde_json::from_str::<JsonValue>(data)
                .map_err(|e| LineError::ParseError(format!("postback data: {}", e)))?,
            InboundKind::Unhandled => {
                return Ok(Translation::Ignored(format!("unhandled event {}", event.describe())));
            }
        };

        let Some(user_id) = event.user_id() else {
            return Ok(Translation::Ignored(format!(
                "{} event without a source user",
                event.describe()
            )));
        };

        Ok(Translation::Emit(Event::incoming(
            self.bot_id.as_str(),
            CHANNEL,
            "text",
            payload,
            user_id,
        )))
    }

    /// Translate and publish every event of a webhook request, in order
    ///
    /// Stops at the first failure; events already published stay published.
    pub async fn process(&self, body: &WebhookBody) -> Result<InboundReport> {
        debug!("Received webhook for destination: {}", body.destination);

        let mut report = InboundReport::default();
        for event in &body.events {
            match self.translate(event)? {
                Translation::Emit(host_event) => {
                    debug!("Incoming {} event from {}", host_event.event_type, host_event.target);
                    self.bus.send_event(host_event).await?;
                    report.emitted += 1;
                }
                Translation::Ignored(reason) => {
                    debug!("Ignoring webhook event: {}", reason);
                    report.ignored += 1;
                }
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use lb_core::{Direction, Error as CoreError};
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingBus {
        events: Mutex<Vec<Event>>,
        fail_after: Option<usize>,
    }

    #[async_trait]
    impl EventBus for RecordingBus {
        async fn send_event(&self, event: Event) -> lb_core::Result<()> {
            let mut events = self.events.lock().unwrap();
            if Some(events.len()) == self.fail_after {
                return Err(CoreError::EventBus("bus closed".to_string()));
            }
            events.push(event);
            Ok(())
        }
    }

    fn body(events: JsonValue) -> WebhookBody {
        serde_json::from_value(json!({"destination": "Ubot", "events": events})).unwrap()
    }

    fn text_event(user: &str, text: &str) -> JsonValue {
        json!({
            "type": "message",
            "timestamp": 1,
            "source": {"type": "user", "userId": user},
            "message": {"type": "text", "id": "1", "text": text}
        })
    }

    #[tokio::test]
    async fn test_text_message_emits_one_event() {
        let bus = Arc::new(RecordingBus::default());
        let translator = InboundTranslator::new("bot1", bus.clone());

        let report = translator
            .process(&body(json!([text_event("U123", "Hello")])))
            .await
            .unwrap();
        assert_eq!(report, InboundReport { emitted: 1, ignored: 0 });

        let events = bus.events.lock().unwrap();
        assert_eq!(events.len(), 1);
        let event = &events[0];
        assert_eq!(event.bot_id, "bot1");
        assert_eq!(event.channel, "line");
        assert_eq!(event.direction, Direction::Incoming);
        assert_eq!(event.event_type, "text");
        assert_eq!(event.target, "U123");
        assert_eq!(event.payload["text"], "Hello");
        assert_eq!(event.payload["type"], "text");
    }

    #[tokio::test]
    async fn test_events_keep_payload_order() {
        let bus = Arc::new(RecordingBus::default());
        let translator = InboundTranslator::new("bot1", bus.clone());

        translator
            .process(&body(json!([
                text_event("U1", "first"),
                text_event("U2", "second"),
                text_event("U3", "third"),
            ])))
            .await
            .unwrap();

        let events = bus.events.lock().unwrap();
        let texts: Vec<_> = events.iter().map(|e| e.payload["text"].clone()).collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
        let targets: Vec<_> = events.iter().map(|e| e.target.as_str()).collect();
        assert_eq!(targets, vec!["U1", "U2", "U3"]);
    }

    #[tokio::test]
    async fn test_postback_payload_is_parsed() {
        let bus = Arc::new(RecordingBus::default());
        let translator = InboundTranslator::new("bot1", bus.clone());

        translator
            .process(&body(json!([{
                "type": "postback",
                "source": {"type": "user", "userId": "U9"},
                "postback": {"data": "{\"a\":1}"}
            }])))
            .await
            .unwrap();

        let events = bus.events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "text");
        assert_eq!(events[0].payload, json!({"a": 1}));
        assert_eq!(events[0].target, "U9");
    }

    #[tokio::test]
    async fn test_invalid_postback_data() {
        let bus = Arc::new(RecordingBus::default());
        let translator = InboundTranslator::new("bot1", bus.clone());

        let result = translator
            .process(&body(json!([{
                "type": "postback",
                "source": {"type": "user", "userId": "U9"},
                "postback": {"data": "action=buy&item=1"}
            }])))
            .await;
        assert!(matches!(result, Err(LineError::ParseError(_))));
        assert!(bus.events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unhandled_kinds_are_ignored() {
        let bus = Arc::new(RecordingBus::default());
        let translator = InboundTranslator::new("bot1", bus.clone());

        let report = translator
            .process(&body(json!([
                {
                    "type": "message",
                    "source": {"type": "user", "userId": "U1"},
                    "message": {"type": "sticker", "id": "1"}
                },
                {"type": "follow", "source": {"type": "user", "userId": "U1"}},
                text_event("U1", "kept"),
                {
                    "type": "message",
                    "source": {"type": "group", "groupId": "G1"},
                    "message": {"type": "text", "id": "2", "text": "no user"}
                }
            ])))
            .await
            .unwrap();

        assert_eq!(report, InboundReport { emitted: 1, ignored: 3 });
        assert_eq!(report.to_string(), "1 emitted, 3 ignored");
        assert_eq!(bus.events.lock().unwrap()[0].payload["text"], "kept");
    }

    #[test]
    fn test_translate_reports_reason() {
        let bus = Arc::new(RecordingBus::default());
        let translator = InboundTranslator::new("bot1", bus);
        let event: WebhookEvent = serde_json::from_value(json!({
            "type": "message",
            "source": {"type": "user", "userId": "U1"},
            "message": {"type": "image", "id": "1"}
        }))
        .unwrap();

        match translator.translate(&event).unwrap() {
            Translation::Ignored(reason) => assert!(reason.contains("message/image")),
            Translation::Emit(_) => panic!("image messages are not forwarded"),
        }
    }

    #[tokio::test]
    async fn test_bus_failure_propagates() {
        let bus = Arc::new(RecordingBus {
            fail_after: Some(1),
            ..Default::default()
        });
        let translator = InboundTranslator::new("bot1", bus.clone());

        let result = translator
            .process(&body(json!([text_event("U1", "a"), text_event("U1", "b")])))
            .await;
        assert!(matches!(result, Err(LineError::Host(CoreError::EventBus(_)))));
        assert_eq!(bus.events.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_payload() {
        let bus = Arc::new(RecordingBus::default());
        let translator = InboundTranslator::new("bot1", bus);
        let report = translator.process(&body(json!([]))).await.unwrap();
        assert_eq!(report, InboundReport::default());
    }
}
