//! Minimal in-process bot host
//!
//! Logs every incoming event and, in echo mode, answers text events through
//! the outgoing middleware chain.

use serde_json::json;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use lb_core::{BroadcastEventBus, Direction, Event, MiddlewareChain, MiddlewareOutcome};

/// Build the echo reply for an incoming event, if it carries text
pub fn echo_reply(event: &Event) -> Option<Event> {
    if event.direction != Direction::Incoming {
        return None;
    }
    let text = event.text()?;
    Some(Event::outgoing(
        event.bot_id.as_str(),
        event.channel.as_str(),
        "text",
        json!({ "text": text }),
        event.target.as_str(),
    ))
}

/// Spawn the host loop consuming the bus
pub fn spawn_host(bus: &BroadcastEventBus, chain: MiddlewareChain, echo: bool) -> JoinHandle<()> {
    let mut rx = bus.subscribe();

    tokio::spawn(async move {
        loop {
            let event = match rx.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Host lagged behind, {} events skipped", skipped);
                    continue;
                }
                Err(RecvError::Closed) => break,
            };

            info!(
                "[{}] incoming {} from {} via {}: {}",
                event.bot_id, event.event_type, event.target, event.channel, event.payload
            );

            if !echo {
                continue;
            }

            let Some(reply) = echo_reply(&event) else {
                continue;
            };

            match chain.process(&reply).await {
                Ok(MiddlewareOutcome::Handled) => debug!("Echo delivered to {}", reply.target),
                Ok(MiddlewareOutcome::Continue) => {
                    warn!(
                        "No middleware delivered {} event for bot {}",
                        reply.channel, reply.bot_id
                    )
                }
                Err(e) => error!("Failed to deliver echo: {}", e),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use lb_core::EventBus;

    #[test]
    fn test_echo_reply() {
        let payload = json!({"type": "text", "text": "hi"});
        let incoming = Event::incoming("bot1", "line", "text", payload, "U1");
        let reply = echo_reply(&incoming).unwrap();

        assert_eq!(reply.direction, Direction::Outgoing);
        assert_eq!(reply.bot_id, "bot1");
        assert_eq!(reply.channel, "line");
        assert_eq!(reply.event_type, "text");
        assert_eq!(reply.target, "U1");
        assert_eq!(reply.payload, json!({"text": "hi"}));
    }

    #[test]
    fn test_no_echo_without_text() {
        let postback = Event::incoming("bot1", "line", "text", json!({"a": 1}), "U1");
        assert!(echo_reply(&postback).is_none());

        let outgoing = Event::outgoing("bot1", "line", "text", json!({"text": "hi"}), "U1");
        assert!(echo_reply(&outgoing).is_none());
    }

    #[tokio::test]
    async fn test_host_stops_when_bus_dropped() {
        let bus = BroadcastEventBus::default();
        let handle = spawn_host(&bus, MiddlewareChain::new(), true);

        bus.send_event(Event::incoming("bot1", "line", "text", json!({"text": "hi"}), "U1"))
            .await
            .unwrap();
        drop(bus);

        handle.await.unwrap();
    }
}
