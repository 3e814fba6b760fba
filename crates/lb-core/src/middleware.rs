//! Ordered middleware chain applied to events before delivery
//!
//! Channels register a handler for outgoing events. Handlers run in
//! ascending `order`; the first one that reports [`MiddlewareOutcome::Handled`]
//! stops propagation, and the first error aborts the chain.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::event::{Direction, Event};
use crate::Result;

/// What a middleware decided about an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MiddlewareOutcome {
    /// Pass the event on to the next middleware
    Continue,
    /// The event was consumed; stop propagation
    Handled,
}

/// Middleware handler
#[async_trait]
pub trait MiddlewareHandler: Send + Sync {
    async fn handle(&self, event: &Event) -> Result<MiddlewareOutcome>;
}

/// A named middleware registration
#[derive(Clone)]
pub struct Middleware {
    pub name: String,
    pub description: String,
    pub direction: Direction,
    pub order: i32,
    pub handler: Arc<dyn MiddlewareHandler>,
}

impl fmt::Debug for Middleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Middleware")
            .field("name", &self.name)
            .field("direction", &self.direction)
            .field("order", &self.order)
            .finish_non_exhaustive()
    }
}

/// Shared middleware chain
#[derive(Clone, Default)]
pub struct MiddlewareChain {
    entries: Arc<RwLock<Vec<Middleware>>>,
}

impl MiddlewareChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a middleware, replacing any existing one with the same name
    pub async fn register_middleware(&self, middleware: Middleware) {
        let mut entries = self.entries.write().await;
        entries.retain(|m| m.name != middleware.name);

        info!(
            "Registering {} middleware '{}' (order {})",
            middleware.direction.as_str(),
            middleware.name,
            middleware.order
        );

        // Stable: equal orders keep registration order
        let pos = entries
            .iter()
            .position(|m| m.order > middleware.order)
            .unwrap_or(entries.len());
        entries.insert(pos, middleware);
    }

    /// Remove a middleware by name. Returns whether it was registered.
    pub async fn remove_middleware(&self, name: &str) -> bool {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|m| m.name != name);
        let removed = entries.len() != before;
        if removed {
            info!("Removed middleware '{}'", name);
        }
        removed
    }

    /// Names of registered middleware in execution order
    pub async fn names(&self) -> Vec<String> {
        self.entries
            .read()
            .await
            .iter()
            .map(|m| m.name.clone())
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Run an event through every middleware registered for its direction
    pub async fn process(&self, event: &Event) -> Result<MiddlewareOutcome> {
        // Snapshot so handlers never run under the lock
        let handlers: Vec<(String, Arc<dyn MiddlewareHandler>)> = self
            .entries
            .read()
            .await
            .iter()
            .filter(|m| m.direction == event.direction)
            .map(|m| (m.name.clone(), Arc::clone(&m.handler)))
            .collect();

        for (name, handler) in handlers {
            if handler.handle(event).await? == MiddlewareOutcome::Handled {
                debug!("Event {} handled by middleware '{}'", event.id, name);
                return Ok(MiddlewareOutcome::Handled);
            }
        }

        Ok(MiddlewareOutcome::Continue)
    }
}
