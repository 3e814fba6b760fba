//! lb-core: host contracts for line-bridge
//!
//! Defines the event type exchanged with the bot host, the event bus and
//! outgoing middleware chain the channel adapter plugs into, and the
//! gateway configuration that doubles as the per-bot config store.

pub mod bus;
pub mod config;
pub mod error;
pub mod event;
pub mod middleware;

pub use bus::{BroadcastEventBus, EventBus};
pub use config::{
    ChannelConfig, ConfigStore, GatewayConfig, HostConfig, LineApiConfig, ServerConfig,
};
pub use error::{Error, Result};
pub use event::{Direction, Event};
pub use middleware::{Middleware, MiddlewareChain, MiddlewareHandler, MiddlewareOutcome};
