//! lb-line: LINE channel adapter
//!
//! Bridges the host event bus to the LINE Messaging API. Webhook requests
//! are verified and translated into incoming host events; outgoing host
//! events for the `line` channel are turned into push messages.

pub mod api;
pub mod client;
pub mod error;
pub mod inbound;
pub mod module;
pub mod outgoing;
pub mod registry;
pub mod signature;
pub mod types;
pub mod webhook;

pub use api::{LineApiClient, LineApiFactory, MessagingApi, MessagingApiFactory};
pub use client::LineClient;
pub use error::{LineError, Result};
pub use inbound::{InboundReport, InboundTranslator, Translation};
pub use module::{BotState, LineModule};
pub use outgoing::{OutgoingDispatcher, OutgoingKind};
pub use registry::BotRegistry;
pub use webhook::{create_webhook_router, WebhookState};
