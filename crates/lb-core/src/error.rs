//! Error types for lb-core

use thiserror::Error;

/// Main error type for lb-core
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Event bus error: {0}")]
    EventBus(String),

    /// Error raised by a channel while handling an event
    #[error("Channel error: {0}")]
    Channel(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for lb-core
pub type Result<T> = std::result::Result<T, Error>;
