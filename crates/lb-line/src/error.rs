//! エラー型定義 (lb-line)

use thiserror::Error;

/// lb-line のエラー型
#[derive(Error, Debug)]
pub enum LineError {
    #[error("LINE API error: {0}")]
    ApiError(String),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Failed to parse {0}")]
    ParseError(String),

    #[error("Channel secret not configured")]
    ChannelSecretNotConfigured,

    #[error("Channel access token not configured")]
    AccessTokenNotConfigured,

    #[error("Unsupported event type: {0}")]
    UnsupportedEventType(String),

    #[error("Invalid payload for {kind} message: {reason}")]
    InvalidPayload { kind: &'static str, reason: String },

    #[error("Host error: {0}")]
    Host(#[from] lb_core::Error),
}

impl From<LineError> for lb_core::Error {
    fn from(e: LineError) -> Self {
        lb_core::Error::Channel(Box::new(e))
    }
}

/// Result 型エイリアス
pub type Result<T> = std::result::Result<T, LineError>;
