//! Webhook server for LINE Bot
//!
//! Handles incoming webhooks from LINE Messaging API

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::post,
    Router,
};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, warn};

use crate::error::LineError;
use crate::registry::BotRegistry;
use crate::signature::SIGNATURE_HEADER;
use crate::types::WebhookBody;

/// Webhook server state
#[derive(Clone)]
pub struct WebhookState {
    pub registry: BotRegistry,
}

/// Create webhook router
pub fn create_webhook_router(state: WebhookState) -> Router {
    Router::new()
        .route("/bots/{bot_id}/webhook", post(handle_webhook))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Handle incoming webhook
async fn handle_webhook(
    State(state): State<WebhookState>,
    Path(bot_id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, (StatusCode, &'static str)> {
    let Some(client) = state.registry.find(&bot_id) else {
        warn!("Webhook for unknown bot: {}", bot_id);
        return Err((StatusCode::NOT_FOUND, "botId invalid"));
    };

    // Verify signature over the raw bytes
    let signature = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok());
    if !client.auth(&body, signature) {
        warn!("[{}] Invalid signature", bot_id);
        return Err((StatusCode::UNAUTHORIZED, "channelSecret invalid"));
    }

    let webhook: WebhookBody = serde_json::from_slice(&body).map_err(|e| {
        error!("[{}] Failed to parse webhook body: {:?}", bot_id, e);
        (StatusCode::BAD_REQUEST, "invalid webhook body")
    })?;

    let report = client.handle_webhook_request(&webhook).await.map_err(|e| {
        error!("[{}] Error processing webhook: {}", bot_id, e);
        error_response(&e)
    })?;
    debug!("[{}] Webhook processed: {}", bot_id, report);

    Ok(StatusCode::NO_CONTENT)
}

fn error_response(e: &LineError) -> (StatusCode, &'static str) {
    match e {
        LineError::ParseError(_) => (StatusCode::BAD_REQUEST, "invalid webhook event"),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "failed to process webhook"),
    }
}
