use crate::http::types::{HttpError, HttpResult, HttpSuccess, SetLogLevelRequest};
use crate::http::HttpState;
use crate::line::{self, WebhookEnvelope};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use std::str::FromStr;
use tracing::log::{error, warn};
use tracing_subscriber::EnvFilter;

/// LINE webhook delivery endpoint. The signature covers the raw body, so the
/// body must be taken as bytes and only parsed after verification passes.
/// Invalid or missing signatures get a 400 and trigger no outbound calls.
pub async fn line_callback(
    State(state): State<HttpState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<&'static str, HttpError> {
    let signature = headers
        .get(line::SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    if !line::verify_signature(&state.channel_secret, signature, &body) {
        warn!("Rejecting webhook delivery with invalid signature");
        return Err(HttpError {
            status: StatusCode::BAD_REQUEST,
            message: "Invalid signature!".to_string(),
        });
    }

    let envelope: WebhookEnvelope = serde_json::from_slice(&body).map_err(|e| HttpError {
        status: StatusCode::BAD_REQUEST,
        message: format!("Invalid webhook body: {e}"),
    })?;

    // Events are independent; a dispatch failure for one must not fail the
    // delivery, so errors are logged and the platform still gets its 200.
    for event in envelope.events {
        if let Err(e) = state.bot_manager.handle_event(event).await {
            error!("Failed to handle webhook event: {e:?}");
        }
    }

    Ok("OK")
}

pub async fn sys_version(State(_state): State<HttpState>) -> HttpResult<String> {
    Ok(HttpSuccess(crate::VERSION.to_string()))
}

pub async fn sys_set_log_level(
    State(state): State<HttpState>,
    Json(payload): Json<SetLogLevelRequest>,
) -> HttpResult<bool> {
    let filter = EnvFilter::from_str(&payload.level).map_err(|e| HttpError {
        status: StatusCode::BAD_REQUEST,
        message: e.to_string(),
    })?;

    tracing::log::info!("Setting log level to {filter} via API");
    let success = state
        .tracing_reload
        .reload(filter)
        .map(|_| true)
        .map_err(|e| HttpError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: e.to_string(),
        })?;

    Ok(HttpSuccess(success))
}
