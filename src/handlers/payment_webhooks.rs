use axum::{
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Json},
};
use bytes::Bytes;
use serde_json::json;
use tracing::warn;

use crate::{
    errors::ServiceError,
    gateway::{self, GatewayEvent},
    AppState,
};

/// POST /api/v1/payments/webhook
///
/// Reachable without bearer auth; trust is the HMAC signature over the raw
/// body. The gateway retries on non-2xx, so handled events must answer 200
/// even when they turn out to be duplicates.
#[utoipa::path(
    post,
    path = "/api/v1/payments/webhook",
    request_body = String,
    responses(
        (status = 200, description = "Webhook accepted"),
        (status = 400, description = "Invalid signature or payload", body = crate::errors::ErrorResponse)
    ),
    tag = "Payments"
)]
pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ServiceError> {
    let ok = gateway::verify_signature(
        &headers,
        &body,
        &state.config.gateway.webhook_secret,
        state.config.gateway.webhook_tolerance_secs,
    );
    if !ok {
        warn!("webhook signature verification failed");
        return Err(ServiceError::BadRequest(
            "invalid webhook signature".to_string(),
        ));
    }

    let event: GatewayEvent = serde_json::from_slice(&body)
        .map_err(|e| ServiceError::BadRequest(format!("invalid webhook payload: {e}")))?;

    state.services.reconciler.handle(event).await?;

    Ok(Json(json!({ "received": true })))
}
