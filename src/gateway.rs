use async_trait::async_trait;
use axum::http::HeaderMap;
use bytes::Bytes;
use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;

use crate::{config::GatewayConfig, errors::ServiceError};

type HmacSha256 = Hmac<Sha256>;

/// Request for a hosted payment page.
#[derive(Debug, Clone, Serialize)]
pub struct HostedSessionRequest {
    /// Correlation token embedded in the session and echoed by webhooks
    pub order_id: Uuid,
    pub amount: Decimal,
    pub currency: String,
    pub customer_email: Option<String>,
    pub success_url: String,
    pub cancel_url: String,
}

/// Hosted payment session returned by the gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct HostedSession {
    pub session_id: String,
    pub url: String,
}

/// Payment gateway client. Production talks HTTP; tests substitute a fake.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_hosted_session(
        &self,
        request: HostedSessionRequest,
    ) -> Result<HostedSession, ServiceError>;
}

/// reqwest-backed gateway client.
pub struct HttpPaymentGateway {
    client: reqwest::Client,
    api_url: String,
    secret_key: String,
}

impl HttpPaymentGateway {
    pub fn new(cfg: &GatewayConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: cfg.api_url.trim_end_matches('/').to_string(),
            secret_key: cfg.secret_key.clone(),
        }
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn create_hosted_session(
        &self,
        request: HostedSessionRequest,
    ) -> Result<HostedSession, ServiceError> {
        let response = self
            .client
            .post(format!("{}/v1/checkout/sessions", self.api_url))
            .bearer_auth(&self.secret_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ServiceError::ExternalServiceError(format!("gateway: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::ExternalServiceError(format!(
                "gateway returned {status}: {body}"
            )));
        }

        response
            .json::<HostedSession>()
            .await
            .map_err(|e| ServiceError::ExternalServiceError(format!("gateway response: {e}")))
    }
}

/// Webhook event delivered by the gateway. At-least-once semantics: the
/// gateway retries on non-2xx responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayEvent {
    /// Gateway-assigned event id
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: GatewayEventData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayEventData {
    /// Session id, used as the payment's transaction id
    pub session_id: String,
    /// Correlation token set at session creation
    pub order_id: Uuid,
    pub amount: Option<Decimal>,
    /// Email collected on the hosted page, used for the confirmation send
    pub customer_email: Option<String>,
}

pub const EVENT_SESSION_COMPLETED: &str = "checkout.session.completed";
pub const EVENT_SESSION_EXPIRED: &str = "checkout.session.expired";
pub const EVENT_PAYMENT_FAILED: &str = "payment.failed";

/// Verify the webhook HMAC signature against the raw body.
///
/// Supports the gateway's `Stripe-Signature: t=..,v1=..` header as well as
/// generic `x-timestamp`/`x-signature` headers. The signed payload is
/// `"{timestamp}.{body}"`.
pub fn verify_signature(
    headers: &HeaderMap,
    payload: &Bytes,
    secret: &str,
    tolerance_secs: u64,
) -> bool {
    if let (Some(ts), Some(sig)) = (headers.get("x-timestamp"), headers.get("x-signature")) {
        if let (Ok(ts), Ok(sig)) = (ts.to_str(), sig.to_str()) {
            return check_signed_payload(ts, sig, payload, secret, tolerance_secs);
        }
    }

    if let Some(header) = headers
        .get("stripe-signature")
        .and_then(|h| h.to_str().ok())
    {
        let mut ts = "";
        let mut v1 = "";
        for part in header.split(',') {
            match part.trim().split_once('=') {
                Some(("t", val)) => ts = val,
                Some(("v1", val)) => v1 = val,
                _ => {}
            }
        }
        if !ts.is_empty() && !v1.is_empty() {
            return check_signed_payload(ts, v1, payload, secret, tolerance_secs);
        }
    }

    false
}

fn check_signed_payload(
    timestamp: &str,
    signature: &str,
    payload: &Bytes,
    secret: &str,
    tolerance_secs: u64,
) -> bool {
    match timestamp.parse::<i64>() {
        Ok(ts) => {
            let now = chrono::Utc::now().timestamp();
            if (now - ts).unsigned_abs() > tolerance_secs {
                return false;
            }
        }
        Err(_) => return false,
    }

    let expected = sign_payload(timestamp, payload, secret);
    constant_time_eq(&expected, signature)
}

/// Hex HMAC-SHA256 over `"{timestamp}.{body}"`.
pub fn sign_payload(timestamp: &str, payload: &Bytes, secret: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("hmac accepts any key length");
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut res = 0u8;
    for (x, y) in a.as_bytes().iter().zip(b.as_bytes()) {
        res |= x ^ y;
    }
    res == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const SECRET: &str = "whsec_test";

    fn signed_headers(payload: &Bytes, ts: i64) -> HeaderMap {
        let ts = ts.to_string();
        let sig = sign_payload(&ts, payload, SECRET);
        let mut headers = HeaderMap::new();
        headers.insert(
            "stripe-signature",
            HeaderValue::from_str(&format!("t={ts},v1={sig}")).unwrap(),
        );
        headers
    }

    #[test]
    fn accepts_a_valid_signature() {
        let payload = Bytes::from_static(b"{\"id\":\"evt_1\"}");
        let headers = signed_headers(&payload, chrono::Utc::now().timestamp());
        assert!(verify_signature(&headers, &payload, SECRET, 300));
    }

    #[test]
    fn rejects_a_tampered_body() {
        let payload = Bytes::from_static(b"{\"id\":\"evt_1\"}");
        let headers = signed_headers(&payload, chrono::Utc::now().timestamp());
        let tampered = Bytes::from_static(b"{\"id\":\"evt_2\"}");
        assert!(!verify_signature(&headers, &tampered, SECRET, 300));
    }

    #[test]
    fn rejects_a_stale_timestamp() {
        let payload = Bytes::from_static(b"{}");
        let headers = signed_headers(&payload, chrono::Utc::now().timestamp() - 3600);
        assert!(!verify_signature(&headers, &payload, SECRET, 300));
    }

    #[test]
    fn accepts_generic_headers() {
        let payload = Bytes::from_static(b"{}");
        let ts = chrono::Utc::now().timestamp().to_string();
        let sig = sign_payload(&ts, &payload, SECRET);
        let mut headers = HeaderMap::new();
        headers.insert("x-timestamp", HeaderValue::from_str(&ts).unwrap());
        headers.insert("x-signature", HeaderValue::from_str(&sig).unwrap());
        assert!(verify_signature(&headers, &payload, SECRET, 300));
    }

    #[test]
    fn rejects_when_headers_missing() {
        let payload = Bytes::from_static(b"{}");
        assert!(!verify_signature(&HeaderMap::new(), &payload, SECRET, 300));
    }
}
