use crate::config::FCM_SEND_URL;
use crate::error::BudgetError;
use async_trait::async_trait;
use axum::http::StatusCode;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use serde_json::{Value, json};
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::debug;

const NOTIFICATION_ICON: &str = "https://cdn-icons-png.flaticon.com/512/4825/4825038.png";

/// Delivers a notification to a single device.
#[async_trait]
pub trait PushSender: Send + Sync {
    async fn send(&self, token: &str, title: &str, body: &str) -> Result<(), BudgetError>;
}

/// Firebase Cloud Messaging over the legacy HTTP endpoint.
#[derive(Clone)]
pub struct FcmClient {
    http: reqwest::Client,
    server_key: Option<Arc<str>>,
    limiter: Arc<DefaultDirectRateLimiter>,
}

#[derive(Debug, Default, Deserialize)]
struct FcmSendResponse {
    #[serde(default)]
    success: u32,
    #[serde(default)]
    failure: u32,
    #[serde(default)]
    results: Vec<Value>,
}

impl FcmClient {
    pub fn new(http: reqwest::Client, server_key: Option<String>) -> Self {
        let limiter = Arc::new(RateLimiter::direct(Quota::per_second(
            NonZeroU32::new(20).unwrap_or(NonZeroU32::MIN),
        )));
        Self {
            http,
            server_key: server_key.map(Arc::from),
            limiter,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.server_key.is_some()
    }
}

#[async_trait]
impl PushSender for FcmClient {
    async fn send(&self, token: &str, title: &str, body: &str) -> Result<(), BudgetError> {
        let Some(key) = self.server_key.as_deref() else {
            return Err(BudgetError::PushDisabled);
        };
        self.limiter.until_ready().await;

        let resp = self
            .http
            .post(FCM_SEND_URL.clone())
            .header(AUTHORIZATION, format!("key={key}"))
            .json(&notification_payload(token, title, body))
            .send()
            .await?;
        let status = resp.status();
        if status.as_u16() != 200 {
            return Err(BudgetError::UpstreamStatus(
                StatusCode::from_u16(status.as_u16()).unwrap_or(StatusCode::BAD_GATEWAY),
            ));
        }
        let outcome: FcmSendResponse = resp.json().await.unwrap_or_default();
        check_outcome(outcome)
    }
}

fn notification_payload(token: &str, title: &str, body: &str) -> Value {
    json!({
        "to": token,
        "notification": {
            "title": title,
            "body": body,
            "icon": NOTIFICATION_ICON,
        }
    })
}

fn check_outcome(outcome: FcmSendResponse) -> Result<(), BudgetError> {
    if outcome.failure > 0 && outcome.success == 0 {
        let reason = outcome
            .results
            .iter()
            .find_map(|r| r.get("error").and_then(Value::as_str))
            .unwrap_or("unknown")
            .to_string();
        return Err(BudgetError::PushRejected(reason));
    }
    debug!(success = outcome.success, "push delivered");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_server_key_disables_push() {
        let client = FcmClient::new(reqwest::Client::new(), None);
        assert!(!client.is_enabled());
        let err = client.send("tok", "title", "body").await.unwrap_err();
        assert!(matches!(err, BudgetError::PushDisabled));
    }

    #[test]
    fn payload_targets_device_token() {
        let payload = notification_payload("device-1", "Hi", "Pay rent");
        assert_eq!(payload["to"], "device-1");
        assert_eq!(payload["notification"]["body"], "Pay rent");
    }

    #[test]
    fn rejected_token_is_an_error() {
        let outcome: FcmSendResponse = serde_json::from_value(json!({
            "success": 0, "failure": 1, "results": [{"error": "NotRegistered"}]
        }))
        .unwrap();
        match check_outcome(outcome) {
            Err(BudgetError::PushRejected(reason)) => assert_eq!(reason, "NotRegistered"),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(check_outcome(FcmSendResponse::default()).is_ok());
    }
}
