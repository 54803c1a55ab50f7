use crate::config::VISION_ANNOTATE_URL;
use crate::error::{BudgetError, IsRetryable};
use crate::google::{GoogleAuth, default_retry_policy};
use crate::types::vision::{
    AnnotateImageRequest, AnnotateRequest, AnnotateResponse, Feature, ImageContent,
};
use async_trait::async_trait;
use axum::http::StatusCode;
use backon::Retryable;
use base64::Engine;
use std::time::Duration;
use tracing::{debug, warn};

/// Extracts printed text from an image.
#[async_trait]
pub trait TextDetector: Send + Sync {
    /// Full detected text, or an empty string when nothing was found.
    async fn detect_text(&self, image: &[u8]) -> Result<String, BudgetError>;
}

/// Cloud Vision `TEXT_DETECTION` client.
#[derive(Clone)]
pub struct VisionClient {
    http: reqwest::Client,
    auth: GoogleAuth,
}

impl VisionClient {
    pub fn new(http: reqwest::Client, auth: GoogleAuth) -> Self {
        Self { http, auth }
    }

    async fn annotate(&self, body: &AnnotateRequest) -> Result<AnnotateResponse, BudgetError> {
        let token = self.auth.access_token().await?;
        let resp = self
            .http
            .post(VISION_ANNOTATE_URL.clone())
            .bearer_auth(token)
            .json(body)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(BudgetError::UpstreamStatus(
                StatusCode::from_u16(status.as_u16()).unwrap_or(StatusCode::BAD_GATEWAY),
            ));
        }
        Ok(resp.json::<AnnotateResponse>().await?)
    }
}

#[async_trait]
impl TextDetector for VisionClient {
    async fn detect_text(&self, image: &[u8]) -> Result<String, BudgetError> {
        let body = text_detection_request(image);
        let response = (|| async { self.annotate(&body).await })
            .retry(default_retry_policy())
            .when(|e: &BudgetError| e.is_retryable())
            .notify(|err, dur: Duration| {
                warn!("Vision annotate retrying after error {}, sleeping {:?}", err, dur);
            })
            .await?;
        let text = first_description(response)?;
        debug!(chars = text.len(), "OCR completed");
        Ok(text)
    }
}

fn text_detection_request(image: &[u8]) -> AnnotateRequest {
    AnnotateRequest {
        requests: vec![AnnotateImageRequest {
            image: ImageContent {
                content: base64::engine::general_purpose::STANDARD.encode(image),
            },
            features: vec![Feature {
                kind: "TEXT_DETECTION",
            }],
        }],
    }
}

/// The first annotation holds the full text block.
fn first_description(response: AnnotateResponse) -> Result<String, BudgetError> {
    let Some(first) = response.responses.into_iter().next() else {
        return Ok(String::new());
    };
    if let Some(status) = first.error
        && status.code != 0
    {
        return Err(BudgetError::Vision {
            code: status.code,
            message: status.message,
        });
    }
    Ok(first
        .text_annotations
        .into_iter()
        .next()
        .map(|a| a.description)
        .unwrap_or_default())
}
