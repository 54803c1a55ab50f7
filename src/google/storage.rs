use crate::config::{STORAGE_PUBLIC_URL, STORAGE_UPLOAD_URL};
use crate::error::{BudgetError, IsRetryable};
use crate::google::{GoogleAuth, default_retry_policy};
use async_trait::async_trait;
use axum::http::StatusCode;
use backon::Retryable;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

/// Object storage for uploaded bill images.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` under `object` and return its public URL.
    async fn upload(
        &self,
        object: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, BudgetError>;
}

/// Firebase Storage bucket, addressed through the Cloud Storage JSON API.
#[derive(Clone)]
pub struct FirebaseStorage {
    http: reqwest::Client,
    auth: GoogleAuth,
    bucket: String,
}

impl FirebaseStorage {
    pub fn new(http: reqwest::Client, auth: GoogleAuth, bucket: impl Into<String>) -> Self {
        Self {
            http,
            auth,
            bucket: bucket.into(),
        }
    }

    async fn put_media(
        &self,
        url: &Url,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<(), BudgetError> {
        let token = self.auth.access_token().await?;
        let resp = self
            .http
            .post(url.clone())
            .bearer_auth(token)
            .header(CONTENT_TYPE, content_type)
            .body(bytes.to_vec())
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(BudgetError::UpstreamStatus(
                StatusCode::from_u16(status.as_u16()).unwrap_or(StatusCode::BAD_GATEWAY),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl BlobStore for FirebaseStorage {
    async fn upload(
        &self,
        object: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, BudgetError> {
        let url = upload_url(&self.bucket, object)?;
        (|| async { self.put_media(&url, &bytes, content_type).await })
            .retry(default_retry_policy())
            .when(|e: &BudgetError| e.is_retryable())
            .notify(|err, dur: Duration| {
                warn!("Storage upload retrying after error {}, sleeping {:?}", err, dur);
            })
            .await?;
        info!(bucket = %self.bucket, object, size = bytes.len(), "object uploaded");
        Ok(public_url(&self.bucket, object)?.to_string())
    }
}

/// Object name for an uploaded file: `uploads/{user_id}/{filename}`.
pub fn object_name(user_id: &str, filename: &str) -> String {
    format!("uploads/{user_id}/{filename}")
}

fn upload_url(bucket: &str, object: &str) -> Result<Url, BudgetError> {
    let mut url = STORAGE_UPLOAD_URL.clone();
    url.path_segments_mut()
        .map_err(|_| BudgetError::UrlParse(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
        .extend(["b", bucket, "o"]);
    url.query_pairs_mut()
        .append_pair("uploadType", "media")
        .append_pair("name", object);
    Ok(url)
}

fn public_url(bucket: &str, object: &str) -> Result<Url, BudgetError> {
    let mut url = STORAGE_PUBLIC_URL.clone();
    url.path_segments_mut()
        .map_err(|_| BudgetError::UrlParse(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
        .pop_if_empty()
        .push(bucket)
        .extend(object.split('/'));
    Ok(url)
}
