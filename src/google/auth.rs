use crate::error::BudgetError;
use crate::google::credentials::CloudCredentials;
use gcp_auth::{CustomServiceAccount, TokenProvider};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;

pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

/// Service-account token source.
///
/// The key file is parsed on first use, so bad key material surfaces as a
/// `GoogleAuth` error on the first authenticated call rather than at startup.
#[derive(Clone)]
pub struct GoogleAuth {
    credentials_path: PathBuf,
    provider: Arc<OnceCell<Arc<CustomServiceAccount>>>,
}

impl GoogleAuth {
    pub fn new(creds: &CloudCredentials) -> Self {
        Self {
            credentials_path: creds.credentials_path.clone(),
            provider: Arc::new(OnceCell::new()),
        }
    }

    async fn provider(&self) -> Result<&Arc<CustomServiceAccount>, BudgetError> {
        self.provider
            .get_or_try_init(|| async {
                let account = CustomServiceAccount::from_file(&self.credentials_path)?;
                info!(
                    path = %self.credentials_path.display(),
                    "service account key parsed"
                );
                Ok::<_, BudgetError>(Arc::new(account))
            })
            .await
    }

    /// Bearer token for the cloud-platform scope. Cached and refreshed by
    /// the provider.
    pub async fn access_token(&self) -> Result<String, BudgetError> {
        let token = self.provider().await?.token(&[CLOUD_PLATFORM_SCOPE]).await?;
        Ok(token.as_str().to_string())
    }
}
