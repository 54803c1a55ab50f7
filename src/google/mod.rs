//! Google Cloud collaborators: credential loading, service-account auth,
//! Vision OCR, Firebase Storage and FCM push.

pub mod auth;
pub mod credentials;
pub mod fcm;
pub mod storage;
pub mod vision;

use crate::config::Config;
use crate::error::BudgetError;
use backon::ExponentialBuilder;
use std::time::Duration;

pub use auth::GoogleAuth;
pub use credentials::{CloudCredentials, CredentialLoader};
pub use fcm::FcmClient;
pub use storage::FirebaseStorage;
pub use vision::VisionClient;

/// Shared outbound HTTP client for every Google endpoint.
pub fn build_http_client(cfg: &Config) -> Result<reqwest::Client, BudgetError> {
    let mut builder = reqwest::Client::builder()
        .user_agent(concat!("budgetlytic/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(Duration::from_secs(5))
        .timeout(Duration::from_secs(30));
    if let Some(proxy_url) = cfg.proxy.as_ref() {
        builder = builder.proxy(reqwest::Proxy::all(proxy_url.as_str())?);
    }
    Ok(builder.build()?)
}

pub(crate) fn default_retry_policy() -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_millis(500))
        .with_max_delay(Duration::from_secs(3))
        .with_max_times(3)
        .with_jitter()
}
