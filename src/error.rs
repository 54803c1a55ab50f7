use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use sqlx::Error as SqlxError;
use std::path::PathBuf;
use thiserror::Error as ThisError;

/// Startup configuration failures. All of them are fatal.
#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("missing required configuration value `{key}`")]
    MissingKey { key: &'static str },

    #[error("credential file `{}` is not readable: {source}", path.display())]
    CredentialFileUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse env file: {0}")]
    EnvFile(#[from] dotenvy::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("configuration extraction failed: {0}")]
    Figment(#[from] Box<figment::Error>),
}

#[derive(Debug, ThisError)]
pub enum BudgetError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("HTTP request error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    DatabaseError(#[from] SqlxError),

    #[error("Google authentication error: {0}")]
    GoogleAuth(String),

    #[error("Vision API error {code}: {message}")]
    Vision { code: i32, message: String },

    #[error("Push delivery rejected: {0}")]
    PushRejected(String),

    #[error("Push notifications disabled; FCM_SERVER_KEY not set")]
    PushDisabled,

    #[error("Upstream error with status: {0}")]
    UpstreamStatus(StatusCode),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Ractor error: {0}")]
    RactorError(String),
}

impl From<gcp_auth::Error> for BudgetError {
    fn from(e: gcp_auth::Error) -> Self {
        BudgetError::GoogleAuth(e.to_string())
    }
}

/// Errors worth another attempt against an upstream service.
pub trait IsRetryable {
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for BudgetError {
    fn is_retryable(&self) -> bool {
        match self {
            BudgetError::Reqwest(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            BudgetError::UpstreamStatus(code) => {
                code.is_server_error() || *code == StatusCode::TOO_MANY_REQUESTS
            }
            _ => false,
        }
    }
}

impl IntoResponse for BudgetError {
    fn into_response(self) -> axum::response::Response {
        let (status, code, message) = match &self {
            BudgetError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "INVALID_REQUEST", msg.clone())
            }
            BudgetError::NotFound(what) => (StatusCode::NOT_FOUND, "NOT_FOUND", what.clone()),
            BudgetError::GoogleAuth(_) => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "Cloud credential rejected; check the service account key.".to_string(),
            ),
            BudgetError::PushDisabled => (
                StatusCode::SERVICE_UNAVAILABLE,
                "PUSH_DISABLED",
                "Push notifications are not configured.".to_string(),
            ),
            BudgetError::Reqwest(_) | BudgetError::UrlParse(_) => (
                StatusCode::BAD_GATEWAY,
                "BAD_GATEWAY",
                "Upstream service is unavailable.".to_string(),
            ),
            BudgetError::Vision { message, .. } => {
                (StatusCode::BAD_GATEWAY, "OCR_FAILED", message.clone())
            }
            BudgetError::PushRejected(reason) => {
                (StatusCode::BAD_GATEWAY, "PUSH_REJECTED", reason.clone())
            }
            BudgetError::UpstreamStatus(code) => {
                let (err_code, msg) = match *code {
                    StatusCode::TOO_MANY_REQUESTS => ("RATE_LIMIT", "Upstream rate limit exceeded."),
                    StatusCode::UNAUTHORIZED => ("UNAUTHORIZED", "Upstream authentication failed."),
                    StatusCode::FORBIDDEN => ("FORBIDDEN", "Upstream permission denied."),
                    StatusCode::NOT_FOUND => ("NOT_FOUND", "Upstream resource not found."),
                    _ => ("UPSTREAM_ERROR", "An upstream error occurred."),
                };
                (*code, err_code, msg.to_string())
            }
            BudgetError::Config(_)
            | BudgetError::Json(_)
            | BudgetError::Io(_)
            | BudgetError::DatabaseError(_)
            | BudgetError::RactorError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal server error occurred.".to_string(),
            ),
        };
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = ApiErrorResponse {
            error: ApiErrorBody {
                code: code.to_string(),
                message,
            },
        };
        (status, Json(body)).into_response()
    }
}

/// Standardized API error response body
#[derive(Serialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorBody,
}
