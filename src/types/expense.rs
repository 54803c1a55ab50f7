use crate::service::bill_text::BillItem;
use serde::{Deserialize, Serialize};

pub const ANONYMOUS_USER: &str = "anonymous";

pub fn anonymous() -> String {
    ANONYMOUS_USER.to_string()
}

#[derive(Debug, Deserialize)]
pub struct AddExpenseRequest {
    #[serde(default = "anonymous")]
    pub user_id: String,
    pub category: String,
    pub amount: f64,
    #[serde(default)]
    pub note: String,
}

/// A voice note that has already been transcribed by the client.
#[derive(Debug, Deserialize)]
pub struct VoiceExpenseRequest {
    #[serde(default = "anonymous")]
    pub user_id: String,
    pub transcript: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VoiceExpenseResponse {
    pub transcript: String,
    pub category: String,
    pub amount: f64,
}

#[derive(Debug, Serialize)]
pub struct UploadBillResponse {
    pub ocr_text: String,
    pub img_url: String,
    pub category: Option<String>,
    pub items: Vec<BillItem>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
