use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct AddReminderRequest {
    pub message: String,
    /// RFC3339, or a naive `YYYY-MM-DDTHH:MM[:SS]` in the service's local time.
    pub remind_at: String,
}

#[derive(Debug, Deserialize)]
pub struct PushTokenRequest {
    pub token: String,
}
