use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::info;

use crate::db::{NewReminder, Reminder};
use crate::handlers::require_user;
use crate::types::reminder::{AddReminderRequest, PushTokenRequest};
use crate::{BudgetError, router::BudgetState};

/// POST /reminders/{user_id}
pub async fn add_reminder(
    State(state): State<BudgetState>,
    Path(user_id): Path<String>,
    Json(req): Json<AddReminderRequest>,
) -> Result<(StatusCode, Json<Reminder>), BudgetError> {
    require_user(&user_id)?;
    let message = req.message.trim();
    if message.is_empty() {
        return Err(BudgetError::Validation("message must not be empty".to_string()));
    }
    let remind_at = state.clock.parse_local(&req.remind_at)?;

    let id = state
        .storage
        .insert_reminder(NewReminder {
            user_id: user_id.clone(),
            message: message.to_string(),
            remind_at,
            created_at: state.clock.now(),
        })
        .await?;
    info!(id, user = %user_id, remind_at = %remind_at, "reminder set");
    Ok((StatusCode::CREATED, Json(state.storage.get_reminder(id).await?)))
}

/// GET /reminders/{user_id}: reminders not yet due, soonest first.
pub async fn list_reminders(
    State(state): State<BudgetState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<Reminder>>, BudgetError> {
    Ok(Json(
        state
            .storage
            .upcoming_reminders(&user_id, state.clock.now())
            .await?,
    ))
}

/// DELETE /reminders/{user_id}/{id}
pub async fn delete_reminder(
    State(state): State<BudgetState>,
    Path((user_id, id)): Path<(String, i64)>,
) -> Result<StatusCode, BudgetError> {
    if !state.storage.delete_reminder(&user_id, id).await? {
        return Err(BudgetError::NotFound(format!("reminder {id}")));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// POST /push_token/{user_id}
pub async fn register_push_token(
    State(state): State<BudgetState>,
    Path(user_id): Path<String>,
    Json(req): Json<PushTokenRequest>,
) -> Result<StatusCode, BudgetError> {
    require_user(&user_id)?;
    let token = req.token.trim();
    if token.is_empty() {
        return Err(BudgetError::Validation("token must not be empty".to_string()));
    }
    state
        .storage
        .upsert_push_token(&user_id, token, state.clock.now())
        .await?;
    info!(user = %user_id, "push token registered");
    Ok(StatusCode::NO_CONTENT)
}
