use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::info;

use crate::db::{Expense, ExpenseKind, NewExpense};
use crate::handlers::require_user;
use crate::service::{insights, voice};
use crate::types::expense::{
    AddExpenseRequest, MessageResponse, VoiceExpenseRequest, VoiceExpenseResponse,
};
use crate::{BudgetError, router::BudgetState};

/// POST /add_expense
pub async fn add_expense(
    State(state): State<BudgetState>,
    Json(req): Json<AddExpenseRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), BudgetError> {
    require_user(&req.user_id)?;
    let category = req.category.trim();
    if category.is_empty() {
        return Err(BudgetError::Validation("category must not be empty".to_string()));
    }
    if !req.amount.is_finite() || req.amount <= 0.0 {
        return Err(BudgetError::Validation(
            "amount must be a positive number".to_string(),
        ));
    }

    let id = state
        .storage
        .insert_expense(NewExpense {
            user_id: req.user_id.clone(),
            category: category.to_string(),
            amount: req.amount,
            note: req.note,
            kind: ExpenseKind::Manual,
            created_at: state.clock.now(),
        })
        .await?;
    info!(id, user = %req.user_id, "manual expense added");
    Ok((StatusCode::CREATED, Json(MessageResponse::new("Expense added!"))))
}

/// POST /voice_expense
pub async fn voice_expense(
    State(state): State<BudgetState>,
    Json(req): Json<VoiceExpenseRequest>,
) -> Result<(StatusCode, Json<VoiceExpenseResponse>), BudgetError> {
    require_user(&req.user_id)?;
    let transcript = req.transcript.trim().to_string();
    if transcript.is_empty() {
        return Err(BudgetError::Validation(
            "transcript must not be empty".to_string(),
        ));
    }

    let parsed = voice::parse_transcript(&transcript);
    let id = state
        .storage
        .insert_expense(NewExpense {
            user_id: req.user_id.clone(),
            category: parsed.category.clone(),
            amount: parsed.amount,
            note: transcript.clone(),
            kind: ExpenseKind::Voice,
            created_at: state.clock.now(),
        })
        .await?;
    info!(id, user = %req.user_id, category = %parsed.category, "voice expense added");

    Ok((
        StatusCode::CREATED,
        Json(VoiceExpenseResponse {
            transcript,
            category: parsed.category,
            amount: parsed.amount,
        }),
    ))
}

/// GET /expenses/{user_id}
pub async fn get_expenses(
    State(state): State<BudgetState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<Expense>>, BudgetError> {
    Ok(Json(state.storage.list_expenses(&user_id).await?))
}

/// GET /insights/{user_id}
pub async fn get_insights(
    State(state): State<BudgetState>,
    Path(user_id): Path<String>,
) -> Result<Response, BudgetError> {
    let expenses = state.storage.list_expenses(&user_id).await?;
    Ok(match insights::summarize(&expenses, state.clock.offset()) {
        Some(summary) => Json(summary).into_response(),
        None => Json(MessageResponse::new("No data")).into_response(),
    })
}
