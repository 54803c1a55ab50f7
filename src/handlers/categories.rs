use axum::{Json, extract::State, http::StatusCode};

use crate::service::categorizer::{Category, Suggestion};
use crate::types::category::{AddCategoryRequest, SuggestRequest};
use crate::{BudgetError, router::BudgetState};

const MAX_SUGGESTIONS: usize = 12;

/// GET /categories
pub async fn list_categories(State(state): State<BudgetState>) -> Json<Vec<Category>> {
    Json(state.categorizer.read().await.categories().to_vec())
}

/// POST /categories/suggest
pub async fn suggest_categories(
    State(state): State<BudgetState>,
    Json(req): Json<SuggestRequest>,
) -> Result<Json<Vec<Suggestion>>, BudgetError> {
    if req.text.trim().is_empty() {
        return Err(BudgetError::Validation("text must not be empty".to_string()));
    }
    let top_n = req.top_n.clamp(1, MAX_SUGGESTIONS);
    Ok(Json(state.categorizer.read().await.suggest(&req.text, top_n)))
}

/// POST /categories
///
/// The write lock is held across the file write so concurrent additions
/// persist in order.
pub async fn add_category(
    State(state): State<BudgetState>,
    Json(req): Json<AddCategoryRequest>,
) -> Result<(StatusCode, Json<Category>), BudgetError> {
    let mut categorizer = state.categorizer.write().await;
    let category = categorizer.add_custom(&req.name, req.emoji.as_deref(), &req.keywords)?;
    categorizer.save(&state.categories_file).await?;
    Ok((StatusCode::CREATED, Json(category)))
}
