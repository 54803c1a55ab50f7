pub mod bills;
pub mod categories;
pub mod expenses;
pub mod health;
pub mod reminders;

use crate::error::BudgetError;

pub(crate) fn require_user(user_id: &str) -> Result<(), BudgetError> {
    if user_id.trim().is_empty() {
        return Err(BudgetError::Validation("user_id must not be empty".to_string()));
    }
    Ok(())
}
