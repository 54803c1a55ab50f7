use crate::db::Expense;
use chrono::FixedOffset;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CategoryTotal {
    pub category: String,
    pub total: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MonthTotal {
    /// `YYYY-MM` in the service's local offset.
    pub month: String,
    pub total: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Insights {
    /// Highest spend first.
    pub categorywise: Vec<CategoryTotal>,
    /// Chronological.
    pub monthly: Vec<MonthTotal>,
    pub total_spent: f64,
    pub num_expenses: usize,
}

/// Summary statistics over a user's expenses; `None` when there are none.
pub fn summarize(expenses: &[Expense], offset: FixedOffset) -> Option<Insights> {
    if expenses.is_empty() {
        return None;
    }

    let mut by_category: BTreeMap<&str, f64> = BTreeMap::new();
    let mut by_month: BTreeMap<String, f64> = BTreeMap::new();
    for e in expenses {
        *by_category.entry(e.category.as_str()).or_default() += e.amount;
        let month = e.created_at.with_timezone(&offset).format("%Y-%m").to_string();
        *by_month.entry(month).or_default() += e.amount;
    }

    let mut categorywise: Vec<CategoryTotal> = by_category
        .into_iter()
        .map(|(category, total)| CategoryTotal {
            category: category.to_string(),
            total,
        })
        .collect();
    categorywise.sort_by(|a, b| b.total.total_cmp(&a.total));

    Some(Insights {
        categorywise,
        monthly: by_month
            .into_iter()
            .map(|(month, total)| MonthTotal { month, total })
            .collect(),
        total_spent: expenses.iter().map(|e| e.amount).sum(),
        num_expenses: expenses.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::ExpenseKind;
    use chrono::TimeZone;

    fn expense(category: &str, amount: f64, y: i32, m: u32, d: u32) -> Expense {
        let ist = FixedOffset::east_opt(19800).unwrap();
        Expense {
            id: 0,
            user_id: "alice".into(),
            category: category.into(),
            amount,
            note: String::new(),
            kind: ExpenseKind::Manual,
            created_at: ist.with_ymd_and_hms(y, m, d, 10, 0, 0).unwrap(),
        }
    }

    #[test]
    fn empty_history_has_no_insights() {
        assert!(summarize(&[], FixedOffset::east_opt(0).unwrap()).is_none());
    }

    #[test]
    fn totals_by_category_and_month() {
        let expenses = vec![
            expense("Transport", 100.0, 2025, 6, 30),
            expense("Food & Dining", 250.0, 2025, 7, 1),
            expense("Transport", 50.0, 2025, 7, 2),
            expense("Food & Dining", 30.0, 2025, 7, 3),
        ];
        let insights = summarize(&expenses, FixedOffset::east_opt(19800).unwrap()).unwrap();
        assert_eq!(insights.num_expenses, 4);
        assert_eq!(insights.total_spent, 430.0);
        assert_eq!(insights.categorywise[0].category, "Food & Dining");
        assert_eq!(insights.categorywise[0].total, 280.0);
        assert_eq!(insights.categorywise[1].total, 150.0);
        assert_eq!(
            insights.monthly,
            vec![
                MonthTotal { month: "2025-06".into(), total: 100.0 },
                MonthTotal { month: "2025-07".into(), total: 330.0 },
            ]
        );
    }
}
