use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How an expense entered the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpenseKind {
    Manual,
    Voice,
}

impl ExpenseKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExpenseKind::Manual => "manual",
            ExpenseKind::Voice => "voice",
        }
    }
}

impl fmt::Display for ExpenseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExpenseKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manual" => Ok(ExpenseKind::Manual),
            "voice" => Ok(ExpenseKind::Voice),
            other => Err(format!("unknown expense kind `{other}`")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Expense {
    pub id: i64,
    pub user_id: String,
    pub category: String,
    pub amount: f64,
    pub note: String,
    #[serde(rename = "type")]
    pub kind: ExpenseKind,
    pub created_at: DateTime<FixedOffset>,
}

#[derive(Debug, Clone)]
pub struct NewExpense {
    pub user_id: String,
    pub category: String,
    pub amount: f64,
    pub note: String,
    pub kind: ExpenseKind,
    pub created_at: DateTime<FixedOffset>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Bill {
    pub id: i64,
    pub user_id: String,
    pub img_url: String,
    pub ocr_text: String,
    pub category: Option<String>,
    pub created_at: DateTime<FixedOffset>,
}

#[derive(Debug, Clone)]
pub struct NewBill {
    pub user_id: String,
    pub img_url: String,
    pub ocr_text: String,
    pub category: Option<String>,
    pub created_at: DateTime<FixedOffset>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Reminder {
    pub id: i64,
    pub user_id: String,
    pub message: String,
    pub remind_at: DateTime<FixedOffset>,
    pub created_at: DateTime<FixedOffset>,
    pub sent: bool,
}

#[derive(Debug, Clone)]
pub struct NewReminder {
    pub user_id: String,
    pub message: String,
    pub remind_at: DateTime<FixedOffset>,
    pub created_at: DateTime<FixedOffset>,
}

/// Unsent reminder joined with its owner's device token.
#[derive(Debug, Clone, PartialEq)]
pub struct DueReminder {
    pub id: i64,
    pub user_id: String,
    pub message: String,
    pub token: String,
}
