//! Database module: models and schema for persistent storage.
//!
//! Layout:
//! - `models.rs`: Rust structs mirroring DB rows
//! - `schema.rs`: SQL DDL for initializing the database (SQLite-first)
//! - `sqlite.rs`: `BudgetStorage`, the query layer used by handlers and the reminder actor

pub mod models;
pub mod schema;
pub mod sqlite;

pub use models::{Bill, DueReminder, Expense, ExpenseKind, NewBill, NewExpense, NewReminder, Reminder};
pub use schema::SQLITE_INIT;
pub use sqlite::{BudgetStorage, SqlitePool};
