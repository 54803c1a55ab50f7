use crate::db::models::{
    Bill, DueReminder, Expense, ExpenseKind, NewBill, NewExpense, NewReminder, Reminder,
};
use crate::db::schema::SQLITE_INIT;
use crate::error::BudgetError;
use chrono::{DateTime, FixedOffset};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Pool, Row, Sqlite};
use std::str::FromStr;
use tracing::info;

pub type SqlitePool = Pool<Sqlite>;

#[derive(Clone)]
pub struct BudgetStorage {
    pool: SqlitePool,
}

impl BudgetStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if missing) the database at `database_url` and apply the schema.
    pub async fn connect(database_url: &str) -> Result<Self, BudgetError> {
        let connect_opts = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_opts)
            .await?;
        let storage = Self::new(pool);
        storage.init_schema().await?;
        info!(database_url, "storage ready");
        Ok(storage)
    }

    /// Initialize the schema by executing the bundled DDL.
    pub async fn init_schema(&self) -> Result<(), BudgetError> {
        // sqlx::query runs one statement at a time
        for stmt in SQLITE_INIT.split(';') {
            let s = stmt.trim();
            if s.is_empty() {
                continue;
            }
            sqlx::query(s).execute(&self.pool).await?;
        }
        Ok(())
    }

    pub async fn insert_expense(&self, expense: NewExpense) -> Result<i64, BudgetError> {
        let res = sqlx::query(
            r#"INSERT INTO expenses (user_id, category, amount, note, kind, created_at, created_ts)
               VALUES (?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(expense.user_id)
        .bind(expense.category)
        .bind(expense.amount)
        .bind(expense.note)
        .bind(expense.kind.as_str())
        .bind(expense.created_at.to_rfc3339())
        .bind(expense.created_at.timestamp())
        .execute(&self.pool)
        .await?;
        Ok(res.last_insert_rowid())
    }

    /// All expenses of a user, newest first.
    pub async fn list_expenses(&self, user_id: &str) -> Result<Vec<Expense>, BudgetError> {
        let rows = sqlx::query(
            r#"SELECT id, user_id, category, amount, note, kind, created_at
               FROM expenses WHERE user_id = ?
               ORDER BY created_ts DESC, id DESC"#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Self::row_to_expense).collect()
    }

    pub async fn insert_bill(&self, bill: NewBill) -> Result<i64, BudgetError> {
        let res = sqlx::query(
            r#"INSERT INTO bills (user_id, img_url, ocr_text, category, created_at, created_ts)
               VALUES (?, ?, ?, ?, ?, ?)"#,
        )
        .bind(bill.user_id)
        .bind(bill.img_url)
        .bind(bill.ocr_text)
        .bind(bill.category)
        .bind(bill.created_at.to_rfc3339())
        .bind(bill.created_at.timestamp())
        .execute(&self.pool)
        .await?;
        Ok(res.last_insert_rowid())
    }

    /// Bills of a user, newest first.
    pub async fn list_bills(&self, user_id: &str) -> Result<Vec<Bill>, BudgetError> {
        let rows = sqlx::query(
            r#"SELECT id, user_id, img_url, ocr_text, category, created_at
               FROM bills WHERE user_id = ?
               ORDER BY created_ts DESC, id DESC"#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Self::row_to_bill).collect()
    }

    pub async fn insert_reminder(&self, reminder: NewReminder) -> Result<i64, BudgetError> {
        let res = sqlx::query(
            r#"INSERT INTO reminders (user_id, message, remind_at, remind_ts, created_at, sent)
               VALUES (?, ?, ?, ?, ?, 0)"#,
        )
        .bind(reminder.user_id)
        .bind(reminder.message)
        .bind(reminder.remind_at.to_rfc3339())
        .bind(reminder.remind_at.timestamp())
        .bind(reminder.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(res.last_insert_rowid())
    }

    /// Reminders of a user due at or after `from`, soonest first.
    pub async fn upcoming_reminders(
        &self,
        user_id: &str,
        from: DateTime<FixedOffset>,
    ) -> Result<Vec<Reminder>, BudgetError> {
        let rows = sqlx::query(
            r#"SELECT id, user_id, message, remind_at, created_at, sent
               FROM reminders WHERE user_id = ? AND remind_ts >= ?
               ORDER BY remind_ts, id"#,
        )
        .bind(user_id)
        .bind(from.timestamp())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Self::row_to_reminder).collect()
    }

    pub async fn get_reminder(&self, id: i64) -> Result<Reminder, BudgetError> {
        let row = sqlx::query(
            r#"SELECT id, user_id, message, remind_at, created_at, sent
               FROM reminders WHERE id = ?"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| BudgetError::NotFound(format!("reminder {id}")))?;
        Self::row_to_reminder(row)
    }

    /// Returns false when the user owns no reminder with that id.
    pub async fn delete_reminder(&self, user_id: &str, id: i64) -> Result<bool, BudgetError> {
        let res = sqlx::query("DELETE FROM reminders WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    pub async fn upsert_push_token(
        &self,
        user_id: &str,
        token: &str,
        now: DateTime<FixedOffset>,
    ) -> Result<(), BudgetError> {
        sqlx::query(
            r#"INSERT INTO push_tokens (user_id, token, updated_at) VALUES (?, ?, ?)
               ON CONFLICT(user_id) DO UPDATE SET
                   token = excluded.token,
                   updated_at = excluded.updated_at"#,
        )
        .bind(user_id)
        .bind(token)
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Unsent reminders due at `now`, limited to users with a device token.
    pub async fn due_reminders(
        &self,
        now: DateTime<FixedOffset>,
    ) -> Result<Vec<DueReminder>, BudgetError> {
        let rows = sqlx::query(
            r#"SELECT r.id, r.user_id, r.message, p.token
               FROM reminders r
               JOIN push_tokens p ON p.user_id = r.user_id
               WHERE r.sent = 0 AND r.remind_ts <= ?
               ORDER BY r.remind_ts, r.id"#,
        )
        .bind(now.timestamp())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter()
            .map(|row| {
                Ok(DueReminder {
                    id: row.try_get("id")?,
                    user_id: row.try_get("user_id")?,
                    message: row.try_get("message")?,
                    token: row.try_get("token")?,
                })
            })
            .collect()
    }

    pub async fn mark_reminder_sent(&self, id: i64) -> Result<(), BudgetError> {
        let res = sqlx::query("UPDATE reminders SET sent = 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if res.rows_affected() == 0 {
            return Err(BudgetError::NotFound(format!("reminder {id}")));
        }
        Ok(())
    }

    fn row_to_expense(row: SqliteRow) -> Result<Expense, BudgetError> {
        let kind_str: String = row.try_get("kind")?;
        let kind = ExpenseKind::from_str(&kind_str)
            .map_err(|e| sqlx::Error::Decode(e.into()))?;
        Ok(Expense {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            category: row.try_get("category")?,
            amount: row.try_get("amount")?,
            note: row.try_get("note")?,
            kind,
            created_at: parse_timestamp(&row, "created_at")?,
        })
    }

    fn row_to_bill(row: SqliteRow) -> Result<Bill, BudgetError> {
        Ok(Bill {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            img_url: row.try_get("img_url")?,
            ocr_text: row.try_get("ocr_text")?,
            category: row.try_get("category")?,
            created_at: parse_timestamp(&row, "created_at")?,
        })
    }

    fn row_to_reminder(row: SqliteRow) -> Result<Reminder, BudgetError> {
        let sent_i: i64 = row.try_get("sent")?;
        Ok(Reminder {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            message: row.try_get("message")?,
            remind_at: parse_timestamp(&row, "remind_at")?,
            created_at: parse_timestamp(&row, "created_at")?,
            sent: sent_i != 0,
        })
    }
}

fn parse_timestamp(row: &SqliteRow, column: &str) -> Result<DateTime<FixedOffset>, BudgetError> {
    let raw: String = row.try_get(column)?;
    Ok(DateTime::parse_from_rfc3339(&raw).map_err(|e| sqlx::Error::Decode(Box::new(e)))?)
}
