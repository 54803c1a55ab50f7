//! SQL DDL for initializing the budget storage.
//! SQLite-first design; can be adapted for other RDBMS.

/// Every record is scoped by `user_id`. Timestamps are RFC3339 text, each
/// paired with a unix-seconds column (`created_ts`, `remind_ts`) that all
/// ordering and range queries use.
/// `push_tokens` holds at most one device token per user.
pub const SQLITE_INIT: &str = r#"
CREATE TABLE IF NOT EXISTS expenses (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL,
    category TEXT NOT NULL,
    amount REAL NOT NULL,
    note TEXT NOT NULL DEFAULT '',
    kind TEXT NOT NULL,
    created_at TEXT NOT NULL,
    created_ts INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_expenses_user ON expenses(user_id, created_ts);

CREATE TABLE IF NOT EXISTS bills (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL,
    img_url TEXT NOT NULL,
    ocr_text TEXT NOT NULL,
    category TEXT NULL,
    created_at TEXT NOT NULL,
    created_ts INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_bills_user ON bills(user_id, created_ts);

CREATE TABLE IF NOT EXISTS reminders (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL,
    message TEXT NOT NULL,
    remind_at TEXT NOT NULL,
    remind_ts INTEGER NOT NULL,
    created_at TEXT NOT NULL,
    sent INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_reminders_due ON reminders(sent, remind_ts);

CREATE TABLE IF NOT EXISTS push_tokens (
    user_id TEXT PRIMARY KEY,
    token TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
"#;
