use anyhow::Context;
use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;
use std::path::Path;

pub const DB_FILE_NAME: &str = "collegedesk.sqlite3";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(DB_FILE_NAME);
    let conn = Connection::open(&db_path)
        .with_context(|| format!("failed to open {}", db_path.to_string_lossy()))?;
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS settings(
            key TEXT PRIMARY KEY,
            value_json TEXT NOT NULL,
            updated_at TEXT
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS payment_attempts(
            id TEXT PRIMARY KEY,
            order_id TEXT NOT NULL,
            student_name TEXT NOT NULL,
            amount REAL NOT NULL,
            outcome TEXT NOT NULL,
            step TEXT NOT NULL,
            transaction_id TEXT,
            message TEXT,
            created_at TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_payment_attempts_order ON payment_attempts(order_id)",
        [],
    )?;

    // Workspaces created before receipts were tracked lack this column.
    ensure_payment_attempts_receipt_number(&conn)?;

    Ok(conn)
}

pub fn settings_get_json(conn: &Connection, key: &str) -> anyhow::Result<Option<serde_json::Value>> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT value_json FROM settings WHERE key = ?",
            [key],
            |r| r.get(0),
        )
        .optional()?;
    match raw {
        Some(s) => Ok(Some(
            serde_json::from_str(&s).with_context(|| format!("corrupt setting {key}"))?,
        )),
        None => Ok(None),
    }
}

pub fn settings_set_json(
    conn: &Connection,
    key: &str,
    value: &serde_json::Value,
) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO settings(key, value_json, updated_at) VALUES(?, ?, ?)
         ON CONFLICT(key) DO UPDATE SET value_json = excluded.value_json, updated_at = excluded.updated_at",
        (key, value.to_string(), chrono::Utc::now().to_rfc3339()),
    )?;
    Ok(())
}

pub fn settings_delete(conn: &Connection, key: &str) -> anyhow::Result<()> {
    conn.execute("DELETE FROM settings WHERE key = ?", [key])?;
    Ok(())
}

pub fn settings_get_string(conn: &Connection, key: &str) -> anyhow::Result<Option<String>> {
    Ok(settings_get_json(conn, key)?.and_then(|v| v.as_str().map(|s| s.to_string())))
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentAttempt {
    pub id: String,
    pub order_id: String,
    pub student_name: String,
    pub amount: f64,
    pub outcome: String,
    pub step: String,
    pub transaction_id: Option<String>,
    pub message: Option<String>,
    pub receipt_number: Option<String>,
    pub created_at: String,
}

pub fn insert_payment_attempt(conn: &Connection, a: &PaymentAttempt) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO payment_attempts(
            id, order_id, student_name, amount, outcome, step,
            transaction_id, message, receipt_number, created_at
         ) VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        rusqlite::params![
            a.id,
            a.order_id,
            a.student_name,
            a.amount,
            a.outcome,
            a.step,
            a.transaction_id,
            a.message,
            a.receipt_number,
            a.created_at,
        ],
    )?;
    Ok(())
}

pub fn list_payment_attempts(
    conn: &Connection,
    order_id: Option<&str>,
) -> anyhow::Result<Vec<PaymentAttempt>> {
    let mut stmt = conn.prepare(
        "SELECT id, order_id, student_name, amount, outcome, step,
                transaction_id, message, receipt_number, created_at
         FROM payment_attempts
         WHERE (?1 IS NULL OR order_id = ?1)
         ORDER BY created_at DESC, rowid DESC",
    )?;
    let rows = stmt
        .query_map([order_id], |row| {
            Ok(PaymentAttempt {
                id: row.get(0)?,
                order_id: row.get(1)?,
                student_name: row.get(2)?,
                amount: row.get(3)?,
                outcome: row.get(4)?,
                step: row.get(5)?,
                transaction_id: row.get(6)?,
                message: row.get(7)?,
                receipt_number: row.get(8)?,
                created_at: row.get(9)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn ensure_payment_attempts_receipt_number(conn: &Connection) -> anyhow::Result<()> {
    if table_has_column(conn, "payment_attempts", "receipt_number")? {
        return Ok(());
    }
    conn.execute(
        "ALTER TABLE payment_attempts ADD COLUMN receipt_number TEXT",
        [],
    )?;
    Ok(())
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> anyhow::Result<bool> {
    let sql = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}
