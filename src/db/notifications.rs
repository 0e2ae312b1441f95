//! In-app notification feed rows

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

/// Notification row from database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRow {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: String,
}

impl NotificationRow {
    fn from_row(row: &Row) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            title: row.get("title")?,
            message: row.get("message")?,
            is_read: row.get::<_, i64>("is_read")? != 0,
            created_at: row.get("created_at")?,
        })
    }
}

/// Insert a notification for one user
pub fn insert(
    conn: &Connection,
    user_id: i64,
    title: &str,
    message: &str,
) -> Result<i64, LedgerError> {
    conn.execute(
        "INSERT INTO notifications (user_id, title, message) VALUES (?, ?, ?)",
        params![user_id, title, message],
    )?;
    Ok(conn.last_insert_rowid())
}

/// A user's notifications, newest first (last 100)
pub fn list_for(conn: &Connection, user_id: i64) -> Result<Vec<NotificationRow>, LedgerError> {
    let mut stmt = conn.prepare(
        "SELECT * FROM notifications WHERE user_id = ?
         ORDER BY created_at DESC, id DESC LIMIT 100",
    )?;
    let rows = stmt
        .query_map(params![user_id], NotificationRow::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Count of unread notifications
pub fn unread_count(conn: &Connection, user_id: i64) -> Result<u32, LedgerError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM notifications WHERE user_id = ? AND is_read = 0",
        params![user_id],
        |row| row.get(0),
    )?;
    Ok(count as u32)
}

/// Mark all of a user's notifications read
pub fn mark_all_read(conn: &Connection, user_id: i64) -> Result<(), LedgerError> {
    conn.execute(
        "UPDATE notifications SET is_read = 1 WHERE user_id = ?",
        params![user_id],
    )?;
    Ok(())
}
