//! Best-effort operation log
//!
//! One denormalized row per mutating point operation, for audit and UI
//! display. Totals never depend on this table; callers swallow append
//! failures after the primary ledger write has succeeded.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

/// Operation log entry to append
#[derive(Debug, Clone)]
pub struct OplogEntry<'a> {
    /// e.g. "add", "subtract", "percentage_add", "percentage_subtract"
    pub operation_type: &'a str,
    /// "student" or "group"
    pub target_type: &'a str,
    pub target_id: i64,
    pub group_id: Option<i64>,
    pub points: Option<i64>,
    pub percentage: Option<u32>,
    pub reason: &'a str,
    pub performed_by: Option<i64>,
}

/// Operation log row from database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OplogRow {
    pub id: i64,
    pub operation_type: String,
    pub target_type: String,
    pub target_id: i64,
    pub group_id: Option<i64>,
    pub points: Option<i64>,
    pub percentage: Option<u32>,
    pub reason: Option<String>,
    pub performed_by: Option<i64>,
    pub created_at: String,
}

impl OplogRow {
    fn from_row(row: &Row) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            operation_type: row.get("operation_type")?,
            target_type: row.get("target_type")?,
            target_id: row.get("target_id")?,
            group_id: row.get("group_id")?,
            points: row.get("points")?,
            percentage: row.get("percentage")?,
            reason: row.get("reason")?,
            performed_by: row.get("performed_by")?,
            created_at: row.get("created_at")?,
        })
    }
}

/// Append an operation log row
pub fn append(conn: &Connection, entry: &OplogEntry) -> Result<(), LedgerError> {
    conn.execute(
        "INSERT INTO points_log
             (operation_type, target_type, target_id, group_id, points, percentage, reason, performed_by)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        params![
            entry.operation_type,
            entry.target_type,
            entry.target_id,
            entry.group_id,
            entry.points,
            entry.percentage,
            entry.reason,
            entry.performed_by
        ],
    )?;
    Ok(())
}

/// Most recent operations, newest first; limit clamped to 10..=500
pub fn recent(conn: &Connection, limit: u32) -> Result<Vec<OplogRow>, LedgerError> {
    let limit = limit.clamp(10, 500);
    let mut stmt = conn.prepare("SELECT * FROM points_log ORDER BY id DESC LIMIT ?")?;
    let rows = stmt
        .query_map(params![limit], OplogRow::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
