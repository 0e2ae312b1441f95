//! Append-only point adjustment rows
//!
//! Two disjoint ledgers: `point_adjustments` holds signed deltas against a
//! single student, `group_point_adjustments` holds the group's direct bucket.
//! Rows are only ever inserted; totals come from summing them.

use rusqlite::{params, Connection};

use crate::error::LedgerError;

/// Append a signed delta to a student's ledger
pub fn insert_student_adjustment(
    conn: &Connection,
    student_id: i64,
    points: i64,
    reason: &str,
    adjusted_by: Option<i64>,
) -> Result<i64, LedgerError> {
    conn.execute(
        "INSERT INTO point_adjustments (student_id, points, reason, adjusted_by)
         VALUES (?, ?, ?, ?)",
        params![student_id, points, reason, adjusted_by],
    )?;
    Ok(conn.last_insert_rowid())
}

/// A group-direct bucket append
#[derive(Debug, Clone)]
pub struct GroupAdjustment<'a> {
    pub group_id: i64,
    pub points: i64,
    /// Set when the delta was derived from a percentage request
    pub percentage: Option<u32>,
    /// Whether a parallel per-member distribution was also performed
    pub apply_to_members: bool,
    pub reason: &'a str,
    pub adjusted_by: Option<i64>,
}

/// Append a signed delta to a group's direct bucket
pub fn insert_group_adjustment(
    conn: &Connection,
    adj: &GroupAdjustment,
) -> Result<i64, LedgerError> {
    conn.execute(
        "INSERT INTO group_point_adjustments
             (group_id, points, percentage, is_percentage, apply_to_members, reason, adjusted_by)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
        params![
            adj.group_id,
            adj.points,
            adj.percentage,
            adj.percentage.is_some() as i64,
            adj.apply_to_members as i64,
            adj.reason,
            adj.adjusted_by
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Sum of a student's individual adjustments
pub fn sum_for_student(conn: &Connection, student_id: i64) -> Result<i64, LedgerError> {
    let total: i64 = conn.query_row(
        "SELECT COALESCE(SUM(points), 0) FROM point_adjustments WHERE student_id = ?",
        params![student_id],
        |row| row.get(0),
    )?;
    Ok(total)
}

/// Sum of individual adjustments across a group's members
pub fn sum_for_group_members(conn: &Connection, group_id: i64) -> Result<i64, LedgerError> {
    let total: i64 = conn.query_row(
        "SELECT COALESCE(SUM(pa.points), 0)
         FROM point_adjustments pa
         JOIN students s ON pa.student_id = s.id
         WHERE s.group_id = ?",
        params![group_id],
        |row| row.get(0),
    )?;
    Ok(total)
}

/// Sum of a group's direct bucket
pub fn direct_sum_for_group(conn: &Connection, group_id: i64) -> Result<i64, LedgerError> {
    let total: i64 = conn.query_row(
        "SELECT COALESCE(SUM(points), 0) FROM group_point_adjustments WHERE group_id = ?",
        params![group_id],
        |row| row.get(0),
    )?;
    Ok(total)
}
