//! Task request rows
//!
//! A request is a student's claim of committee work worth 1..=5 points. It is
//! created pending and reviewed exactly once: the transition to approved or
//! rejected is terminal. Only approved requests feed the points ledger.

use std::fmt;
use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

/// Committee a request claims work for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Committee {
    Science,
    Social,
    Cultural,
    Media,
    Sports,
    FollowUp,
    General,
}

impl Committee {
    pub fn as_str(&self) -> &'static str {
        match self {
            Committee::Science => "science",
            Committee::Social => "social",
            Committee::Cultural => "cultural",
            Committee::Media => "media",
            Committee::Sports => "sports",
            Committee::FollowUp => "follow_up",
            Committee::General => "general",
        }
    }
}

impl FromStr for Committee {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "science" => Ok(Committee::Science),
            "social" => Ok(Committee::Social),
            "cultural" => Ok(Committee::Cultural),
            "media" => Ok(Committee::Media),
            "sports" => Ok(Committee::Sports),
            "follow_up" => Ok(Committee::FollowUp),
            "general" => Ok(Committee::General),
            other => Err(LedgerError::InvalidArgument(format!(
                "unknown committee '{other}'"
            ))),
        }
    }
}

impl fmt::Display for Committee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Review status of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
        }
    }
}

impl FromStr for RequestStatus {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RequestStatus::Pending),
            "approved" => Ok(RequestStatus::Approved),
            "rejected" => Ok(RequestStatus::Rejected),
            other => Err(LedgerError::InvalidArgument(format!(
                "unknown request status '{other}'"
            ))),
        }
    }
}

/// Request row from database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestRow {
    pub id: i64,
    pub student_id: i64,
    pub committee: Committee,
    pub description: String,
    pub points: i64,
    pub status: RequestStatus,
    pub rejection_reason: Option<String>,
    pub reviewed_by: Option<i64>,
    pub week_number: u32,
    pub created_at: String,
    pub reviewed_at: Option<String>,
}

impl RequestRow {
    fn from_row(row: &Row) -> Result<Self, rusqlite::Error> {
        let committee: String = row.get("committee")?;
        let status: String = row.get("status")?;
        Ok(Self {
            id: row.get("id")?,
            student_id: row.get("student_id")?,
            committee: committee.parse().map_err(|_| {
                rusqlite::Error::InvalidColumnType(
                    0,
                    "committee".to_string(),
                    rusqlite::types::Type::Text,
                )
            })?,
            description: row.get("description")?,
            points: row.get("points")?,
            status: status.parse().map_err(|_| {
                rusqlite::Error::InvalidColumnType(
                    0,
                    "status".to_string(),
                    rusqlite::types::Type::Text,
                )
            })?,
            rejection_reason: row.get("rejection_reason")?,
            reviewed_by: row.get("reviewed_by")?,
            week_number: row.get("week_number")?,
            created_at: row.get("created_at")?,
            reviewed_at: row.get("reviewed_at")?,
        })
    }
}

/// Insert a pending request
pub fn insert(
    conn: &Connection,
    student_id: i64,
    committee: Committee,
    description: &str,
    points: i64,
    week_number: u32,
) -> Result<i64, LedgerError> {
    conn.execute(
        "INSERT INTO requests (student_id, committee, description, points, week_number)
         VALUES (?, ?, ?, ?, ?)",
        params![
            student_id,
            committee.as_str(),
            description,
            points,
            week_number
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Get a request by id
pub fn get(conn: &Connection, request_id: i64) -> Result<Option<RequestRow>, LedgerError> {
    let row = conn
        .query_row(
            "SELECT * FROM requests WHERE id = ?",
            params![request_id],
            RequestRow::from_row,
        )
        .optional()?;
    Ok(row)
}

/// How many requests a student has filed in the given week
pub fn weekly_count(
    conn: &Connection,
    student_id: i64,
    week_number: u32,
) -> Result<u32, LedgerError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM requests WHERE student_id = ? AND week_number = ?",
        params![student_id, week_number],
        |row| row.get(0),
    )?;
    Ok(count as u32)
}

/// Mark a pending request approved. Returns false when the request was
/// already reviewed (the transition is terminal).
pub fn mark_approved(
    conn: &Connection,
    request_id: i64,
    reviewer_id: i64,
) -> Result<bool, LedgerError> {
    let changed = conn.execute(
        "UPDATE requests
         SET status = 'approved', reviewed_by = ?, reviewed_at = datetime('now')
         WHERE id = ? AND status = 'pending'",
        params![reviewer_id, request_id],
    )?;
    Ok(changed == 1)
}

/// Mark a pending request rejected. Returns false when already reviewed.
pub fn mark_rejected(
    conn: &Connection,
    request_id: i64,
    reviewer_id: i64,
    rejection_reason: Option<&str>,
) -> Result<bool, LedgerError> {
    let changed = conn.execute(
        "UPDATE requests
         SET status = 'rejected', reviewed_by = ?, reviewed_at = datetime('now'),
             rejection_reason = ?
         WHERE id = ? AND status = 'pending'",
        params![reviewer_id, rejection_reason, request_id],
    )?;
    Ok(changed == 1)
}

/// List a student's requests, newest first
pub fn list_for_student(
    conn: &Connection,
    student_id: i64,
) -> Result<Vec<RequestRow>, LedgerError> {
    let mut stmt = conn.prepare(
        "SELECT * FROM requests WHERE student_id = ? ORDER BY created_at DESC, id DESC",
    )?;
    let rows = stmt
        .query_map(params![student_id], RequestRow::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// List requests, optionally filtered by status, newest first
pub fn list_by_status(
    conn: &Connection,
    status: Option<RequestStatus>,
) -> Result<Vec<RequestRow>, LedgerError> {
    let rows = match status {
        Some(status) => {
            let mut stmt = conn.prepare(
                "SELECT * FROM requests WHERE status = ? ORDER BY created_at DESC, id DESC",
            )?;
            let rows = stmt
                .query_map(params![status.as_str()], RequestRow::from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        }
        None => {
            let mut stmt =
                conn.prepare("SELECT * FROM requests ORDER BY created_at DESC, id DESC")?;
            let rows = stmt
                .query_map([], RequestRow::from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        }
    };
    Ok(rows)
}

/// Sum of a student's approved request points
pub fn approved_sum_for_student(conn: &Connection, student_id: i64) -> Result<i64, LedgerError> {
    let total: i64 = conn.query_row(
        "SELECT COALESCE(SUM(points), 0) FROM requests
         WHERE student_id = ? AND status = 'approved'",
        params![student_id],
        |row| row.get(0),
    )?;
    Ok(total)
}

/// Sum of approved request points across a group's members
pub fn approved_sum_for_group(conn: &Connection, group_id: i64) -> Result<i64, LedgerError> {
    let total: i64 = conn.query_row(
        "SELECT COALESCE(SUM(r.points), 0)
         FROM requests r
         JOIN students s ON r.student_id = s.id
         WHERE s.group_id = ? AND r.status = 'approved'",
        params![group_id],
        |row| row.get(0),
    )?;
    Ok(total)
}

/// Point values of a student's approved requests (for grade histograms)
pub fn approved_points_for_student(
    conn: &Connection,
    student_id: i64,
) -> Result<Vec<i64>, LedgerError> {
    let mut stmt = conn
        .prepare("SELECT points FROM requests WHERE student_id = ? AND status = 'approved'")?;
    let points = stmt
        .query_map(params![student_id], |row| row.get(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(points)
}
