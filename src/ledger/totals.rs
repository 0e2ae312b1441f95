//! Total-points aggregation
//!
//! Totals are always recomputed from the source rows on every call; nothing
//! is cached. A student's total sums approved requests and individual
//! adjustments. A group's total is the member-derived sum plus the direct
//! bucket, which are disjoint sources by construction.

use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

use crate::db::{adjustments, requests};
use crate::error::LedgerError;

/// Member-derived vs direct split of a group total
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GroupBreakdown {
    pub members_points: i64,
    pub direct_points: i64,
}

impl GroupBreakdown {
    pub fn total(&self) -> i64 {
        self.members_points + self.direct_points
    }
}

/// One member with their current total
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberTotal {
    pub id: i64,
    pub name: String,
    pub total_points: i64,
}

/// A student's current total points.
///
/// The raw sum can dip below zero if adjustment rows land out of validated
/// order; display paths clamp, this function does not.
pub fn student_total(conn: &Connection, student_id: i64) -> Result<i64, LedgerError> {
    let approved = requests::approved_sum_for_student(conn, student_id)?;
    let adjusted = adjustments::sum_for_student(conn, student_id)?;
    Ok(approved + adjusted)
}

/// A group's member-derived and direct totals
pub fn group_breakdown(conn: &Connection, group_id: i64) -> Result<GroupBreakdown, LedgerError> {
    let members_points = requests::approved_sum_for_group(conn, group_id)?
        + adjustments::sum_for_group_members(conn, group_id)?;
    let direct_points = adjustments::direct_sum_for_group(conn, group_id)?;
    Ok(GroupBreakdown {
        members_points,
        direct_points,
    })
}

/// Each member of a group with their current total, in stable id order
pub fn member_totals(conn: &Connection, group_id: i64) -> Result<Vec<MemberTotal>, LedgerError> {
    let mut stmt = conn.prepare(
        "SELECT s.id, s.name,
                (COALESCE((SELECT SUM(points) FROM requests
                           WHERE student_id = s.id AND status = 'approved'), 0) +
                 COALESCE((SELECT SUM(points) FROM point_adjustments
                           WHERE student_id = s.id), 0)) AS total_points
         FROM students s
         WHERE s.group_id = ?
         ORDER BY s.id",
    )?;

    let rows = stmt
        .query_map(params![group_id], |row| {
            Ok(MemberTotal {
                id: row.get("id")?,
                name: row.get("name")?,
                total_points: row.get("total_points")?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(rows)
}
