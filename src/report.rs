//! Aggregated report data for export collaborators
//!
//! Rendering (PDF, spreadsheets) lives outside this crate; these functions
//! assemble the numbers the renderers draw. Student report tanks are the
//! per-grade histogram of approved requests, one liter per request; the
//! greedy quantization of raw totals stays on the live read path.

use rusqlite::{params, Connection};
use serde::Serialize;

use crate::db::{groups, requests, students};
use crate::error::LedgerError;
use crate::fuel::{FuelGrade, FuelTanks};
use crate::ledger::Ledger;
use crate::week;

/// Per-student export card
#[derive(Debug, Clone, Serialize)]
pub struct StudentReport {
    pub id: i64,
    pub name: String,
    pub group_name: Option<String>,
    pub tanks: FuelTanks,
    pub total_liters: u64,
}

/// Per-group export sheet
#[derive(Debug, Clone, Serialize)]
pub struct GroupReport {
    pub id: i64,
    pub name: String,
    pub student_count: usize,
    pub tanks: FuelTanks,
    pub total_liters: u64,
    pub students: Vec<StudentReport>,
}

/// Whole-roster export sheet
#[derive(Debug, Clone, Serialize)]
pub struct AllStudentsReport {
    pub student_count: usize,
    pub group_count: usize,
    pub tanks: FuelTanks,
    pub total_liters: u64,
    pub students: Vec<StudentReport>,
}

/// One row of the weekly activity report
#[derive(Debug, Clone, Serialize)]
pub struct WeeklyActivityRow {
    pub student_name: String,
    pub group_name: Option<String>,
    pub committee: String,
    pub points: i64,
    pub status: String,
    pub created_at: String,
}

/// Request activity for one week
#[derive(Debug, Clone, Serialize)]
pub struct WeeklyReport {
    pub week_number: u32,
    pub rows: Vec<WeeklyActivityRow>,
}

fn grade_histogram(conn: &Connection, student_id: i64) -> Result<FuelTanks, LedgerError> {
    let mut tanks = FuelTanks::default();
    for points in requests::approved_points_for_student(conn, student_id)? {
        if let Some(grade) = FuelGrade::from_points(points) {
            tanks.add_grade(grade);
        }
    }
    Ok(tanks)
}

fn student_report_inner(
    conn: &Connection,
    student: &crate::db::StudentRow,
) -> Result<StudentReport, LedgerError> {
    let tanks = grade_histogram(conn, student.id)?;
    Ok(StudentReport {
        id: student.id,
        name: student.name.clone(),
        group_name: student.group_name.clone(),
        tanks,
        total_liters: tanks.total_liters(),
    })
}

/// Export card for one student
pub fn student_report(ledger: &Ledger, student_id: i64) -> Result<StudentReport, LedgerError> {
    ledger.db().with_conn(|conn| {
        let student = students::get(conn, student_id)?
            .ok_or_else(|| LedgerError::NotFound(format!("student {student_id}")))?;
        student_report_inner(conn, &student)
    })
}

/// Export sheet for one group with a per-member breakdown
pub fn group_report(ledger: &Ledger, group_id: i64) -> Result<GroupReport, LedgerError> {
    ledger.db().with_conn(|conn| {
        let group = groups::get(conn, group_id)?
            .ok_or_else(|| LedgerError::NotFound(format!("group {group_id}")))?;

        let mut tanks = FuelTanks::default();
        let mut reports = Vec::new();
        for student in students::list(conn)? {
            if student.group_id != Some(group_id) {
                continue;
            }
            let report = student_report_inner(conn, &student)?;
            tanks.merge(&report.tanks);
            reports.push(report);
        }

        Ok(GroupReport {
            id: group.id,
            name: group.name,
            student_count: reports.len(),
            tanks,
            total_liters: tanks.total_liters(),
            students: reports,
        })
    })
}

/// Export sheet for the whole roster
pub fn all_students_report(ledger: &Ledger) -> Result<AllStudentsReport, LedgerError> {
    ledger.db().with_conn(|conn| {
        let mut tanks = FuelTanks::default();
        let mut reports = Vec::new();
        for student in students::list(conn)? {
            let report = student_report_inner(conn, &student)?;
            tanks.merge(&report.tanks);
            reports.push(report);
        }

        let group_count = groups::list(conn)?.len();
        Ok(AllStudentsReport {
            student_count: reports.len(),
            group_count,
            tanks,
            total_liters: tanks.total_liters(),
            students: reports,
        })
    })
}

/// Request activity for a week (current week when none is given)
pub fn weekly_report(ledger: &Ledger, week: Option<u32>) -> Result<WeeklyReport, LedgerError> {
    let week_number = week.unwrap_or_else(week::current_week_number);
    ledger.db().with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT s.name AS student_name, g.name AS group_name,
                    r.committee, r.points, r.status, r.created_at
             FROM requests r
             JOIN students s ON r.student_id = s.id
             LEFT JOIN groups g ON s.group_id = g.id
             WHERE r.week_number = ?
             ORDER BY r.created_at DESC, r.id DESC",
        )?;

        let rows = stmt
            .query_map(params![week_number], |row| {
                Ok(WeeklyActivityRow {
                    student_name: row.get("student_name")?,
                    group_name: row.get("group_name")?,
                    committee: row.get("committee")?,
                    points: row.get("points")?,
                    status: row.get("status")?,
                    created_at: row.get("created_at")?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(WeeklyReport { week_number, rows })
    })
}
