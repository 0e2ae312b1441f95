//! Student rows and login code generation

use rand::Rng;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

/// Student row from database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentRow {
    pub id: i64,
    pub name: String,
    pub code: Option<String>,
    pub group_id: Option<i64>,
    /// Group name, filled when the query joins groups
    #[serde(default)]
    pub group_name: Option<String>,
    pub points_hidden: bool,
    pub created_at: String,
}

impl StudentRow {
    fn from_row(row: &Row) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            code: row.get("code")?,
            group_id: row.get("group_id")?,
            group_name: row.get("group_name")?,
            points_hidden: row.get::<_, i64>("points_hidden")? != 0,
            created_at: row.get("created_at")?,
        })
    }
}

const STUDENT_SELECT: &str = "SELECT s.id, s.name, s.code, s.group_id, g.name AS group_name,
        s.points_hidden, s.created_at
 FROM students s
 LEFT JOIN groups g ON s.group_id = g.id";

/// Create a student with a freshly generated login code
pub fn create(
    conn: &Connection,
    name: &str,
    group_id: Option<i64>,
) -> Result<(i64, String), LedgerError> {
    if name.trim().is_empty() {
        return Err(LedgerError::InvalidArgument(
            "student name must not be empty".to_string(),
        ));
    }

    let code = generate_code(conn)?;
    conn.execute(
        "INSERT INTO students (name, code, group_id) VALUES (?, ?, ?)",
        params![name.trim(), code, group_id],
    )?;
    Ok((conn.last_insert_rowid(), code))
}

/// Generate a unique 4-digit login code
pub fn generate_code(conn: &Connection) -> Result<String, LedgerError> {
    let mut rng = rand::thread_rng();
    loop {
        let code = rng.gen_range(1000..10000).to_string();
        let taken: Option<i64> = conn
            .query_row(
                "SELECT id FROM students WHERE code = ?",
                params![code],
                |row| row.get(0),
            )
            .optional()?;
        if taken.is_none() {
            return Ok(code);
        }
    }
}

/// Get a student by id
pub fn get(conn: &Connection, student_id: i64) -> Result<Option<StudentRow>, LedgerError> {
    let sql = format!("{STUDENT_SELECT} WHERE s.id = ?");
    let row = conn
        .query_row(&sql, params![student_id], StudentRow::from_row)
        .optional()?;
    Ok(row)
}

/// Look up a student by login code
pub fn get_by_code(conn: &Connection, code: &str) -> Result<Option<StudentRow>, LedgerError> {
    let sql = format!("{STUDENT_SELECT} WHERE s.code = ?");
    let row = conn
        .query_row(&sql, params![code], StudentRow::from_row)
        .optional()?;
    Ok(row)
}

/// List all students
pub fn list(conn: &Connection) -> Result<Vec<StudentRow>, LedgerError> {
    let sql = format!("{STUDENT_SELECT} ORDER BY s.id");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], StudentRow::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Update a student's name and group
pub fn update(
    conn: &Connection,
    student_id: i64,
    name: &str,
    group_id: Option<i64>,
) -> Result<(), LedgerError> {
    let changed = conn.execute(
        "UPDATE students SET name = ?, group_id = ? WHERE id = ?",
        params![name.trim(), group_id, student_id],
    )?;
    if changed == 0 {
        return Err(LedgerError::NotFound(format!("student {student_id}")));
    }
    Ok(())
}

/// Delete a student
pub fn delete(conn: &Connection, student_id: i64) -> Result<(), LedgerError> {
    let changed = conn.execute("DELETE FROM students WHERE id = ?", params![student_id])?;
    if changed == 0 {
        return Err(LedgerError::NotFound(format!("student {student_id}")));
    }
    Ok(())
}

/// Set the points-visibility flag
pub fn set_points_hidden(
    conn: &Connection,
    student_id: i64,
    hidden: bool,
) -> Result<(), LedgerError> {
    let changed = conn.execute(
        "UPDATE students SET points_hidden = ? WHERE id = ?",
        params![hidden as i64, student_id],
    )?;
    if changed == 0 {
        return Err(LedgerError::NotFound(format!("student {student_id}")));
    }
    Ok(())
}
