//! Group rows

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

/// Group row from database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupRow {
    pub id: i64,
    pub name: String,
    pub created_at: String,
    /// Number of member students, filled by listings
    #[serde(default)]
    pub student_count: u32,
}

impl GroupRow {
    fn from_row(row: &Row) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            created_at: row.get("created_at")?,
            student_count: 0,
        })
    }
}

/// Create a group; the name must be unique
pub fn create(conn: &Connection, name: &str) -> Result<i64, LedgerError> {
    if name.trim().is_empty() {
        return Err(LedgerError::InvalidArgument(
            "group name must not be empty".to_string(),
        ));
    }

    let result = conn.execute("INSERT INTO groups (name) VALUES (?)", params![name.trim()]);
    match result {
        Ok(_) => Ok(conn.last_insert_rowid()),
        Err(e) => {
            let err = LedgerError::from(e);
            if err.is_constraint_violation() {
                Err(LedgerError::InvalidArgument(format!(
                    "group name '{}' already exists",
                    name.trim()
                )))
            } else {
                Err(err)
            }
        }
    }
}

/// Get a group by id
pub fn get(conn: &Connection, group_id: i64) -> Result<Option<GroupRow>, LedgerError> {
    let row = conn
        .query_row(
            "SELECT * FROM groups WHERE id = ?",
            params![group_id],
            GroupRow::from_row,
        )
        .optional()?;
    Ok(row)
}

/// Rename a group
pub fn rename(conn: &Connection, group_id: i64, name: &str) -> Result<(), LedgerError> {
    let changed = conn.execute(
        "UPDATE groups SET name = ? WHERE id = ?",
        params![name.trim(), group_id],
    )?;
    if changed == 0 {
        return Err(LedgerError::NotFound(format!("group {group_id}")));
    }
    Ok(())
}

/// Delete a group, detaching its members first
pub fn delete(conn: &Connection, group_id: i64) -> Result<(), LedgerError> {
    conn.execute(
        "UPDATE students SET group_id = NULL WHERE group_id = ?",
        params![group_id],
    )?;
    let changed = conn.execute("DELETE FROM groups WHERE id = ?", params![group_id])?;
    if changed == 0 {
        return Err(LedgerError::NotFound(format!("group {group_id}")));
    }
    Ok(())
}

/// List all groups with member counts
pub fn list(conn: &Connection) -> Result<Vec<GroupRow>, LedgerError> {
    let mut stmt = conn.prepare(
        "SELECT g.id, g.name, g.created_at, COUNT(s.id) AS student_count
         FROM groups g
         LEFT JOIN students s ON s.group_id = g.id
         GROUP BY g.id
         ORDER BY g.id",
    )?;

    let rows = stmt
        .query_map([], |row| {
            Ok(GroupRow {
                id: row.get("id")?,
                name: row.get("name")?,
                created_at: row.get("created_at")?,
                student_count: row.get("student_count")?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(rows)
}

/// Member student ids in stable enumeration order
pub fn member_ids(conn: &Connection, group_id: i64) -> Result<Vec<i64>, LedgerError> {
    let mut stmt = conn.prepare("SELECT id FROM students WHERE group_id = ? ORDER BY id")?;
    let ids = stmt
        .query_map(params![group_id], |row| row.get(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ids)
}
