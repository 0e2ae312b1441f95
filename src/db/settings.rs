//! Key/value settings store
//!
//! Values are stored as strings; boolean parsing happens here at the
//! boundary so the rest of the crate only sees typed values.

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::LedgerError;

/// Get a setting value
pub fn get(conn: &Connection, key: &str) -> Result<Option<String>, LedgerError> {
    let value: Option<Option<String>> = conn
        .query_row(
            "SELECT value FROM app_settings WHERE key = ?",
            params![key],
            |row| row.get(0),
        )
        .optional()?;
    Ok(value.flatten())
}

/// Upsert a setting value
pub fn set(conn: &Connection, key: &str, value: Option<&str>) -> Result<(), LedgerError> {
    conn.execute(
        "INSERT INTO app_settings (key, value, updated_at)
         VALUES (?, ?, datetime('now'))
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        params![key, value],
    )?;
    Ok(())
}

/// Get a boolean setting; accepts 1/0, true/false, yes/no, on/off
pub fn get_bool(conn: &Connection, key: &str, default: bool) -> Result<bool, LedgerError> {
    match get(conn, key)? {
        Some(value) => Ok(parse_bool(&value)),
        None => Ok(default),
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.to_lowercase().trim(),
        "1" | "true" | "yes" | "on"
    )
}

/// All settings as (key, value) pairs
pub fn all(conn: &Connection) -> Result<Vec<(String, String)>, LedgerError> {
    let mut stmt =
        conn.prepare("SELECT key, value FROM app_settings WHERE value IS NOT NULL ORDER BY key")?;
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
