//! SQLite ledger store
//!
//! All point state lives here as append-only source rows; totals are
//! recomputed from them on every read.
//!
//! ## Tables
//!
//! - `groups`, `students` - membership
//! - `requests` - student task claims worth 1..=5 points
//! - `point_adjustments` - signed per-student deltas (append-only)
//! - `group_point_adjustments` - the group direct bucket (append-only)
//! - `points_log` - best-effort audit trail
//! - `notifications` - in-app notification feed
//! - `app_settings` - key/value settings store

pub mod adjustments;
pub mod groups;
pub mod notifications;
pub mod oplog;
pub mod requests;
pub mod schema;
pub mod settings;
pub mod students;

use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;
use tracing::{debug, info};

use crate::config::{Config, StorageBackend};
use crate::error::LedgerError;

/// SQLite database holding the points ledger
pub struct LedgerDb {
    conn: Mutex<Connection>,
}

impl LedgerDb {
    /// Open or create the ledger database file
    pub fn open(db_path: &Path) -> Result<Self, LedgerError> {
        info!("Opening ledger database at {:?}", db_path);

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    LedgerError::Internal(format!("Failed to create data dir: {e}"))
                })?;
            }
        }

        let conn = Connection::open(db_path)?;

        // WAL for concurrent readers alongside the single writer
        conn.execute_batch(
            "PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL; PRAGMA foreign_keys=ON;",
        )?;

        let db = Self {
            conn: Mutex::new(conn),
        };
        db.init_schema()?;
        Ok(db)
    }

    /// Open an in-memory database (tests, throwaway runs)
    pub fn open_in_memory() -> Result<Self, LedgerError> {
        debug!("Opening in-memory ledger database");

        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;

        let db = Self {
            conn: Mutex::new(conn),
        };
        db.init_schema()?;
        Ok(db)
    }

    /// Open the backend named by the configuration
    pub fn open_backend(config: &Config) -> Result<Self, LedgerError> {
        match config.backend {
            StorageBackend::File => Self::open(&config.db_path()),
            StorageBackend::Memory => Self::open_in_memory(),
        }
    }

    fn init_schema(&self) -> Result<(), LedgerError> {
        self.with_conn(|conn| schema::init_schema(conn))
    }

    /// Run a read against the connection
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, LedgerError>
    where
        F: FnOnce(&Connection) -> Result<T, LedgerError>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| LedgerError::Internal(format!("Lock poisoned: {e}")))?;
        f(&conn)
    }

    /// Run a write with exclusive access
    pub fn with_conn_mut<F, T>(&self, f: F) -> Result<T, LedgerError>
    where
        F: FnOnce(&mut Connection) -> Result<T, LedgerError>,
    {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| LedgerError::Internal(format!("Lock poisoned: {e}")))?;
        f(&mut conn)
    }

    /// Get database statistics
    pub fn stats(&self) -> Result<DbStats, LedgerError> {
        self.with_conn(|conn| {
            let count = |sql: &str| -> Result<u64, LedgerError> {
                let n: i64 = conn.query_row(sql, [], |row| row.get(0))?;
                Ok(n as u64)
            };

            Ok(DbStats {
                total_students: count("SELECT COUNT(*) FROM students")?,
                total_groups: count("SELECT COUNT(*) FROM groups")?,
                total_requests: count("SELECT COUNT(*) FROM requests")?,
                pending_requests: count(
                    "SELECT COUNT(*) FROM requests WHERE status = 'pending'",
                )?,
                approved_requests: count(
                    "SELECT COUNT(*) FROM requests WHERE status = 'approved'",
                )?,
                rejected_requests: count(
                    "SELECT COUNT(*) FROM requests WHERE status = 'rejected'",
                )?,
            })
        })
    }
}

/// Database statistics
#[derive(Debug, Clone, serde::Serialize)]
pub struct DbStats {
    pub total_students: u64,
    pub total_groups: u64,
    pub total_requests: u64,
    pub pending_requests: u64,
    pub approved_requests: u64,
    pub rejected_requests: u64,
}

// Re-exports
pub use groups::GroupRow;
pub use notifications::NotificationRow;
pub use oplog::{OplogEntry, OplogRow};
pub use requests::{Committee, RequestRow, RequestStatus};
pub use students::StudentRow;
