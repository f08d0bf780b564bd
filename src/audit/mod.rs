//! Audit log: SQLite-backed operation history.
//!
//! Every vault operation (register, login, add, delete, ...) is recorded
//! in `<data_dir>/audit.db` together with the acting account and site.
//! Passwords are never recorded.
//!
//! Logging degrades gracefully: if the database can't be opened or
//! written to, the operation itself still succeeds.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use tracing::debug;

use crate::config::Settings;
use crate::errors::{Result, SafePassError};

/// A single audit log entry.
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub operation: String,
    pub username: Option<String>,
    pub site: Option<String>,
    pub details: Option<String>,
}

/// SQLite-backed audit log.
pub struct AuditLog {
    conn: Connection,
}

impl AuditLog {
    /// Open (or create) the audit database at `<data_dir>/audit.db`.
    ///
    /// Returns `None` if the database can't be opened; callers treat that
    /// as "audit logging unavailable" and continue normally.
    pub fn open(data_dir: &Path) -> Option<Self> {
        let db_path = Self::db_path(data_dir);
        let conn = match Connection::open(&db_path) {
            Ok(conn) => conn,
            Err(e) => {
                debug!(path = %db_path.display(), error = %e, "audit log unavailable");
                return None;
            }
        };

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            let _ = std::fs::set_permissions(&db_path, perms);
        }

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS audit_log (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp   TEXT NOT NULL,
                operation   TEXT NOT NULL,
                username    TEXT,
                site        TEXT,
                details     TEXT
            );",
        )
        .ok()?;

        Some(Self { conn })
    }

    /// Record an operation. Errors are ignored.
    pub fn log(
        &self,
        operation: &str,
        username: Option<&str>,
        site: Option<&str>,
        details: Option<&str>,
    ) {
        let now = Utc::now().to_rfc3339();
        if let Err(e) = self.conn.execute(
            "INSERT INTO audit_log (timestamp, operation, username, site, details)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![now, operation, username, site, details],
        ) {
            debug!(operation, error = %e, "audit insert failed");
        }
    }

    /// Query recent audit entries, most recent first.
    ///
    /// - `limit`: maximum number of entries to return.
    /// - `since`: if provided, only entries at or after this instant.
    /// - `username`: if provided, only entries recorded for that account.
    pub fn query(
        &self,
        limit: usize,
        since: Option<DateTime<Utc>>,
        username: Option<&str>,
    ) -> Result<Vec<AuditEntry>> {
        let limit_i64 = i64::try_from(limit).unwrap_or(i64::MAX);
        let since_str = since.map(|ts| ts.to_rfc3339());

        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, timestamp, operation, username, site, details
                 FROM audit_log
                 WHERE (?1 IS NULL OR timestamp >= ?1)
                   AND (?2 IS NULL OR username = ?2)
                 ORDER BY id DESC
                 LIMIT ?3",
            )
            .map_err(|e| SafePassError::AuditError(format!("query prepare: {e}")))?;

        let rows = stmt
            .query_map(rusqlite::params![since_str, username, limit_i64], |row| {
                let ts_str: String = row.get(1)?;
                let timestamp = DateTime::parse_from_rfc3339(&ts_str)
                    .map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc));

                Ok(AuditEntry {
                    id: row.get(0)?,
                    timestamp,
                    operation: row.get(2)?,
                    username: row.get(3)?,
                    site: row.get(4)?,
                    details: row.get(5)?,
                })
            })
            .map_err(|e| SafePassError::AuditError(format!("query exec: {e}")))?;

        rows.map(|row| row.map_err(|e| SafePassError::AuditError(format!("row parse: {e}"))))
            .collect()
    }

    /// Path of the audit database for a data directory.
    pub fn db_path(data_dir: &Path) -> PathBuf {
        data_dir.join(Settings::AUDIT_FILE_NAME)
    }
}

/// Open the audit database for `settings`, log one event and close it.
///
/// Never fails the calling operation.
pub fn log_audit(
    settings: &Settings,
    operation: &str,
    username: Option<&str>,
    site: Option<&str>,
    details: Option<&str>,
) {
    if let Some(audit) = AuditLog::open(settings.audit_dir()) {
        audit.log(operation, username, site, details);
    }
}
