// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! SQLite-backed feedback log

use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use super::log::{FeedbackEvent, FeedbackLog};
use crate::{Result, TaxisError};

/// Events stored as JSON payloads in an autoincrementing table
pub struct SqliteFeedbackLog {
    conn: Mutex<Connection>,
}

impl SqliteFeedbackLog {
    /// Open or create the database
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let log = Self {
            conn: Mutex::new(conn),
        };
        log.initialize()?;
        Ok(log)
    }

    /// Open an in-memory database (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let log = Self {
            conn: Mutex::new(conn),
        };
        log.initialize()?;
        Ok(log)
    }

    fn lock_conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| TaxisError::LockPoisoned("feedback database"))
    }

    /// Initialize database schema
    fn initialize(&self) -> Result<()> {
        let conn = self.lock_conn()?;
        conn.execute_batch(r#"
            CREATE TABLE IF NOT EXISTS feedback_events (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                kind TEXT NOT NULL,
                payload TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_feedback_kind ON feedback_events(kind);
        "#)?;
        Ok(())
    }

    /// Number of stored events
    pub fn count(&self) -> Result<i64> {
        let conn = self.lock_conn()?;
        conn.query_row("SELECT COUNT(*) FROM feedback_events", [], |row| row.get(0))
            .map_err(Into::into)
    }
}

impl FeedbackLog for SqliteFeedbackLog {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn append(&self, event: &FeedbackEvent) -> Result<()> {
        let payload = serde_json::to_string(event)?;
        let conn = self.lock_conn()?;
        conn.execute(
            "INSERT INTO feedback_events (kind, payload) VALUES (?1, ?2)",
            params![event.kind(), payload],
        )?;
        Ok(())
    }

    fn load_snapshot(&self) -> Result<Vec<FeedbackEvent>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare("SELECT seq, payload FROM feedback_events ORDER BY seq")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut events = Vec::with_capacity(rows.len());
        for (seq, payload) in rows {
            match serde_json::from_str(&payload) {
                Ok(event) => events.push(event),
                Err(e) => tracing::warn!("Skipping corrupt feedback row {}: {}", seq, e),
            }
        }
        Ok(events)
    }

    fn clear(&self) -> Result<()> {
        let conn = self.lock_conn()?;
        conn.execute("DELETE FROM feedback_events", [])?;
        Ok(())
    }
}
