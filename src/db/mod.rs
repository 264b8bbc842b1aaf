use rusqlite::{params, Connection, OptionalExtension, Result as SqlResult};
use std::path::PathBuf;

use crate::models::SubmissionLog;
use crate::utils::now_rfc3339;

const MIGRATIONS: &[(&str, &str)] = &[
    (
        "create_settings",
        include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/migrations/001_create_settings.sql")),
    ),
    (
        "create_submission_logs",
        include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/migrations/002_create_submission_logs.sql")),
    ),
];

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn new(db_path: PathBuf) -> SqlResult<Self> {
        let conn = Connection::open(db_path)?;
        let mut db = Database { conn };
        db.run_migrations()?;
        Ok(db)
    }

    /// Brings the schema up to date. `user_version` counts the entries of
    /// [`MIGRATIONS`] already applied.
    fn run_migrations(&mut self) -> SqlResult<()> {
        let applied: usize = self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get::<_, i64>(0))?
            .try_into()
            .unwrap_or(0);

        for (version, (name, sql)) in MIGRATIONS.iter().enumerate().skip(applied) {
            tracing::debug!(migration = *name, version = version + 1, "applying migration");
            let tx = self.conn.transaction()?;
            tx.execute_batch(sql)?;
            tx.pragma_update(None, "user_version", (version + 1) as i64)?;
            tx.commit()?;
        }
        Ok(())
    }

    pub fn set_setting(&self, key: &str, value: &str) -> SqlResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO settings (key, value, updated_at) VALUES (?1, ?2, datetime('now'))",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn get_setting(&self, key: &str) -> SqlResult<Option<String>> {
        let mut stmt = self.conn.prepare("SELECT value FROM settings WHERE key = ?1")?;
        stmt.query_row(params![key], |row| row.get(0)).optional()
    }

    pub fn delete_setting(&self, key: &str) -> SqlResult<()> {
        self.conn
            .execute("DELETE FROM settings WHERE key = ?1", params![key])?;
        Ok(())
    }

    pub fn log_submission(
        &self,
        bill_id: Option<&str>,
        stage: &str,
        status: &str,
        message: Option<&str>,
    ) -> SqlResult<()> {
        self.conn.execute(
            "INSERT INTO submission_logs (id, bill_id, stage, status, message, created_at)
             VALUES (hex(randomblob(16)), ?1, ?2, ?3, ?4, ?5)",
            params![bill_id, stage, status, message, now_rfc3339()],
        )?;
        Ok(())
    }

    pub fn recent_submissions(&self, limit: usize) -> SqlResult<Vec<SubmissionLog>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, bill_id, stage, status, message, created_at
             FROM submission_logs
             ORDER BY rowid DESC
             LIMIT ?1",
        )?;

        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok(SubmissionLog {
                id: row.get(0)?,
                bill_id: row.get(1)?,
                stage: row.get(2)?,
                status: row.get(3)?,
                message: row.get(4)?,
                created_at: row.get(5)?,
            })
        })?;

        rows.collect()
    }
}
