pub mod member;
pub mod project;
pub mod task;
pub mod user;

use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::Connection;

const MIGRATION: &str = include_str!("../../migrations/001_init.sql");

/// Builds the error rusqlite expects when a stored text column fails to parse.
pub(crate) fn invalid_column(idx: usize, err: anyhow::Error) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        rusqlite::types::Type::Text,
        Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, err.to_string())),
    )
}

pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open a database at the given path, creating parent directories as needed.
    /// Enables WAL mode and foreign key enforcement.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {}", path.display()))?;

        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        if mode != "wal" {
            anyhow::bail!("failed to enable WAL mode, got: {mode}");
        }
        conn.pragma_update(None, "foreign_keys", "ON")?;

        tracing::debug!(path = %path.display(), "database opened");
        Ok(Self { conn })
    }

    /// Run all migrations. Idempotent thanks to `IF NOT EXISTS` clauses.
    pub fn migrate(&self) -> Result<()> {
        self.conn
            .execute_batch(MIGRATION)
            .context("failed to run database migration")?;
        Ok(())
    }

    /// Access the underlying connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }
}
