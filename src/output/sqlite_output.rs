//! SQLite reporter
//!
//! Stores page records in a `pages` table. Re-crawling a URL within the same
//! agent replaces its row.

use crate::output::traits::{OutputError, OutputResult, PageRecord, Reporter};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Mutex, PoisonError};

/// SQL schema for the page table
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS pages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    agent_id TEXT NOT NULL,
    url TEXT NOT NULL,
    final_url TEXT NOT NULL,
    depth INTEGER NOT NULL,
    attempt INTEGER NOT NULL,
    status INTEGER NOT NULL,
    title TEXT NOT NULL,
    snippet TEXT NOT NULL,
    links_found INTEGER NOT NULL,
    children_admitted INTEGER NOT NULL,
    captcha_detected INTEGER NOT NULL,
    fetched_at TEXT NOT NULL,
    UNIQUE(agent_id, url)
);

CREATE INDEX IF NOT EXISTS idx_pages_url ON pages(url);
CREATE INDEX IF NOT EXISTS idx_pages_depth ON pages(depth);
"#;

/// Reporter writing into a SQLite database
pub struct SqliteReporter {
    conn: Mutex<Connection>,
}

impl SqliteReporter {
    /// Opens or creates the database at `path`
    pub fn open(path: &Path) -> OutputResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;
        Self::with_connection(conn)
    }

    /// Creates an in-memory database
    pub fn in_memory() -> OutputResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> OutputResult<Self> {
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Number of stored pages
    pub fn page_count(&self) -> OutputResult<u64> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM pages", [], |row| row.get(0))?;
        u64::try_from(count).map_err(|e| OutputError::Format(e.to_string()))
    }
}

impl Reporter for SqliteReporter {
    fn report(&self, record: &PageRecord) -> OutputResult<()> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        conn.execute(
            "INSERT OR REPLACE INTO pages (
                agent_id, url, final_url, depth, attempt, status, title, snippet,
                links_found, children_admitted, captcha_detected, fetched_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                record.agent_id,
                record.url,
                record.final_url,
                record.depth,
                record.attempt,
                record.status,
                record.title,
                record.snippet,
                record.links_found as i64,
                record.children_admitted as i64,
                record.captcha_detected,
                record.fetched_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }
}
