//! Reporter trait and the per-page output record

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write output: {0}")]
    Write(String),

    #[error("Failed to format output: {0}")]
    Format(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Everything recorded about one successfully processed page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageRecord {
    /// Agent (session) that crawled the page
    pub agent_id: String,

    /// URL as admitted
    pub url: String,

    /// URL after redirects
    pub final_url: String,

    pub depth: u32,
    pub attempt: u32,
    pub status: u16,

    /// Page title, "Untitled" when the page has none
    pub title: String,

    /// Leading visible text of the page
    pub snippet: String,

    /// Links the extractor returned
    pub links_found: usize,

    /// Links that passed robots and admission and were enqueued
    pub children_admitted: usize,

    pub captcha_detected: bool,
    pub fetched_at: DateTime<Utc>,
}

/// Sink for page records
///
/// Reporters are shared by every agent of a crawl, so implementations
/// synchronize internally. A failing `report` is treated by the pipeline
/// like a failed fetch and the page is retried.
pub trait Reporter: Send + Sync {
    /// Records one processed page
    fn report(&self, record: &PageRecord) -> OutputResult<()>;

    /// Flushes anything buffered; called once after every session has ended
    fn finalize(&self) -> OutputResult<()> {
        Ok(())
    }
}
