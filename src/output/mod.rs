//! Output module for page records and crawl summaries
//!
//! This module handles:
//! - Writing page records as JSON lines, a JSON array, CSV or SQLite
//! - Session counters and the per-agent and whole-crawl reports
//! - The markdown summary written at the end of a crawl

mod file_output;
mod markdown;
mod sqlite_output;
pub mod stats;
mod traits;

pub use file_output::{CsvReporter, JsonLinesReporter, JsonReporter, MemoryReporter};
pub use markdown::{format_markdown_summary, generate_markdown_summary};
pub use sqlite_output::SqliteReporter;
pub use stats::{
    print_statistics, CrawlReport, DispatchRecord, SessionCounts, SessionReport, SessionStats,
};
pub use traits::{OutputError, OutputResult, PageRecord, Reporter};

use crate::config::{OutputConfig, OutputFormat};
use std::path::Path;
use std::sync::Arc;

/// Builds the reporter selected by the output configuration
///
/// The destination is opened immediately, so an unwritable path is reported
/// before the crawl starts.
pub fn build_reporter(config: &OutputConfig) -> OutputResult<Arc<dyn Reporter>> {
    let path = Path::new(&config.path);
    Ok(match config.format {
        OutputFormat::Jsonl => Arc::new(JsonLinesReporter::create(path)?),
        OutputFormat::Json => Arc::new(JsonReporter::create(path)?),
        OutputFormat::Csv => Arc::new(CsvReporter::create(path)?),
        OutputFormat::Sqlite => Arc::new(SqliteReporter::open(path)?),
    })
}
