//! File-based reporters
//!
//! - [`JsonLinesReporter`] appends one JSON object per page as it arrives
//! - [`JsonReporter`] buffers and writes a single pretty-printed array at the end
//! - [`CsvReporter`] writes one row per page with a header row
//! - [`MemoryReporter`] keeps records in memory

use crate::output::traits::{OutputResult, PageRecord, Reporter};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Creates `path`, and its parent directories if needed
pub(crate) fn create_output_file(path: &Path) -> OutputResult<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(File::create(path)?)
}

/// Writes newline-delimited JSON
pub struct JsonLinesReporter {
    writer: Mutex<BufWriter<File>>,
}

impl JsonLinesReporter {
    pub fn create(path: &Path) -> OutputResult<Self> {
        Ok(Self {
            writer: Mutex::new(BufWriter::new(create_output_file(path)?)),
        })
    }
}

impl Reporter for JsonLinesReporter {
    fn report(&self, record: &PageRecord) -> OutputResult<()> {
        let mut writer = lock(&self.writer);
        serde_json::to_writer(&mut *writer, record)?;
        writer.write_all(b"\n")?;
        Ok(())
    }

    fn finalize(&self) -> OutputResult<()> {
        lock(&self.writer).flush()?;
        Ok(())
    }
}

/// Writes all records as one JSON array when the crawl ends
pub struct JsonReporter {
    path: PathBuf,
    records: Mutex<Vec<PageRecord>>,
}

impl JsonReporter {
    /// Creates the output file up front so an unwritable path fails early
    pub fn create(path: &Path) -> OutputResult<Self> {
        create_output_file(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            records: Mutex::new(Vec::new()),
        })
    }
}

impl Reporter for JsonReporter {
    fn report(&self, record: &PageRecord) -> OutputResult<()> {
        lock(&self.records).push(record.clone());
        Ok(())
    }

    fn finalize(&self) -> OutputResult<()> {
        let records = lock(&self.records);
        let mut writer = BufWriter::new(create_output_file(&self.path)?);
        serde_json::to_writer_pretty(&mut writer, &*records)?;
        writer.flush()?;
        Ok(())
    }
}

/// Writes CSV with a header row
pub struct CsvReporter {
    writer: Mutex<csv::Writer<File>>,
}

impl CsvReporter {
    pub fn create(path: &Path) -> OutputResult<Self> {
        Ok(Self {
            writer: Mutex::new(csv::Writer::from_writer(create_output_file(path)?)),
        })
    }
}

impl Reporter for CsvReporter {
    fn report(&self, record: &PageRecord) -> OutputResult<()> {
        lock(&self.writer).serialize(record)?;
        Ok(())
    }

    fn finalize(&self) -> OutputResult<()> {
        lock(&self.writer).flush()?;
        Ok(())
    }
}

/// Keeps every record in memory
#[derive(Debug, Default)]
pub struct MemoryReporter {
    records: Mutex<Vec<PageRecord>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<PageRecord> {
        lock(&self.records).clone()
    }

    pub fn urls(&self) -> Vec<String> {
        lock(&self.records).iter().map(|r| r.url.clone()).collect()
    }
}

impl Reporter for MemoryReporter {
    fn report(&self, record: &PageRecord) -> OutputResult<()> {
        lock(&self.records).push(record.clone());
        Ok(())
    }
}
