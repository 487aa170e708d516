//! Advisory progress log
//!
//! Free-text lifecycle lines, one per event. Nothing in the crate parses this
//! file back.

use crate::storage::error::{StorageError, StorageResult};
use crate::timestamp::{format_record, now};
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Lifecycle events recorded in the progress log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressEvent {
    /// Session created
    ProcessInit,
    /// Session reloaded from its manifest
    ProcessInitFromYaml,
    /// Crawl engine about to start
    CrawlStart,
    /// Crawl engine exited
    CrawlEnd,
}

impl ProgressEvent {
    pub fn label(&self) -> &'static str {
        match self {
            Self::ProcessInit => "process_init",
            Self::ProcessInitFromYaml => "process_init_from_yaml",
            Self::CrawlStart => "crawl_start",
            Self::CrawlEnd => "crawl_end",
        }
    }
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone)]
pub struct ProgressLog {
    path: PathBuf,
}

impl ProgressLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Appends `<event>: <timestamp>` stamped with the current time
    pub fn record(&self, event: ProgressEvent) -> StorageResult<()> {
        self.write_line(&format!("{}: {}", event, format_record(&now())))
    }

    /// Appends `<event>: <timestamp> <detail>`
    pub fn record_with(&self, event: ProgressEvent, detail: &str) -> StorageResult<()> {
        self.write_line(&format!("{}: {} {}", event, format_record(&now()), detail))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_line(&self, line: &str) -> StorageResult<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| StorageError::io(&self.path, e))?;
        file.write_all(format!("{}\n", line).as_bytes())
            .map_err(|e| StorageError::io(&self.path, e))
    }
}
