//! Append-only audit log
//!
//! One comma-separated row per fetch attempt, preceded by a fixed header row.
//! Rows are never rewritten or reordered.

use crate::address::to_hex;
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::PageRecord;
use crate::timestamp::format_record;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Column header written once at the top of every audit log
pub const AUDIT_HEADER: &str =
    "uuid, url, status, download_latency, ip_address, protocol, timestamp";

/// Audit log for a single session
///
/// Appends are serialized through an internal mutex and each row is written
/// with a single `write_all` on a file opened in append mode, so concurrent
/// callers never interleave partial rows.
#[derive(Debug)]
pub struct AuditLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl AuditLog {
    /// Opens (or creates) the audit log at `path` and ensures its header
    pub fn open(path: &Path) -> StorageResult<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| StorageError::io(path, e))?;

        Self::from_file(path, file)
    }

    /// Wraps an already opened file and ensures its header
    pub fn from_file(path: impl Into<PathBuf>, file: File) -> StorageResult<Self> {
        let log = Self {
            path: path.into(),
            file: Mutex::new(file),
        };
        log.ensure_header()?;
        Ok(log)
    }

    /// Writes the header row if the log is still empty
    ///
    /// Returns `true` when the header was written by this call.
    pub fn ensure_header(&self) -> StorageResult<bool> {
        let mut file = self.lock()?;
        let len = file
            .metadata()
            .map_err(|e| StorageError::io(&self.path, e))?
            .len();

        if len > 0 {
            return Ok(false);
        }

        file.write_all(format!("{}\n", AUDIT_HEADER).as_bytes())
            .map_err(|e| StorageError::io(&self.path, e))?;
        Ok(true)
    }

    /// Appends one row for a fetch attempt
    pub fn append(&self, record: &PageRecord) -> StorageResult<()> {
        let row = format_row(record);
        let mut file = self.lock()?;
        file.write_all(row.as_bytes())
            .map_err(|e| StorageError::io(&self.path, e))?;

        tracing::trace!("Audit row for {} ({})", record.url, record.status);
        Ok(())
    }

    /// Path of the underlying file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> StorageResult<std::sync::MutexGuard<'_, File>> {
        self.file
            .lock()
            .map_err(|e| StorageError::Poisoned(e.to_string()))
    }
}

/// Renders a record as a newline-terminated audit row
fn format_row(record: &PageRecord) -> String {
    let latency = record
        .download_latency
        .map(|d| d.as_secs_f64().to_string())
        .unwrap_or_default();
    let address = record
        .source_address
        .map(|ip| ip.to_string())
        .unwrap_or_default();
    let protocol = record.protocol.as_deref().map(escape_field).unwrap_or_default();

    format!(
        "{}, {}, {}, {}, {}, {}, {}\n",
        to_hex(&record.page_id),
        escape_field(&record.url),
        record.status,
        latency,
        address,
        protocol,
        format_record(&record.observed_at)
    )
}

/// Quotes a field that would otherwise break the row layout
fn escape_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
