//! Storage module for session files
//!
//! This module owns every file a session writes below its storage root:
//! - The append-only audit log (`crawl.csv`)
//! - Page content files (`html/<pageId>.html`)
//! - The advisory progress log (`progress.log`)

mod audit;
mod error;
mod pages;
mod progress;

pub use audit::{AuditLog, AUDIT_HEADER};
pub use error::{StorageError, StorageResult};
pub use pages::PageStore;
pub use progress::{ProgressEvent, ProgressLog};

use chrono::NaiveDateTime;
use std::net::IpAddr;
use std::time::Duration;
use uuid::Uuid;

/// One fetch attempt as recorded in the audit log
#[derive(Debug, Clone, PartialEq)]
pub struct PageRecord {
    /// Deterministic id derived from the session namespace and the URL
    pub page_id: Uuid,
    pub url: String,
    /// Numeric outcome code reported by the engine (HTTP status)
    pub status: u16,
    pub download_latency: Option<Duration>,
    pub source_address: Option<IpAddr>,
    pub protocol: Option<String>,
    pub observed_at: NaiveDateTime,
}
