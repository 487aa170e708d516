//! Session module - creating, persisting and reloading crawl sessions
//!
//! A session is one unit of crawl work. Everything it owns lives below a single
//! storage directory named `<namespace hex>_<creation timestamp>`:
//!
//! - `manifest.yaml` - the typed [`SessionManifest`]
//! - `crawl.csv` - the append-only audit log
//! - `progress.log` - advisory lifecycle lines
//! - `engine.log` - captured crawl engine output
//! - `html/<pageId>.html` - raw fetched content
//!
//! A [`Session`] handle is only ever returned once all of these are in place.

mod manifest;
mod store;

pub use manifest::SessionManifest;
pub use store::{SessionIter, SessionStore};

use crate::address::page_id_for;
use crate::config::{default_engine_settings, Config};
use crate::crawler::FrontierLimiter;
use crate::storage::{AuditLog, PageRecord, PageStore, ProgressLog, StorageError};
use crate::timestamp::now;
use crate::url::resolve_domain;
use crate::{Result, SessionError};
use chrono::NaiveDateTime;
use serde_yaml::Mapping;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use uuid::Uuid;

pub const MANIFEST_FILE: &str = "manifest.yaml";
pub const AUDIT_FILE: &str = "crawl.csv";
pub const PROGRESS_FILE: &str = "progress.log";
pub const ENGINE_LOG_FILE: &str = "engine.log";
pub const PAGES_DIR: &str = "html";

/// Request for a new session
#[derive(Debug, Clone)]
pub struct NewSession {
    /// Canonical domain every start URL must resolve to
    pub domain: String,

    /// Human-readable label; blank means "derive from the first start URL"
    pub name: String,

    pub start_urls: Vec<String>,

    /// Path prefixes below `domain` the engine may follow into
    pub sub_domains: Vec<String>,

    pub fetch_limit: Option<u64>,

    pub engine_settings: Mapping,
}

impl NewSession {
    /// Creates a request for an explicit domain
    pub fn new<I, S>(domain: impl Into<String>, start_urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            domain: domain.into(),
            name: String::new(),
            start_urls: start_urls.into_iter().map(Into::into).collect(),
            sub_domains: Vec::new(),
            fetch_limit: None,
            engine_settings: default_engine_settings(),
        }
    }

    /// Creates a request whose domain is resolved from the first start URL
    pub fn for_urls<I, S>(start_urls: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let start_urls: Vec<String> = start_urls.into_iter().map(Into::into).collect();
        let first = start_urls.first().ok_or(SessionError::NoStartUrls)?;
        let domain = resolve_domain(first)?;
        Ok(Self::new(domain, start_urls))
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_sub_domains<I, S>(mut self, sub_domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sub_domains = sub_domains.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_fetch_limit(mut self, fetch_limit: Option<u64>) -> Self {
        self.fetch_limit = fetch_limit;
        self
    }

    pub fn with_engine_settings(mut self, engine_settings: Mapping) -> Self {
        self.engine_settings = engine_settings;
        self
    }

    /// Applies engine settings and the default fetch limit from a config
    ///
    /// A fetch limit already set on the request takes precedence.
    pub fn with_config(mut self, config: &Config) -> Result<Self> {
        self.engine_settings = config.engine.engine_settings()?;
        if self.fetch_limit.is_none() {
            self.fetch_limit = config.defaults.fetch_limit;
        }
        Ok(self)
    }

    /// Checks the request before any storage is touched
    fn validate(&self) -> Result<()> {
        if self.start_urls.is_empty() {
            return Err(SessionError::NoStartUrls);
        }

        if self.fetch_limit == Some(0) {
            return Err(SessionError::InvalidFetchLimit);
        }

        for url in &self.start_urls {
            let found = resolve_domain(url)?;
            if found != self.domain {
                return Err(SessionError::DomainMismatch {
                    url: url.clone(),
                    expected: self.domain.clone(),
                    found,
                });
            }
        }

        Ok(())
    }
}

/// A fetch reported back by the crawl engine
#[derive(Debug, Clone, Default)]
pub struct CompletedFetch {
    pub url: String,
    pub status: u16,
    pub body: Vec<u8>,
    pub download_latency: Option<Duration>,
    pub source_address: Option<IpAddr>,
    pub protocol: Option<String>,
}

impl CompletedFetch {
    pub fn new(url: impl Into<String>, status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            url: url.into(),
            status,
            body: body.into(),
            ..Default::default()
        }
    }
}

/// Files and directories of one session, derived from its storage path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPaths {
    pub root: PathBuf,
    pub manifest: PathBuf,
    pub audit_log: PathBuf,
    pub progress_log: PathBuf,
    pub engine_log: PathBuf,
    pub pages: PathBuf,
}

impl SessionPaths {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            manifest: root.join(MANIFEST_FILE),
            audit_log: root.join(AUDIT_FILE),
            progress_log: root.join(PROGRESS_FILE),
            engine_log: root.join(ENGINE_LOG_FILE),
            pages: root.join(PAGES_DIR),
        }
    }

    /// Creates the storage and page directories; safe to repeat
    fn create_dirs(&self) -> std::result::Result<(), StorageError> {
        std::fs::create_dir_all(&self.pages).map_err(|e| StorageError::io(&self.pages, e))?;
        tracing::debug!("Prepared session directories under {}", self.root.display());
        Ok(())
    }
}

/// An initialized crawl session
///
/// Owns the session's frontier limiter and audit log; both are safe to share
/// across threads, so an in-process engine can call [`admit`](Self::admit) and
/// [`record_fetch`](Self::record_fetch) from concurrent fetches.
#[derive(Debug)]
pub struct Session {
    manifest: SessionManifest,
    paths: SessionPaths,
    limiter: FrontierLimiter,
    audit: AuditLog,
    pages: PageStore,
    progress: ProgressLog,
}

impl Session {
    /// Prepares directories and the audit log for a manifest
    fn open(manifest: SessionManifest) -> Result<Self> {
        let paths = SessionPaths::new(&manifest.storage_path);
        paths.create_dirs()?;
        let audit = AuditLog::open(&paths.audit_log)?;

        Ok(Self {
            limiter: FrontierLimiter::new(manifest.fetch_limit),
            pages: PageStore::new(&paths.pages),
            progress: ProgressLog::new(&paths.progress_log),
            audit,
            paths,
            manifest,
        })
    }

    /// Session identifier: the namespace derived from the domain
    pub fn id(&self) -> Uuid {
        self.manifest.namespace
    }

    pub fn manifest(&self) -> &SessionManifest {
        &self.manifest
    }

    pub fn paths(&self) -> &SessionPaths {
        &self.paths
    }

    pub fn name(&self) -> &str {
        &self.manifest.name
    }

    pub fn domain(&self) -> &str {
        &self.manifest.domain
    }

    pub fn created_at(&self) -> NaiveDateTime {
        self.manifest.created_at
    }

    pub fn storage_path(&self) -> &Path {
        &self.paths.root
    }

    pub fn manifest_path(&self) -> &Path {
        &self.paths.manifest
    }

    pub fn engine_log_path(&self) -> &Path {
        &self.paths.engine_log
    }

    pub fn limiter(&self) -> &FrontierLimiter {
        &self.limiter
    }

    pub fn audit_log(&self) -> &AuditLog {
        &self.audit
    }

    pub fn pages(&self) -> &PageStore {
        &self.pages
    }

    pub fn progress(&self) -> &ProgressLog {
        &self.progress
    }

    /// Asks the frontier limiter whether one more fetch may be issued
    pub fn admit(&self) -> bool {
        self.limiter.admit()
    }

    /// Deterministic page id for a URL in this session
    pub fn page_id(&self, url: &str) -> Uuid {
        page_id_for(&self.manifest.namespace, url)
    }

    /// Stores fetched content and appends its audit row
    ///
    /// Content for a URL fetched earlier in the session is overwritten. A
    /// failed write is returned to the caller, never swallowed.
    pub fn record_fetch(&self, fetch: &CompletedFetch) -> Result<PageRecord> {
        let page_id = self.page_id(&fetch.url);
        self.pages.write(&page_id, &fetch.body)?;

        let record = PageRecord {
            page_id,
            url: fetch.url.clone(),
            status: fetch.status,
            download_latency: fetch.download_latency,
            source_address: fetch.source_address,
            protocol: fetch.protocol.clone(),
            observed_at: now(),
        };
        self.audit.append(&record)?;

        Ok(record)
    }
}
