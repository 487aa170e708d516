//! Session manifest store - create, reload and enumerate sessions under a root

use crate::address::{namespace_for, to_hex};
use crate::session::{NewSession, Session, SessionManifest, SessionPaths, MANIFEST_FILE};
use crate::storage::{ProgressEvent, StorageError};
use crate::timestamp::{format_path, now};
use crate::url::slugify;
use crate::Result;
use chrono::NaiveDateTime;
use std::fs::ReadDir;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Creates and reloads sessions below a root directory
#[derive(Debug, Clone)]
pub struct SessionStore {
    root: PathBuf,
}

impl SessionStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates and persists a new session
    ///
    /// The request is validated before anything is written. If a later step
    /// fails, the freshly created storage directory is removed again, so the
    /// caller either gets a fully initialized session or nothing.
    ///
    /// # Returns
    ///
    /// * `Ok(Session)` - Manifest persisted, directories present, audit header written
    /// * `Err(SessionError)` - Validation or storage failure
    pub fn create(&self, request: NewSession) -> Result<Session> {
        request.validate()?;

        let namespace = namespace_for(&request.domain);
        let (created_at, storage_path) = self.claim_storage_path(&namespace)?;
        let allowed_domains = allowed_domains(&request.domain, &request.sub_domains);
        let name = if request.name.trim().is_empty() {
            slugify(&request.start_urls[0])
        } else {
            request.name
        };

        let manifest = SessionManifest {
            created_at,
            storage_path: storage_path.clone(),
            name,
            domain: request.domain,
            start_urls: request.start_urls,
            namespace,
            allowed_domains,
            fetch_limit: request.fetch_limit,
            engine_settings: request.engine_settings,
        };

        match initialize(manifest) {
            Ok(session) => {
                tracing::info!(
                    "Created session '{}' for {} at {}",
                    session.name(),
                    session.domain(),
                    storage_path.display()
                );
                Ok(session)
            }
            Err(e) => {
                tracing::error!("Failed to create session at {}: {}", storage_path.display(), e);
                if let Err(cleanup) = std::fs::remove_dir_all(&storage_path) {
                    tracing::warn!(
                        "Could not remove partial session {}: {}",
                        storage_path.display(),
                        cleanup
                    );
                }
                Err(e)
            }
        }
    }

    /// Reloads a session from its manifest file
    ///
    /// Directories are recreated if missing and an absent audit log is started
    /// with its header; existing audit rows are left untouched.
    pub fn load(manifest_path: &Path) -> Result<Session> {
        let manifest = SessionManifest::read(manifest_path)?;
        let session = Session::open(manifest)?;
        session.progress().record(ProgressEvent::ProcessInitFromYaml)?;

        tracing::info!(
            "Resumed session '{}' from {}",
            session.name(),
            manifest_path.display()
        );
        Ok(session)
    }

    /// Lists the manifests of every session directly below the root
    ///
    /// Subdirectories without a manifest are skipped. Order follows the
    /// directory listing and is not stable across platforms. Call again to
    /// restart the listing.
    pub fn list_all(&self) -> Result<SessionIter> {
        let entries = std::fs::read_dir(&self.root).map_err(|e| StorageError::io(&self.root, e))?;
        Ok(SessionIter {
            root: self.root.clone(),
            entries,
        })
    }

    /// Creates the storage directory for a new session under an absolute root
    ///
    /// The leaf directory is claimed with a non-recursive create, so a path
    /// another caller already holds is never reused; the creation time moves
    /// forward one microsecond until a free path is found.
    fn claim_storage_path(
        &self,
        namespace: &Uuid,
    ) -> std::result::Result<(NaiveDateTime, PathBuf), StorageError> {
        std::fs::create_dir_all(&self.root).map_err(|e| StorageError::io(&self.root, e))?;
        let root = std::path::absolute(&self.root).map_err(|e| StorageError::io(&self.root, e))?;

        let mut created_at = now();
        loop {
            let path = root.join(format!("{}_{}", to_hex(namespace), format_path(&created_at)));
            match std::fs::create_dir(&path) {
                Ok(()) => return Ok((created_at, path)),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    created_at += chrono::Duration::microseconds(1);
                }
                Err(e) => return Err(StorageError::io(&path, e)),
            }
        }
    }
}

/// Prepares storage for a new manifest; the manifest is written last
fn initialize(manifest: SessionManifest) -> Result<Session> {
    let session = Session::open(manifest)?;
    session.progress().record(ProgressEvent::ProcessInit)?;
    session.manifest().write(session.manifest_path())?;
    Ok(session)
}

/// Builds the follow scope of a session
///
/// Each sub-domain entry becomes `<domain>/<entry>`; without entries the scope
/// is the domain itself.
fn allowed_domains(domain: &str, sub_domains: &[String]) -> Vec<String> {
    let allowed: Vec<String> = sub_domains
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| {
            if s.starts_with('/') {
                format!("{}{}", domain, s)
            } else {
                format!("{}/{}", domain, s)
            }
        })
        .collect();

    if allowed.is_empty() {
        vec![domain.to_string()]
    } else {
        allowed
    }
}

/// Lazy listing of session manifests below a root
pub struct SessionIter {
    root: PathBuf,
    entries: ReadDir,
}

impl Iterator for SessionIter {
    type Item = Result<SessionManifest>;

    fn next(&mut self) -> Option<Self::Item> {
        for entry in self.entries.by_ref() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => return Some(Err(StorageError::io(&self.root, e).into())),
            };

            let manifest_path = SessionPaths::new(&entry.path()).manifest;
            if !manifest_path.is_file() {
                tracing::debug!("Skipping {} (no {})", entry.path().display(), MANIFEST_FILE);
                continue;
            }

            return Some(SessionManifest::read(&manifest_path));
        }
        None
    }
}
