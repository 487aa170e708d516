//! Page content store
//!
//! Raw fetched bytes live under the session's `html/` directory, named by page id.

use crate::address::to_hex;
use crate::storage::error::{StorageError, StorageResult};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Raw page content, one file per page id
#[derive(Debug, Clone)]
pub struct PageStore {
    dir: PathBuf,
}

impl PageStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Location of the content file for a page id
    pub fn path_for(&self, page_id: &Uuid) -> PathBuf {
        self.dir.join(format!("{}.html", to_hex(page_id)))
    }

    /// Writes raw fetched bytes, replacing any earlier copy of the same page
    pub fn write(&self, page_id: &Uuid, body: &[u8]) -> StorageResult<PathBuf> {
        let path = self.path_for(page_id);
        std::fs::write(&path, body).map_err(|e| StorageError::io(&path, e))?;
        Ok(path)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}
