//! Session manifest - the durable, typed description of a session
//!
//! Stored as YAML at `<storage path>/manifest.yaml`:
//!
//! ```text
//! timestamp: 2024-01-02 03:04:05.000006
//! cache_path: crawls/<namespace hex>_20240102-030405-000006
//! name: example
//! domain: example.com
//! start_urls: [...]
//! uuid_namespace: <32 hex digits>
//! allowed_domains: [...]
//! crawl_limit: 500        # or null
//! process_settings: {...} # opaque, passed to the engine verbatim
//! ```

use crate::address::namespace_for;
use crate::storage::StorageError;
use crate::url::resolve_domain;
use crate::{Result, SessionError};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_yaml::Mapping;
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionManifest {
    /// Creation time; fixes the storage path
    #[serde(rename = "timestamp", with = "record_timestamp")]
    pub created_at: NaiveDateTime,

    /// Root of everything this session stores
    #[serde(rename = "cache_path")]
    pub storage_path: PathBuf,

    pub name: String,

    pub domain: String,

    pub start_urls: Vec<String>,

    /// Namespace for page ids, derived from `domain`
    #[serde(rename = "uuid_namespace", with = "hex_uuid")]
    pub namespace: Uuid,

    pub allowed_domains: Vec<String>,

    #[serde(rename = "crawl_limit", default)]
    pub fetch_limit: Option<u64>,

    #[serde(rename = "process_settings", default)]
    pub engine_settings: Mapping,
}

impl SessionManifest {
    /// Reads and validates a manifest file
    ///
    /// Any failure to read, parse or validate is reported as
    /// [`SessionError::ManifestCorrupt`].
    pub fn read(path: &Path) -> Result<Self> {
        let corrupt = |reason: String| SessionError::ManifestCorrupt {
            path: path.to_path_buf(),
            reason,
        };

        let content = std::fs::read_to_string(path).map_err(|e| corrupt(e.to_string()))?;
        let manifest: Self = serde_yaml::from_str(&content).map_err(|e| corrupt(e.to_string()))?;
        manifest.validate().map_err(corrupt)?;
        Ok(manifest)
    }

    /// Persists the manifest, replacing any previous copy atomically
    pub fn write(&self, path: &Path) -> Result<()> {
        let yaml = serde_yaml::to_string(self).map_err(StorageError::from)?;
        let tmp = path.with_extension("yaml.tmp");

        std::fs::write(&tmp, yaml).map_err(|e| StorageError::io(&tmp, e))?;
        std::fs::rename(&tmp, path).map_err(|e| StorageError::io(path, e))?;
        Ok(())
    }

    /// Checks the invariants serde cannot express
    fn validate(&self) -> std::result::Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("name is empty".to_string());
        }
        if self.domain.trim().is_empty() {
            return Err("domain is empty".to_string());
        }
        if self.start_urls.is_empty() {
            return Err("start_urls is empty".to_string());
        }
        if self.fetch_limit == Some(0) {
            return Err("crawl_limit must be a positive integer".to_string());
        }

        for url in &self.start_urls {
            let found = resolve_domain(url).map_err(|e| e.to_string())?;
            if found != self.domain {
                return Err(format!(
                    "start URL {} resolves to {}, not {}",
                    url, found, self.domain
                ));
            }
        }

        let expected = namespace_for(&self.domain);
        if self.namespace != expected {
            return Err(format!(
                "uuid_namespace {} does not match domain {}",
                self.namespace.simple(),
                self.domain
            ));
        }

        Ok(())
    }
}

mod record_timestamp {
    use crate::timestamp::{format_record, parse_record};
    use chrono::NaiveDateTime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(at: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_record(at))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_record(&raw)
            .map_err(|e| de::Error::custom(format!("invalid timestamp '{}': {}", raw, e)))
    }
}

mod hex_uuid {
    use serde::{de, Deserialize, Deserializer, Serializer};
    use uuid::Uuid;

    pub fn serialize<S: Serializer>(id: &Uuid, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&id.simple())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Uuid, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Uuid::parse_str(&raw)
            .map_err(|e| de::Error::custom(format!("invalid identifier '{}': {}", raw, e)))
    }
}
