use crate::{ConfigError, ConfigResult};
use serde::Deserialize;
use serde_yaml::{Mapping, Value};

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
(KHTML, like Gecko) Chrome/96.0.4664.110 Safari/537.36";

/// Main configuration structure for Crawl-Session
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub storage: StorageConfig,
    pub engine: EngineConfig,
    #[serde(default)]
    pub defaults: DefaultsConfig,
}

/// Where sessions are stored
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Root directory holding one subdirectory per session
    pub root: String,
}

/// External crawl engine invocation
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Executable to run
    pub program: String,

    /// Fixed arguments placed before the manifest flag
    #[serde(default)]
    pub args: Vec<String>,

    /// Flag that precedes the manifest path on the command line
    #[serde(rename = "manifest-flag", default = "default_manifest_flag")]
    pub manifest_flag: String,

    /// Opaque settings copied verbatim into every new session's manifest
    #[serde(default)]
    pub settings: toml::Table,
}

/// Defaults applied to sessions created from the command line
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DefaultsConfig {
    /// Total fetch budget when none is given explicitly
    #[serde(rename = "fetch-limit")]
    pub fetch_limit: Option<u64>,
}

fn default_manifest_flag() -> String {
    "--manifest".to_string()
}

impl EngineConfig {
    /// Engine settings for new sessions
    ///
    /// Falls back to [`default_engine_settings`] when the config leaves the
    /// `[engine.settings]` table empty.
    pub fn engine_settings(&self) -> ConfigResult<Mapping> {
        if self.settings.is_empty() {
            return Ok(default_engine_settings());
        }

        match serde_yaml::to_value(&self.settings) {
            Ok(Value::Mapping(mapping)) => Ok(mapping),
            Ok(other) => Err(ConfigError::Settings(format!(
                "expected a table, got {:?}",
                other
            ))),
            Err(e) => Err(ConfigError::Settings(e.to_string())),
        }
    }
}

/// Engine settings used when nothing else is configured
///
/// Robots rules are obeyed, the engine's HTTP cache is disabled and requests
/// carry browser-like default headers.
pub fn default_engine_settings() -> Mapping {
    let mut headers = Mapping::new();
    headers.insert("User-Agent".into(), DEFAULT_USER_AGENT.into());
    headers.insert(
        "Accept".into(),
        "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,image/apng,*/*;q=0.8"
            .into(),
    );
    headers.insert("Accept-Language".into(), "en".into());

    let mut settings = Mapping::new();
    settings.insert("HTTPCACHE_ENABLED".into(), false.into());
    settings.insert("ROBOTSTXT_OBEY".into(), true.into());
    settings.insert("DEFAULT_REQUEST_HEADERS".into(), Value::Mapping(headers));
    settings
}
