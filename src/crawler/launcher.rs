//! Crawl launcher - hands a persisted session to the external crawl engine
//!
//! The engine sits behind the [`CrawlEngine`] trait so the session and storage
//! logic does not care whether it is a separate process, an in-process library
//! or a remote service. [`ProcessEngine`] is the process-backed implementation.

use crate::config::EngineConfig;
use crate::session::Session;
use crate::storage::{ProgressEvent, StorageError};
use crate::{Result, SessionError};
use std::fmt;
use std::fs::{File, OpenOptions};
use std::future::Future;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use tokio::process::Command;

/// Termination status reported by a crawl engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineStatus {
    success: bool,
    code: Option<i32>,
}

impl EngineStatus {
    pub fn new(success: bool, code: Option<i32>) -> Self {
        Self { success, code }
    }

    pub fn success(&self) -> bool {
        self.success
    }

    /// Exit code, `None` when the process was terminated by a signal
    pub fn code(&self) -> Option<i32> {
        self.code
    }
}

impl From<ExitStatus> for EngineStatus {
    fn from(status: ExitStatus) -> Self {
        Self::new(status.success(), status.code())
    }
}

impl fmt::Display for EngineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "exit status {}", code),
            None => f.write_str("terminated by signal"),
        }
    }
}

/// An external crawl engine
pub trait CrawlEngine {
    /// Runs the engine against a manifest until it terminates
    ///
    /// Engine output is appended to `log_path`. Failing to start the engine is
    /// a [`SessionError::Launch`]; a non-zero exit is reported through the
    /// returned status, not as an error.
    fn launch(
        &self,
        manifest_path: &Path,
        log_path: &Path,
    ) -> impl Future<Output = Result<EngineStatus>> + Send;
}

/// Runs the crawl engine as a child process
///
/// The command line is `<program> <args...> <manifest-flag> <manifest path>`.
#[derive(Debug, Clone)]
pub struct ProcessEngine {
    program: String,
    args: Vec<String>,
    manifest_flag: String,
}

impl ProcessEngine {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            manifest_flag: "--manifest".to_string(),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.program.clone())
            .with_args(config.args.iter().cloned())
            .with_manifest_flag(config.manifest_flag.clone())
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_manifest_flag(mut self, flag: impl Into<String>) -> Self {
        self.manifest_flag = flag.into();
        self
    }

    /// Full command line for a manifest, for logging
    pub fn command_line(&self, manifest_path: &Path) -> String {
        let mut parts = vec![self.program.clone()];
        parts.extend(self.args.iter().cloned());
        parts.push(self.manifest_flag.clone());
        parts.push(manifest_path.display().to_string());
        parts.join(" ")
    }
}

impl CrawlEngine for ProcessEngine {
    async fn launch(&self, manifest_path: &Path, log_path: &Path) -> Result<EngineStatus> {
        let stdout = open_log(log_path)?;
        let stderr = stdout
            .try_clone()
            .map_err(|e| StorageError::io(log_path, e))?;

        tracing::info!("Running command {}", self.command_line(manifest_path));

        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(&self.manifest_flag)
            .arg(manifest_path)
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr)
            .status()
            .await
            .map_err(|source| SessionError::Launch {
                program: self.program.clone(),
                source,
            })?;

        Ok(status.into())
    }
}

fn open_log(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| StorageError::io(path, e).into())
}

/// Starts a crawl engine against persisted sessions
///
/// Launching blocks until the engine exits. Failed launches are not retried.
pub struct CrawlLauncher<E> {
    engine: E,
}

impl<E: CrawlEngine> CrawlLauncher<E> {
    pub fn new(engine: E) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Runs the engine against `session` and returns its termination status
    pub async fn launch(&self, session: &Session) -> Result<EngineStatus> {
        let progress = session.progress();
        progress.record(ProgressEvent::CrawlStart)?;

        tracing::info!(
            "Launching crawl engine for session '{}' at {}",
            session.name(),
            session.storage_path().display()
        );

        let status = match self
            .engine
            .launch(session.manifest_path(), session.engine_log_path())
            .await
        {
            Ok(status) => status,
            Err(e) => {
                tracing::error!("Crawl engine could not be started: {}", e);
                if let Err(log_err) = progress.record_with(ProgressEvent::CrawlEnd, "(launch failed)")
                {
                    tracing::warn!("Failed to record launch failure: {}", log_err);
                }
                return Err(e);
            }
        };

        progress.record_with(ProgressEvent::CrawlEnd, &format!("({})", status))?;

        if status.success() {
            tracing::info!("Crawl engine finished: {}", status);
        } else {
            tracing::warn!("Crawl engine failed: {}", status);
        }

        Ok(status)
    }
}
