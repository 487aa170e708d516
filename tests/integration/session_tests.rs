//! Integration tests for the session lifecycle
//!
//! These tests drive sessions through creation, simulated fetches, reloads and
//! engine launches against scratch directories.

use crawl_session::crawler::{CrawlEngine, CrawlLauncher, EngineStatus};
use crawl_session::session::{CompletedFetch, NewSession, SessionStore, AUDIT_FILE, MANIFEST_FILE};
use crawl_session::storage::AUDIT_HEADER;
use crawl_session::{namespace_for, SessionError, SessionManifest};
use serde_yaml::Mapping;
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tempfile::TempDir;

fn audit_lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .expect("Failed to read audit log")
        .lines()
        .map(str::to_string)
        .collect()
}

fn example_request(limit: Option<u64>) -> NewSession {
    NewSession::new(
        "example.com",
        ["https://example.com/a", "https://example.com/b"],
    )
    .with_name("ex")
    .with_fetch_limit(limit)
    .with_engine_settings(Mapping::new())
}

fn fetch(url: &str, body: &str) -> CompletedFetch {
    CompletedFetch {
        url: url.to_string(),
        status: 200,
        body: body.as_bytes().to_vec(),
        download_latency: Some(Duration::from_millis(120)),
        source_address: Some(IpAddr::V4(Ipv4Addr::LOCALHOST)),
        protocol: Some("HTTP/1.1".to_string()),
    }
}

#[test]
fn test_end_to_end_limited_session() {
    let root = TempDir::new().expect("Failed to create temp dir");
    let store = SessionStore::new(root.path());

    let session = store
        .create(example_request(Some(2)))
        .expect("Failed to create session");

    // Fresh session: header-only audit log, manifest with default scope
    assert!(session.storage_path().is_dir());
    assert!(session.paths().pages.is_dir());
    assert_eq!(
        audit_lines(&session.storage_path().join(AUDIT_FILE)),
        vec![AUDIT_HEADER.to_string()]
    );
    let manifest = SessionManifest::read(&session.storage_path().join(MANIFEST_FILE))
        .expect("Failed to read manifest");
    assert_eq!(manifest.allowed_domains, vec!["example.com".to_string()]);
    assert_eq!(manifest.fetch_limit, Some(2));
    assert_eq!(manifest.name, "ex");

    for url in ["https://example.com/a", "https://example.com/b"] {
        assert!(session.admit());
        session
            .record_fetch(&fetch(url, "<html></html>"))
            .expect("Failed to record fetch");
    }
    assert!(!session.admit());

    let lines = audit_lines(&session.paths().audit_log);
    assert_eq!(lines.len(), 3, "expected header plus 2 rows: {:?}", lines);
    assert!(lines[1].contains("https://example.com/a"));
    assert!(lines[2].contains("https://example.com/b"));
}

#[test]
fn test_storage_path_embeds_namespace_and_timestamp() {
    let root = TempDir::new().unwrap();
    let store = SessionStore::new(root.path());

    let session = store.create(example_request(None)).unwrap();

    let dir_name = session
        .storage_path()
        .file_name()
        .unwrap()
        .to_string_lossy()
        .to_string();
    let (prefix, stamp) = dir_name.split_once('_').unwrap();
    assert_eq!(prefix, namespace_for("example.com").simple().to_string());
    assert_eq!(stamp.len(), "20240101-000000-000000".len());
    assert_eq!(session.id(), namespace_for("example.com"));
}

#[test]
fn test_mismatched_domains_create_nothing() {
    let root = TempDir::new().unwrap();
    let store = SessionStore::new(root.path());

    let err = store
        .create(NewSession::new(
            "example.com",
            ["https://example.com/a", "https://example.org/b"],
        ))
        .unwrap_err();

    assert!(matches!(err, SessionError::DomainMismatch { .. }));
    assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
}

#[test]
fn test_malformed_start_url_creates_nothing() {
    let root = TempDir::new().unwrap();
    let store = SessionStore::new(root.path());

    let err = store
        .create(NewSession::new("example.com", ["example.com/missing-scheme"]))
        .unwrap_err();

    assert!(matches!(err, SessionError::MalformedUrl(_)));
    assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
}

#[test]
fn test_repeated_create_for_same_domain_never_collides() {
    let root = TempDir::new().unwrap();
    let store = SessionStore::new(root.path());

    let first = store.create(example_request(None)).unwrap();
    let second = store.create(example_request(None)).unwrap();

    assert_eq!(first.id(), second.id());
    assert_ne!(first.storage_path(), second.storage_path());
    assert_eq!(audit_lines(&first.paths().audit_log).len(), 1);
    assert_eq!(audit_lines(&second.paths().audit_log).len(), 1);
}

/// Restores the process working directory when dropped
struct CurrentDirGuard(PathBuf);

impl Drop for CurrentDirGuard {
    fn drop(&mut self) {
        let _ = std::env::set_current_dir(&self.0);
    }
}

#[test]
fn test_relative_root_resumes_from_another_directory() {
    let scratch = TempDir::new().unwrap();
    let first = scratch.path().join("first");
    let second = scratch.path().join("second");
    std::fs::create_dir_all(&first).unwrap();
    std::fs::create_dir_all(&second).unwrap();

    let _guard = CurrentDirGuard(std::env::current_dir().unwrap());

    std::env::set_current_dir(&first).unwrap();
    let created = SessionStore::new("./crawls")
        .create(example_request(None))
        .unwrap();
    created
        .record_fetch(&fetch("https://example.com/a", "<html>a</html>"))
        .unwrap();
    let manifest_path = created.manifest_path().to_path_buf();

    std::env::set_current_dir(&second).unwrap();
    let resumed = SessionStore::load(&manifest_path).unwrap();

    assert!(created.manifest().storage_path.is_absolute());
    assert_eq!(resumed.storage_path(), created.storage_path());
    assert!(resumed.manifest_path().is_file());
    assert_eq!(audit_lines(&resumed.paths().audit_log).len(), 2);
    assert!(!second.join("crawls").exists());
}

#[test]
fn test_sub_domains_become_allowed_domains() {
    let root = TempDir::new().unwrap();
    let store = SessionStore::new(root.path());

    let session = store
        .create(example_request(None).with_sub_domains(["blog", "/docs"]))
        .unwrap();

    assert_eq!(
        session.manifest().allowed_domains,
        vec!["example.com/blog".to_string(), "example.com/docs".to_string()]
    );
}

#[test]
fn test_load_reproduces_manifest_and_keeps_rows() {
    let root = TempDir::new().unwrap();
    let store = SessionStore::new(root.path());
    let created = store.create(example_request(Some(5))).unwrap();
    created
        .record_fetch(&fetch("https://example.com/a", "first"))
        .unwrap();
    let audit_before = std::fs::read_to_string(&created.paths().audit_log).unwrap();
    let manifest_path = created.manifest_path().to_path_buf();
    drop(created);

    let loaded = SessionStore::load(&manifest_path).expect("Failed to load session");

    assert_eq!(loaded.domain(), "example.com");
    assert_eq!(
        loaded.manifest().start_urls,
        vec![
            "https://example.com/a".to_string(),
            "https://example.com/b".to_string()
        ]
    );
    assert_eq!(loaded.manifest().allowed_domains, vec!["example.com".to_string()]);
    assert_eq!(loaded.manifest().fetch_limit, Some(5));
    assert_eq!(
        std::fs::read_to_string(&loaded.paths().audit_log).unwrap(),
        audit_before
    );

    let progress = std::fs::read_to_string(&loaded.paths().progress_log).unwrap();
    let lines: Vec<&str> = progress.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("process_init: "));
    assert!(lines[1].starts_with("process_init_from_yaml: "));
}

#[test]
fn test_load_equals_created_manifest() {
    let root = TempDir::new().unwrap();
    let store = SessionStore::new(root.path());
    let created = store.create(example_request(Some(3))).unwrap();
    let expected = created.manifest().clone();

    let loaded = SessionStore::load(created.manifest_path()).unwrap();

    assert_eq!(loaded.manifest(), &expected);
    assert_eq!(loaded.created_at(), expected.created_at);
}

#[test]
fn test_load_restores_missing_audit_log_and_dirs() {
    let root = TempDir::new().unwrap();
    let store = SessionStore::new(root.path());
    let created = store.create(example_request(None)).unwrap();
    let paths = created.paths().clone();
    drop(created);

    std::fs::remove_file(&paths.audit_log).unwrap();
    std::fs::remove_dir_all(&paths.pages).unwrap();

    let loaded = SessionStore::load(&paths.manifest).unwrap();
    assert!(paths.pages.is_dir());
    assert_eq!(audit_lines(&paths.audit_log), vec![AUDIT_HEADER.to_string()]);

    // A second resume must not duplicate the header
    drop(loaded);
    SessionStore::load(&paths.manifest).unwrap();
    assert_eq!(audit_lines(&paths.audit_log), vec![AUDIT_HEADER.to_string()]);
}

#[test]
fn test_load_corrupt_manifest() {
    let root = TempDir::new().unwrap();
    let store = SessionStore::new(root.path());
    let created = store.create(example_request(None)).unwrap();
    std::fs::write(created.manifest_path(), "domain: [unterminated").unwrap();

    let err = SessionStore::load(created.manifest_path()).unwrap_err();
    assert!(matches!(err, SessionError::ManifestCorrupt { .. }));
}

#[test]
fn test_refetch_overwrites_content() {
    let root = TempDir::new().unwrap();
    let store = SessionStore::new(root.path());
    let session = store.create(example_request(None)).unwrap();

    let first = session
        .record_fetch(&fetch("https://example.com/a", "v1"))
        .unwrap();
    let second = session
        .record_fetch(&fetch("https://example.com/a", "v2"))
        .unwrap();

    assert_eq!(first.page_id, second.page_id);
    assert_eq!(std::fs::read_dir(&session.paths().pages).unwrap().count(), 1);
    assert_eq!(
        std::fs::read(session.pages().path_for(&first.page_id)).unwrap(),
        b"v2".to_vec()
    );
    // Both attempts are audited
    assert_eq!(audit_lines(&session.paths().audit_log).len(), 3);
}

#[test]
fn test_concurrent_fetches_are_audited_once_each() {
    let root = TempDir::new().unwrap();
    let store = SessionStore::new(root.path());
    let limit = 20;
    let session = store.create(example_request(Some(limit))).unwrap();
    let workers = 8;
    let per_worker = 10;

    std::thread::scope(|scope| {
        for w in 0..workers {
            let session = &session;
            scope.spawn(move || {
                for i in 0..per_worker {
                    if session.admit() {
                        let url = format!("https://example.com/{}/{}", w, i);
                        session.record_fetch(&fetch(&url, "body")).unwrap();
                    }
                }
            });
        }
    });

    let lines = audit_lines(&session.paths().audit_log);
    assert_eq!(lines.len() as u64, 1 + limit);
    for line in &lines[1..] {
        assert_eq!(line.split(", ").count(), 7, "malformed row: {}", line);
    }
    assert_eq!(
        std::fs::read_dir(&session.paths().pages).unwrap().count() as u64,
        limit
    );
}

#[test]
fn test_list_all_skips_directories_without_manifest() {
    let root = TempDir::new().unwrap();
    let store = SessionStore::new(root.path());
    store.create(example_request(None)).unwrap();
    store
        .create(NewSession::new("rust-lang.org", ["https://www.rust-lang.org/"]))
        .unwrap();
    std::fs::create_dir(root.path().join("scratch")).unwrap();
    std::fs::write(root.path().join("notes.txt"), "not a session").unwrap();

    let mut domains: Vec<String> = store
        .list_all()
        .unwrap()
        .map(|m| m.expect("Failed to read manifest").domain)
        .collect();
    domains.sort();

    assert_eq!(domains, vec!["example.com".to_string(), "rust-lang.org".to_string()]);

    // Listing can be restarted
    assert_eq!(store.list_all().unwrap().count(), 2);
}

/// Engine double recording the manifests it was asked to run
struct RecordingEngine {
    launched: Mutex<Vec<PathBuf>>,
    status: Option<EngineStatus>,
}

impl RecordingEngine {
    fn exiting_with(status: EngineStatus) -> Self {
        Self {
            launched: Mutex::new(Vec::new()),
            status: Some(status),
        }
    }

    fn failing_to_start() -> Self {
        Self {
            launched: Mutex::new(Vec::new()),
            status: None,
        }
    }
}

impl CrawlEngine for RecordingEngine {
    async fn launch(
        &self,
        manifest_path: &Path,
        log_path: &Path,
    ) -> crawl_session::Result<EngineStatus> {
        self.launched.lock().unwrap().push(manifest_path.to_path_buf());
        match self.status {
            Some(status) => {
                std::fs::write(log_path, "engine ran\n").unwrap();
                Ok(status)
            }
            None => Err(SessionError::Launch {
                program: "recording-engine".to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not installed"),
            }),
        }
    }
}

#[tokio::test]
async fn test_launcher_runs_engine_against_manifest() {
    let root = TempDir::new().unwrap();
    let store = SessionStore::new(root.path());
    let session = store.create(example_request(None)).unwrap();
    let launcher = CrawlLauncher::new(RecordingEngine::exiting_with(EngineStatus::new(
        true,
        Some(0),
    )));

    let status = launcher.launch(&session).await.expect("Launch failed");

    assert!(status.success());
    assert_eq!(
        *launcher.engine().launched.lock().unwrap(),
        vec![session.manifest_path().to_path_buf()]
    );
    assert!(session.engine_log_path().is_file());

    let progress = std::fs::read_to_string(&session.paths().progress_log).unwrap();
    let lines: Vec<&str> = progress.lines().collect();
    assert!(lines[1].starts_with("crawl_start: "));
    assert!(lines[2].starts_with("crawl_end: "));
    assert!(lines[2].ends_with("(exit status 0)"));
}

#[tokio::test]
async fn test_launcher_surfaces_engine_failure_status() {
    let root = TempDir::new().unwrap();
    let store = SessionStore::new(root.path());
    let session = store.create(example_request(None)).unwrap();
    let launcher = CrawlLauncher::new(RecordingEngine::exiting_with(EngineStatus::new(
        false,
        Some(2),
    )));

    let status = launcher.launch(&session).await.unwrap();

    assert!(!status.success());
    assert_eq!(status.code(), Some(2));
}

#[tokio::test]
async fn test_launcher_reports_launch_error_without_retry() {
    let root = TempDir::new().unwrap();
    let store = SessionStore::new(root.path());
    let session = store.create(example_request(None)).unwrap();
    let launcher = CrawlLauncher::new(RecordingEngine::failing_to_start());

    let err = launcher.launch(&session).await.unwrap_err();

    assert!(matches!(err, SessionError::Launch { .. }));
    assert_eq!(launcher.engine().launched.lock().unwrap().len(), 1);
    let progress = std::fs::read_to_string(&session.paths().progress_log).unwrap();
    assert!(progress.trim_end().ends_with("(launch failed)"));
}

#[cfg(unix)]
#[tokio::test]
async fn test_process_engine_reads_manifest() {
    use crawl_session::crawler::ProcessEngine;

    let root = TempDir::new().unwrap();
    let store = SessionStore::new(root.path());
    let session = store.create(example_request(Some(7))).unwrap();
    let engine = ProcessEngine::new("sh").with_args([
        "-c",
        "grep crawl_limit \"$2\"",
        "engine",
    ]);

    let status = CrawlLauncher::new(engine).launch(&session).await.unwrap();

    assert!(status.success());
    let log = std::fs::read_to_string(session.engine_log_path()).unwrap();
    assert!(log.contains("crawl_limit: 7"));
}
