//! Crawl-Session main entry point
//!
//! This is the command-line interface for creating, running, resuming and
//! listing crawl sessions.

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use crawl_session::config::{load_config_with_hash, Config};
use crawl_session::crawler::{CrawlLauncher, ProcessEngine};
use crawl_session::session::{NewSession, Session, SessionStore};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Crawl-Session: durable, resumable crawl sessions
///
/// Creates content-addressed crawl sessions and hands them to an external
/// crawl engine.
#[derive(Parser, Debug)]
#[command(name = "crawl-session")]
#[command(version)]
#[command(about = "Durable, resumable crawl sessions", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a session and print its manifest path
    Create(SessionArgs),

    /// Create a session and run the crawl engine against it
    Run(SessionArgs),

    /// Reload a session from its manifest and run the crawl engine again
    Resume {
        /// Path to the session's manifest.yaml
        #[arg(value_name = "MANIFEST")]
        manifest: PathBuf,
    },

    /// List every session under the storage root
    List,
}

#[derive(Args, Debug)]
struct SessionArgs {
    /// Start URLs; all must share one domain
    #[arg(value_name = "URL", required = true)]
    urls: Vec<String>,

    /// Session name (defaults to a label derived from the first URL)
    #[arg(long)]
    name: Option<String>,

    /// Path prefix below the domain the crawl may follow into (repeatable)
    #[arg(long = "sub-domain", value_name = "PATH")]
    sub_domains: Vec<String>,

    /// Maximum number of fetches (overrides the configured default)
    #[arg(long)]
    limit: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    match cli.command {
        Command::Create(args) => {
            let session = create_session(&config, args)?;
            println!("{}", session.manifest_path().display());
        }
        Command::Run(args) => {
            let session = create_session(&config, args)?;
            run_session(&config, &session).await?;
        }
        Command::Resume { manifest } => {
            let session = SessionStore::load(&manifest)
                .with_context(|| format!("failed to resume {}", manifest.display()))?;
            run_session(&config, &session).await?;
        }
        Command::List => list_sessions(&config)?,
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("crawl_session=info,warn"),
            1 => EnvFilter::new("crawl_session=debug,info"),
            2 => EnvFilter::new("crawl_session=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn create_session(config: &Config, args: SessionArgs) -> anyhow::Result<Session> {
    let mut request = NewSession::for_urls(args.urls)?
        .with_sub_domains(args.sub_domains)
        .with_fetch_limit(args.limit)
        .with_config(config)?;
    if let Some(name) = args.name {
        request = request.with_name(name);
    }

    let store = SessionStore::new(&config.storage.root);
    let session = store.create(request).context("failed to create session")?;
    Ok(session)
}

async fn run_session(config: &Config, session: &Session) -> anyhow::Result<()> {
    let launcher = CrawlLauncher::new(ProcessEngine::from_config(&config.engine));
    let status = launcher.launch(session).await?;

    if !status.success() {
        bail!(
            "crawl engine failed ({}); see {}",
            status,
            session.engine_log_path().display()
        );
    }

    println!("✓ Crawl finished: {}", session.storage_path().display());
    Ok(())
}

fn list_sessions(config: &Config) -> anyhow::Result<()> {
    let store = SessionStore::new(&config.storage.root);
    let mut count = 0;

    for manifest in store.list_all()? {
        match manifest {
            Ok(manifest) => {
                count += 1;
                let limit = manifest
                    .fetch_limit
                    .map(|l| l.to_string())
                    .unwrap_or_else(|| "unbounded".to_string());
                println!(
                    "{}  {}  {}  limit={}  {}",
                    manifest.created_at.format("%Y-%m-%d %H:%M:%S"),
                    manifest.name,
                    manifest.domain,
                    limit,
                    manifest.storage_path.display()
                );
            }
            Err(e) => tracing::warn!("{}", e),
        }
    }

    println!("\n{} session(s) under {}", count, config.storage.root);
    Ok(())
}
