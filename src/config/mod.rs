//! Configuration module for Crawl-Session
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use crawl_session::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("crawl-session.toml")).unwrap();
//! println!("Crawl engine: {}", config.engine.program);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{default_engine_settings, Config, DefaultsConfig, EngineConfig, StorageConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
