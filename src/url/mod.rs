//! URL handling module for Crawl-Session
//!
//! This module resolves the canonical domain of a seed URL and derives the short
//! human-readable label used as a session's default name.

mod domain;

pub use domain::{resolve_domain, slugify};
