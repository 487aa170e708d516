//! Crawler-facing module: admission control and engine launching
//!
//! This module contains the two pieces the external crawl engine interacts with:
//! - The frontier limiter consulted before every fetch
//! - The launcher that runs the engine against a persisted session

mod launcher;
mod limiter;

pub use launcher::{CrawlEngine, CrawlLauncher, EngineStatus, ProcessEngine};
pub use limiter::FrontierLimiter;
