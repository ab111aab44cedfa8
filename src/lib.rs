//! Site Tomograph: a bounded structural site scanner
//!
//! This crate crawls a single site from one seed URL, builds a live topology
//! graph of pages and links, classifies each page's health, and streams a
//! diagnosis followed by a final structured report.

pub mod config;
pub mod crawler;
pub mod diagnose;
pub mod events;
pub mod graph;
pub mod limits;
pub mod report;
pub mod robots;
pub mod url;

use thiserror::Error;

/// Main error type for Site Tomograph operations
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Guard(#[from] GuardError),

    #[error("{0}")]
    Admission(#[from] limits::AdmissionError),

    #[error("Graph invariant violation: {0}")]
    Graph(#[from] graph::GraphError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Internal invariant violation: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Errors produced by the URL validator / SSRF guard.
///
/// The display strings are intentionally generic: they carry no resolved
/// addresses, file paths, or other internals, so they are safe to surface
/// directly to a remote caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GuardError {
    #[error("Invalid URL")]
    InvalidUrl,

    #[error("Only HTTP and HTTPS URLs are supported")]
    UnsupportedScheme,

    #[error("Scanning this target is not allowed")]
    BlockedTarget,
}

/// Result type alias for Site Tomograph operations
pub type Result<T> = std::result::Result<T, ScanError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlSession, StopHandle, Termination};
pub use events::{EventEmitter, ScanEvent};
pub use graph::{HealthStatus, PageGraph};
pub use limits::{RateGovernor, ScanPermit};
pub use report::Report;
pub use url::SsrfGuard;
