//! Deco-Sweep: a retrying harness around an external link-decoration crawler
//!
//! This crate drives an opaque crawling tool against a list of sites to find
//! out whether outbound links carry tracking decorations, and whether
//! user-supplied rules strip them. It decides how often to re-run the tool,
//! under which variant, how to read success out of the output folders and
//! logs, and how much control evidence to gather once a signal appears.

pub mod config;
pub mod crawler;
pub mod jobs;
pub mod output;
pub mod state;
pub mod url;

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Deco-Sweep operations
#[derive(Debug, Error)]
pub enum SweepError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Dataset error: {0}")]
    Dataset(#[from] DatasetError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("Failed to launch crawler '{program}': {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("Failed to prepare working directory {path}: {source}")]
    Workspace {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to append to error ledger {path}: {source}")]
    Ledger {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::ControllerState,
        to: state::ControllerState,
    },

    #[error("Worker for {site} stopped unexpectedly: {message}")]
    Worker { site: String, message: String },

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

/// Errors raised while reading the site/rule dataset
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Failed to read dataset: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse dataset: {0}")]
    Csv(#[from] csv::Error),

    #[error("Malformed row at line {line}: expected 3 fields, got {fields}")]
    Malformed { line: u64, fields: usize },
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,
}

/// Result type alias for Deco-Sweep operations
pub type Result<T> = std::result::Result<T, SweepError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for dataset operations
pub type DatasetResult<T> = std::result::Result<T, DatasetError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Coordinator, RetryController};
pub use jobs::{RuleSet, SiteJob};
pub use state::{ControllerState, JobOutcome, Stage};
pub use crate::url::{canonical_url, registrable_domain};
