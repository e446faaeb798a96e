use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::extract::Strategy;

/// Failures reported by a rendered page or the browser driving it.
///
/// These never cross the extraction boundary on their own: strategies absorb
/// them, and the scraper folds navigation problems into [`ScrapeError`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PageError {
    #[error("Timed out after {timeout:?} waiting for '{selector}'")]
    Timeout { selector: String, timeout: Duration },

    #[error("Invalid selector '{selector}': {message}")]
    InvalidSelector { selector: String, message: String },

    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Evaluation failed: {0}")]
    Evaluation(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Timeout,
    Extraction,
    PageAcquisition,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FailureKind::Timeout => "timeout",
            FailureKind::Extraction => "extraction",
            FailureKind::PageAcquisition => "page_acquisition",
        };
        f.write_str(label)
    }
}

/// The failures a product scrape can report to its caller.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScrapeError {
    #[error("Document body for {url} did not appear within {timeout_ms}ms")]
    BodyTimeout { url: String, timeout_ms: u64 },

    #[error("Could not extract price from {url} (tried: {})", join_strategies(.attempted))]
    Extraction { url: String, attempted: Vec<Strategy> },

    #[error("Page acquisition failed for {url}: {message}")]
    PageAcquisition { url: String, message: String },
}

impl ScrapeError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ScrapeError::BodyTimeout { .. } => FailureKind::Timeout,
            ScrapeError::Extraction { .. } => FailureKind::Extraction,
            ScrapeError::PageAcquisition { .. } => FailureKind::PageAcquisition,
        }
    }

    /// Infrastructure failures are worth another attempt; a page that loaded
    /// but carried no recognisable price is not.
    pub fn is_retryable(&self) -> bool {
        !matches!(self.kind(), FailureKind::Extraction)
    }

    pub fn url(&self) -> &str {
        match self {
            ScrapeError::BodyTimeout { url, .. }
            | ScrapeError::Extraction { url, .. }
            | ScrapeError::PageAcquisition { url, .. } => url,
        }
    }
}

fn join_strategies(strategies: &[Strategy]) -> String {
    strategies
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Product list error: {0}")]
    ProductList(#[from] toml::de::Error),

    #[error("Product list write error: {0}")]
    ProductListWrite(#[from] toml::ser::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    #[error("Plugin error: {plugin_type}: {message}")]
    Plugin { plugin_type: String, message: String },

    #[error(transparent)]
    Scrape(#[from] ScrapeError),
}

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;
