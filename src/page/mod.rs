//! The rendered-page abstraction the extraction engine runs against.
//!
//! Extraction never touches a browser directly. It asks a [`PageHandle`] for
//! element snapshots by selector and for a handful of document-level facts
//! described by [`PageQuery`], so the same strategies run against a live
//! Chrome tab or a saved HTML file.

pub mod chrome;
pub mod document;

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::utils::error::PageError;

pub use chrome::{ChromeContext, ChromeDriver};
pub use document::StaticDocument;

/// Position of an element in document order. Stable for as long as the DOM
/// is not mutated, which lets results of separate queries be compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeRef(pub usize);

/// A read-only copy of one element, taken at query time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementSnapshot {
    pub node: NodeRef,
    pub tag: String,
    /// Full descendant text, as `textContent` reports it.
    pub text: String,
    pub attributes: BTreeMap<String, String>,
}

impl ElementSnapshot {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn class_name(&self) -> &str {
        self.attr("class").unwrap_or("")
    }

    pub fn id(&self) -> &str {
        self.attr("id").unwrap_or("")
    }
}

/// Document-level questions that cannot be phrased as a selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "query", rename_all = "snake_case")]
pub enum PageQuery {
    /// `document.title`, or null when absent.
    DocumentTitle,
    /// The URL the page currently shows.
    LocationHref,
    /// `src` of the largest `<img>` whose rendered size exceeds both bounds, or null.
    LargestImage { min_width: u32, min_height: u32 },
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PageHandle: Send + Sync {
    /// First element matching `selector`, in document order.
    async fn query_selector(&self, selector: &str) -> Result<Option<ElementSnapshot>, PageError>;

    /// Every element matching `selector`, in document order.
    async fn query_selector_all(&self, selector: &str) -> Result<Vec<ElementSnapshot>, PageError>;

    /// Resolves once `selector` matches, or fails with [`PageError::Timeout`].
    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<(), PageError>;

    async fn evaluate(&self, query: &PageQuery) -> Result<serde_json::Value, PageError>;
}
