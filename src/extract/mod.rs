//! Price and metadata extraction.
//!
//! Three strategies run in fixed order against a [`crate::page::PageHandle`]:
//! embedded JSON-LD, the selector catalog, and likelihood scoring. The first
//! one to produce an in-bounds price wins.

pub mod catalog;
pub mod metadata;
pub mod orchestrator;
pub mod price_text;
pub mod scoring;
pub mod selectors;
pub mod structured_data;

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub use catalog::{Polarity, SelectorCatalog, SelectorRule};
pub use metadata::{MetadataExtractor, ProductMetadata, VariantAttributes};
pub use orchestrator::PriceExtractor;
pub use scoring::{LikelihoodScorer, PriceCandidate};
pub use selectors::SelectorExtractor;
pub use structured_data::{StructuredDataReader, StructuredProduct};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    StructuredData,
    SelectorMatch,
    Scoring,
}

impl Strategy {
    /// Priority order. Earlier strategies are more trustworthy.
    pub const ORDER: [Strategy; 3] = [
        Strategy::StructuredData,
        Strategy::SelectorMatch,
        Strategy::Scoring,
    ];
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Strategy::StructuredData => "structured_data",
            Strategy::SelectorMatch => "selector_match",
            Strategy::Scoring => "scoring",
        };
        f.write_str(label)
    }
}

/// A successfully extracted price and the strategy that found it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceExtraction {
    pub price: Decimal,
    pub strategy: Strategy,
}
