//! Static selector tables for the selector-based extractor.
//!
//! Positive selectors are ordered by reliability: microdata first, then
//! semantic class/id substrings, then looser amount/cost patterns. Update
//! these tables when a common storefront template changes its markup.

use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    Include,
    Exclude,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorRule {
    pub pattern: String,
    pub polarity: Polarity,
}

impl SelectorRule {
    pub fn include(pattern: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            polarity: Polarity::Include,
        }
    }

    pub fn exclude(pattern: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            polarity: Polarity::Exclude,
        }
    }
}

/// Selectors for one high-traffic storefront, tried before the generic list
/// whenever the page host contains `host_marker`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorSelectors {
    pub vendor: String,
    pub host_marker: String,
    pub rules: Vec<SelectorRule>,
}

const UNIVERSAL_SELECTORS: &[&str] = &[
    // Schema.org microdata
    "[itemprop=\"price\"]",
    "[itemprop*=\"price\"]",
    // Generic semantic selectors
    "[class*=\"price\"]",
    "[id*=\"price\"]",
    "[data-price]",
    "[data-testid*=\"price\"]",
    "[aria-label*=\"price\"]",
    // Specific price-related classes
    "[class*=\"current-price\"]",
    "[class*=\"currentPrice\"]",
    "[class*=\"sale-price\"]",
    "[class*=\"salePrice\"]",
    "[class*=\"final-price\"]",
    "[class*=\"finalPrice\"]",
    "[class*=\"product-price\"]",
    "[class*=\"productPrice\"]",
    // Amount/cost alternatives
    "[class*=\"amount\"]",
    "[class*=\"cost\"]",
    "[data-amount]",
    ".price",
    ".price-now",
    ".sale-price",
    ".current-price",
    ".product-price",
    "#price",
    "#product-price",
    "[data-testid*=\"amount\"]",
    "[title*=\"price\"]",
];

/// Old/comparison price containers.
const EXCLUDE_SELECTORS: &[&str] = &[
    "[class*=\"was\"]",
    "[class*=\"original\"]",
    "[class*=\"list-price\"]",
    "[class*=\"listPrice\"]",
    "[class*=\"msrp\"]",
    "[class*=\"compare\"]",
    "[class*=\"strike\"]",
    "[class*=\"old-price\"]",
    "[class*=\"oldPrice\"]",
    "[data-a-strike]",
    "strike",
    "s",
    "del",
];

const AMAZON_SELECTORS: &[&str] = &[
    ".a-price .a-offscreen",
    ".a-price-whole",
    ".a-price.a-text-normal",
    ".a-price.a-text-price",
    "[data-a-color=\"base\"] .a-price",
    ".a-price[data-a-size=\"l\"]",
    ".reinventPriceAccordionT2 .a-price",
    ".a-price.a-text-normal.aok-align-center",
];

/// Case-insensitive substrings that disqualify an element by class name.
const EXCLUDED_CLASS_KEYWORDS: &[&str] = &[
    "strike",
    "was",
    "original",
    "list-price",
    "listprice",
    "msrp",
    "compare",
    "shipping",
    "tax",
    "protection",
    "warranty",
];

/// Case-insensitive substrings that disqualify an element by its text.
const EXCLUDED_TEXT_KEYWORDS: &[&str] = &[
    "was ",
    "was:",
    "original price",
    "list price",
    "msrp",
    "shipping",
    "tax",
    "protection",
    "warranty",
];

/// Immutable selector configuration, built once and shared between scrapes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorCatalog {
    pub vendors: Vec<VendorSelectors>,
    pub rules: Vec<SelectorRule>,
    pub excluded_class_keywords: Vec<String>,
    pub excluded_text_keywords: Vec<String>,
}

impl SelectorCatalog {
    pub fn standard() -> Self {
        let rules = UNIVERSAL_SELECTORS
            .iter()
            .map(|p| SelectorRule::include(p))
            .chain(EXCLUDE_SELECTORS.iter().map(|p| SelectorRule::exclude(p)))
            .collect();

        Self {
            vendors: vec![VendorSelectors {
                vendor: "Amazon".to_string(),
                host_marker: "amazon.".to_string(),
                rules: AMAZON_SELECTORS.iter().map(|p| SelectorRule::include(p)).collect(),
            }],
            rules,
            excluded_class_keywords: to_owned(EXCLUDED_CLASS_KEYWORDS),
            excluded_text_keywords: to_owned(EXCLUDED_TEXT_KEYWORDS),
        }
    }

    pub fn positive(&self) -> impl Iterator<Item = &SelectorRule> {
        self.rules.iter().filter(|r| r.polarity == Polarity::Include)
    }

    pub fn negative(&self) -> impl Iterator<Item = &SelectorRule> {
        self.rules.iter().filter(|r| r.polarity == Polarity::Exclude)
    }

    /// Vendor lists whose host marker appears in `url`'s host, in catalog order.
    pub fn vendor_rules<'a>(&'a self, url: &Url) -> impl Iterator<Item = &'a SelectorRule> + 'a {
        let host = url.host_str().unwrap_or("").to_ascii_lowercase();
        self.vendors
            .iter()
            .filter(move |v| host.contains(&v.host_marker))
            .flat_map(|v| v.rules.iter())
    }

    pub fn is_excluded(&self, class_name: &str, text: &str) -> bool {
        let class_name = class_name.to_lowercase();
        let text = text.to_lowercase();

        self.excluded_class_keywords.iter().any(|k| class_name.contains(k.as_str()))
            || self.excluded_text_keywords.iter().any(|k| text.contains(k.as_str()))
    }
}

impl Default for SelectorCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

fn to_owned(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}
