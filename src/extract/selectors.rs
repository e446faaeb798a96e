use std::collections::HashSet;
use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::debug;
use url::Url;

use super::catalog::SelectorCatalog;
use super::price_text::{contains_price, parse_price, within_bounds};
use crate::page::{ElementSnapshot, NodeRef, PageHandle};
use crate::utils::error::PageError;

/// Walks the selector catalog in order and returns the first acceptable price.
#[derive(Debug, Clone)]
pub struct SelectorExtractor {
    catalog: Arc<SelectorCatalog>,
    ceiling: Decimal,
}

impl SelectorExtractor {
    pub fn new(catalog: Arc<SelectorCatalog>, ceiling: Decimal) -> Self {
        Self { catalog, ceiling }
    }

    pub async fn extract<P>(&self, page: &P, url: &Url) -> Result<Option<Decimal>, PageError>
    where
        P: PageHandle + ?Sized,
    {
        let excluded = self.excluded_nodes(page).await;

        let rules = self
            .catalog
            .vendor_rules(url)
            .chain(self.catalog.positive());

        for rule in rules {
            let elements = match page.query_selector_all(&rule.pattern).await {
                Ok(elements) => elements,
                Err(e) => {
                    debug!("Skipping selector '{}': {}", rule.pattern, e);
                    continue;
                }
            };

            for element in &elements {
                if let Some(price) = self.accept(element, &excluded) {
                    debug!("Selector '{}' matched price {}", rule.pattern, price);
                    return Ok(Some(price));
                }
            }
        }

        Ok(None)
    }

    /// Nodes matched by a negative selector, together with everything nested inside them.
    async fn excluded_nodes<P>(&self, page: &P) -> HashSet<NodeRef>
    where
        P: PageHandle + ?Sized,
    {
        let mut excluded = HashSet::new();

        for rule in self.catalog.negative() {
            for pattern in [rule.pattern.clone(), format!("{} *", rule.pattern)] {
                match page.query_selector_all(&pattern).await {
                    Ok(elements) => excluded.extend(elements.iter().map(|e| e.node)),
                    Err(e) => debug!("Skipping exclusion selector '{}': {}", pattern, e),
                }
            }
        }

        excluded
    }

    fn accept(&self, element: &ElementSnapshot, excluded: &HashSet<NodeRef>) -> Option<Decimal> {
        if excluded.contains(&element.node) {
            return None;
        }

        let text = element.text.trim();
        if self.catalog.is_excluded(element.class_name(), text) {
            debug!("Rejected excluded candidate '{}' (class '{}')", text, element.class_name());
            return None;
        }

        // Microdata often carries the price in `content` on an otherwise empty tag.
        let price = if text.is_empty() {
            parse_price(element.attr("content")?)
        } else if contains_price(text) {
            parse_price(text)
        } else {
            None
        }?;

        if !within_bounds(price, self.ceiling) {
            debug!("Rejected out-of-bounds price {} from '{}'", price, text);
            return None;
        }

        Some(price)
    }
}
