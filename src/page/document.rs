use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;

use super::{ElementSnapshot, NodeRef, PageHandle, PageQuery};
use crate::utils::error::PageError;

/// A page that is already fully rendered: saved HTML plus the URL it came from.
///
/// The markup is re-parsed per query. `scraper::Html` is not `Sync`, and a
/// product page parses in well under a millisecond.
#[derive(Debug, Clone)]
pub struct StaticDocument {
    url: String,
    html: String,
}

impl StaticDocument {
    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            html: html.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn parse_selector(selector: &str) -> Result<Selector, PageError> {
        Selector::parse(selector).map_err(|e| PageError::InvalidSelector {
            selector: selector.to_string(),
            message: format!("{:?}", e),
        })
    }

    fn snapshot_all(&self, selector: &str) -> Result<Vec<ElementSnapshot>, PageError> {
        let css_selector = Self::parse_selector(selector)?;
        let document = Html::parse_document(&self.html);

        let order: HashMap<_, usize> = document
            .root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
            .enumerate()
            .map(|(index, element)| (element.id(), index))
            .collect();

        let mut snapshots: Vec<ElementSnapshot> = document
            .select(&css_selector)
            .map(|element| {
                let position = order.get(&element.id()).copied().unwrap_or(usize::MAX);
                snapshot(element, NodeRef(position))
            })
            .collect();

        snapshots.sort_by_key(|s| s.node);
        Ok(snapshots)
    }

    fn largest_image(&self, min_width: u32, min_height: u32) -> Option<String> {
        let document = Html::parse_document(&self.html);
        let selector = Selector::parse("img[src]").ok()?;

        let mut best: Option<(u64, String)> = None;
        for img in document.select(&selector) {
            let width = dimension(img.value().attr("width"));
            let height = dimension(img.value().attr("height"));
            let (Some(width), Some(height)) = (width, height) else {
                continue;
            };
            if width <= min_width || height <= min_height {
                continue;
            }

            let area = u64::from(width) * u64::from(height);
            if best.as_ref().is_none_or(|(best_area, _)| area > *best_area) {
                if let Some(src) = img.value().attr("src") {
                    best = Some((area, src.to_string()));
                }
            }
        }

        best.map(|(_, src)| src)
    }

    fn title(&self) -> Option<String> {
        let document = Html::parse_document(&self.html);
        let selector = Selector::parse("title").ok()?;
        document
            .select(&selector)
            .next()
            .map(|t| t.text().collect::<String>())
    }
}

fn snapshot(element: ElementRef<'_>, node: NodeRef) -> ElementSnapshot {
    let attributes: BTreeMap<String, String> = element
        .value()
        .attrs()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect();

    ElementSnapshot {
        node,
        tag: element.value().name().to_string(),
        text: element.text().collect::<String>(),
        attributes,
    }
}

fn dimension(value: Option<&str>) -> Option<u32> {
    value?.trim().trim_end_matches("px").parse().ok()
}

#[async_trait]
impl PageHandle for StaticDocument {
    async fn query_selector(&self, selector: &str) -> Result<Option<ElementSnapshot>, PageError> {
        Ok(self.snapshot_all(selector)?.into_iter().next())
    }

    async fn query_selector_all(&self, selector: &str) -> Result<Vec<ElementSnapshot>, PageError> {
        self.snapshot_all(selector)
    }

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<(), PageError> {
        // Nothing will ever be added to a static document, so there is no point waiting.
        if self.snapshot_all(selector)?.is_empty() {
            return Err(PageError::Timeout {
                selector: selector.to_string(),
                timeout,
            });
        }
        Ok(())
    }

    async fn evaluate(&self, query: &PageQuery) -> Result<Value, PageError> {
        let value = match query {
            PageQuery::DocumentTitle => self.title().map(Value::String),
            PageQuery::LocationHref => Some(Value::String(self.url.clone())),
            PageQuery::LargestImage {
                min_width,
                min_height,
            } => self.largest_image(*min_width, *min_height).map(Value::String),
        };
        Ok(value.unwrap_or(Value::Null))
    }
}
