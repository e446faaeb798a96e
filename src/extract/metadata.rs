//! Product title, image, canonical URL, vendor and variant attributes.
//!
//! Each field walks its own ordered candidate list and keeps the first value
//! that passes validation. Nothing here fails a scrape: missing fields fall
//! back to safe defaults.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use super::structured_data::{StructuredDataReader, StructuredProduct};
use crate::page::{PageHandle, PageQuery};

pub const UNKNOWN_TITLE: &str = "Unknown Product";
pub const UNKNOWN_VENDOR: &str = "Unknown";

const MAX_TITLE_CHARS: usize = 200;
const MAX_VARIANT_CHARS: usize = 100;
const MIN_IMAGE_SIDE: u32 = 200;

static CAPACITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b\d+(?:\.\d+)?\s*(?:GB|TB|MB)\b").unwrap());

/// Where a field value may come from.
#[derive(Debug, Clone)]
enum Source {
    Attr(&'static str, &'static str),
    Text(&'static str),
    Query(PageQuery),
}

const TITLE_SOURCES: &[Source] = &[
    Source::Attr("meta[property=\"og:title\"]", "content"),
    Source::Attr("meta[name=\"twitter:title\"]", "content"),
    Source::Attr("meta[property=\"twitter:title\"]", "content"),
    Source::Text("h1"),
    Source::Text("[itemprop=\"name\"]"),
    Source::Text("[class*=\"product-title\"]"),
    Source::Text("[class*=\"productTitle\"]"),
    Source::Text("[class*=\"product-name\"]"),
    Source::Text("#productTitle"),
    Source::Text("[id*=\"product-title\"]"),
    Source::Query(PageQuery::DocumentTitle),
];

const IMAGE_SOURCES: &[Source] = &[
    Source::Attr("meta[property=\"og:image\"]", "content"),
    Source::Attr("meta[property=\"og:image:secure_url\"]", "content"),
    Source::Attr("meta[name=\"twitter:image\"]", "content"),
    Source::Attr("[itemprop=\"image\"]", "src"),
    Source::Attr("[itemprop=\"image\"]", "content"),
    Source::Attr("[itemprop=\"image\"]", "href"),
    Source::Attr("#landingImage", "src"),
    Source::Attr("img[class*=\"product\"]", "src"),
    Source::Attr("img[id*=\"product\"]", "src"),
    Source::Attr("img[class*=\"main\"]", "src"),
    Source::Query(PageQuery::LargestImage {
        min_width: MIN_IMAGE_SIDE,
        min_height: MIN_IMAGE_SIDE,
    }),
];

const CANONICAL_SOURCES: &[Source] = &[
    Source::Attr("link[rel=\"canonical\"]", "href"),
    Source::Attr("meta[property=\"og:url\"]", "content"),
    Source::Query(PageQuery::LocationHref),
];

const BRAND_SOURCES: &[Source] = &[
    Source::Attr("meta[property=\"product:brand\"]", "content"),
    Source::Attr("meta[itemprop=\"brand\"]", "content"),
    Source::Text("[itemprop=\"brand\"] [itemprop=\"name\"]"),
    Source::Text("[itemprop=\"brand\"]"),
    Source::Text("#bylineInfo"),
    Source::Text("[class*=\"product-brand\"]"),
];

const COLOR_SOURCES: &[Source] = &[
    Source::Attr("meta[property=\"product:color\"]", "content"),
    Source::Attr("meta[itemprop=\"color\"]", "content"),
    Source::Text("[itemprop=\"color\"]"),
    Source::Text("#variation_color_name .selection"),
    Source::Text("[class*=\"selected-color\"]"),
];

const SIZE_SOURCES: &[Source] = &[
    Source::Attr("meta[property=\"product:size\"]", "content"),
    Source::Attr("meta[itemprop=\"size\"]", "content"),
    Source::Text("[itemprop=\"size\"]"),
    Source::Text("#variation_size_name .selection"),
    Source::Text("[class*=\"selected-size\"]"),
];

const CAPACITY_SOURCES: &[Source] = &[
    Source::Text("#variation_size_name .selection"),
    Source::Text("[class*=\"selected-capacity\"]"),
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantAttributes {
    pub brand: Option<String>,
    pub color: Option<String>,
    pub capacity: Option<String>,
    pub size: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductMetadata {
    pub title: String,
    pub image: Option<String>,
    pub url: String,
    pub vendor: String,
    pub variants: VariantAttributes,
    /// Stock status from structured data, when the page declares one.
    pub in_stock: Option<bool>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MetadataExtractor {
    structured: StructuredDataReader,
}

impl MetadataExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn extract<P>(&self, page: &P, page_url: &Url) -> ProductMetadata
    where
        P: PageHandle + ?Sized,
    {
        let (title, image, canonical, structured) = tokio::join!(
            self.title(page),
            self.image(page, page_url),
            self.canonical(page, page_url),
            self.structured_product(page),
        );

        let variants = self.variants(page, &structured, &title).await;

        ProductMetadata {
            vendor: vendor_from_url(canonical.as_str()),
            title,
            image,
            url: canonical.to_string(),
            variants,
            in_stock: structured.in_stock,
        }
    }

    async fn title<P: PageHandle + ?Sized>(&self, page: &P) -> String {
        for source in TITLE_SOURCES {
            let Some(raw) = read_source(page, source).await else {
                continue;
            };
            if let Some(title) = clean_text(&raw, MAX_TITLE_CHARS) {
                return title;
            }
        }
        UNKNOWN_TITLE.to_string()
    }

    async fn image<P: PageHandle + ?Sized>(&self, page: &P, page_url: &Url) -> Option<String> {
        let base = document_base(page, page_url).await;
        for source in IMAGE_SOURCES {
            let Some(raw) = read_source(page, source).await else {
                continue;
            };
            if let Some(image) = resolve_http(&base, &raw) {
                return Some(image.to_string());
            }
        }
        None
    }

    async fn canonical<P: PageHandle + ?Sized>(&self, page: &P, page_url: &Url) -> Url {
        for source in CANONICAL_SOURCES {
            let Some(raw) = read_source(page, source).await else {
                continue;
            };
            if let Some(url) = resolve_http(page_url, &raw) {
                return url;
            }
        }
        page_url.clone()
    }

    async fn structured_product<P: PageHandle + ?Sized>(&self, page: &P) -> StructuredProduct {
        self.structured.read_product(page).await.unwrap_or_else(|e| {
            debug!("Structured product data unavailable: {}", e);
            StructuredProduct::default()
        })
    }

    async fn variants<P: PageHandle + ?Sized>(
        &self,
        page: &P,
        structured: &StructuredProduct,
        title: &str,
    ) -> VariantAttributes {
        let brand = match &structured.brand {
            Some(brand) => Some(brand.clone()),
            None => first_text(page, BRAND_SOURCES).await,
        };
        let color = match &structured.color {
            Some(color) => Some(color.clone()),
            None => first_text(page, COLOR_SOURCES).await,
        };
        let size = match &structured.size {
            Some(size) => Some(size.clone()),
            None => first_text(page, SIZE_SOURCES).await,
        };
        let capacity = match &structured.capacity {
            Some(capacity) => Some(capacity.clone()),
            None => first_text(page, CAPACITY_SOURCES)
                .await
                .filter(|text| CAPACITY.is_match(text))
                .or_else(|| capacity_from_title(title)),
        };

        VariantAttributes {
            brand,
            color,
            capacity,
            size,
        }
    }
}

async fn first_text<P: PageHandle + ?Sized>(page: &P, sources: &[Source]) -> Option<String> {
    for source in sources {
        if let Some(text) = read_source(page, source).await.and_then(|raw| clean_text(&raw, MAX_VARIANT_CHARS)) {
            return Some(text);
        }
    }
    None
}

async fn read_source<P: PageHandle + ?Sized>(page: &P, source: &Source) -> Option<String> {
    let result = match source {
        Source::Attr(selector, attribute) => page
            .query_selector(selector)
            .await
            .map(|found| found.and_then(|e| e.attr(attribute).map(str::to_string))),
        Source::Text(selector) => page
            .query_selector(selector)
            .await
            .map(|found| found.map(|e| e.text)),
        Source::Query(query) => page
            .evaluate(query)
            .await
            .map(|value| value.as_str().map(str::to_string)),
    };

    match result {
        Ok(value) => value,
        Err(e) => {
            debug!("Metadata source {:?} failed: {}", source, e);
            None
        }
    }
}

/// `<base href>` when the document declares one, otherwise the page URL.
async fn document_base<P: PageHandle + ?Sized>(page: &P, page_url: &Url) -> Url {
    read_source(page, &Source::Attr("base[href]", "href"))
        .await
        .and_then(|href| page_url.join(href.trim()).ok())
        .unwrap_or_else(|| page_url.clone())
}

fn resolve_http(base: &Url, raw: &str) -> Option<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let url = base.join(raw).ok()?;
    matches!(url.scheme(), "http" | "https").then_some(url)
}

/// Collapses whitespace and rejects empty or overlong values.
fn clean_text(raw: &str, max_chars: usize) -> Option<String> {
    let text = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let length = text.chars().count();
    (length > 0 && length <= max_chars).then_some(text)
}

fn capacity_from_title(title: &str) -> Option<String> {
    CAPACITY.find(title).map(|m| m.as_str().to_string())
}

/// Vendor name from the host: `www.best-buy.com` becomes `Best-buy`.
pub fn vendor_from_url(url: &str) -> String {
    let Some(host) = Url::parse(url).ok().and_then(|u| u.host_str().map(str::to_ascii_lowercase)) else {
        return UNKNOWN_VENDOR.to_string();
    };

    let host = host.strip_prefix("www.").unwrap_or(&host);
    let label = host.split('.').next().unwrap_or_default();

    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => UNKNOWN_VENDOR.to_string(),
    }
}
