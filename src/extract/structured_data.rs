//! JSON-LD (schema.org) product markup.
//!
//! Every `<script type="application/ld+json">` block is parsed on its own; a
//! block that fails to parse is skipped without affecting the others.

use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::page::PageHandle;
use crate::utils::error::PageError;

pub const JSON_LD_SELECTOR: &str = "script[type=\"application/ld+json\"]";

/// Leading number of a string price. Commas only count as thousands
/// separators, so `"49,99"` stops at the comma.
static LEADING_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,3}(?:,\d{3})+|\d+)(?:\.(\d+))?").unwrap());

const OUT_OF_STOCK_MARKERS: &[&str] = &["OutOfStock", "SoldOut", "Discontinued"];

/// What the first `Product` item carrying data says about the product.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuredProduct {
    pub price: Option<Decimal>,
    pub in_stock: Option<bool>,
    pub brand: Option<String>,
    pub color: Option<String>,
    pub size: Option<String>,
    pub capacity: Option<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StructuredDataReader;

impl StructuredDataReader {
    pub fn new() -> Self {
        Self
    }

    pub async fn read_price<P>(&self, page: &P) -> Result<Option<Decimal>, PageError>
    where
        P: PageHandle + ?Sized,
    {
        let blocks = Self::blocks(page).await?;
        Ok(price_from_blocks(&blocks))
    }

    pub async fn read_product<P>(&self, page: &P) -> Result<StructuredProduct, PageError>
    where
        P: PageHandle + ?Sized,
    {
        let blocks = Self::blocks(page).await?;
        Ok(product_from_blocks(&blocks))
    }

    async fn blocks<P>(page: &P) -> Result<Vec<String>, PageError>
    where
        P: PageHandle + ?Sized,
    {
        let scripts = page.query_selector_all(JSON_LD_SELECTOR).await?;
        debug!("Found {} JSON-LD blocks", scripts.len());
        Ok(scripts.into_iter().map(|s| s.text).collect())
    }
}

/// Highest valid offer price of the first `Product` item that has one.
///
/// Taking the maximum is deliberate: storefronts list accessory and add-on
/// offers (cables, cases, protection plans) under the same `Product`, and
/// those are cheaper than the item itself. It will pick the wrong offer when
/// a bundle is listed above the base item; treat it as a heuristic.
pub fn price_from_blocks(blocks: &[String]) -> Option<Decimal> {
    product_items(blocks)
        .iter()
        .find_map(|item| offer_prices(item).into_iter().max())
}

pub fn product_from_blocks(blocks: &[String]) -> StructuredProduct {
    let items = product_items(blocks);
    let mut product = StructuredProduct {
        price: items
            .iter()
            .find_map(|item| offer_prices(item).into_iter().max()),
        ..StructuredProduct::default()
    };

    for item in &items {
        product.in_stock = product.in_stock.or_else(|| availability(item));
        product.brand = product.brand.take().or_else(|| named(item.get("brand")));
        product.color = product.color.take().or_else(|| named(item.get("color")));
        product.size = product.size.take().or_else(|| named(item.get("size")));
        product.capacity = product.capacity.take().or_else(|| capacity_property(item));
    }

    product
}

/// Flattens every parseable block into its `Product`-typed items, in page order.
fn product_items(blocks: &[String]) -> Vec<Value> {
    let mut products = Vec::new();

    for block in blocks {
        let data: Value = match serde_json::from_str(block.trim()) {
            Ok(data) => data,
            Err(e) => {
                debug!("Skipping malformed JSON-LD block: {}", e);
                continue;
            }
        };

        let top_level = match data {
            Value::Array(items) => items,
            other => vec![other],
        };

        for item in top_level {
            if let Some(Value::Array(graph)) = item.get("@graph") {
                products.extend(graph.iter().filter(|g| is_product(g)).cloned());
            }
            if is_product(&item) {
                products.push(item);
            }
        }
    }

    products
}

fn is_product(item: &Value) -> bool {
    match item.get("@type") {
        Some(Value::String(t)) => is_product_type(t),
        Some(Value::Array(types)) => types
            .iter()
            .filter_map(Value::as_str)
            .any(is_product_type),
        _ => false,
    }
}

fn is_product_type(t: &str) -> bool {
    t == "Product" || t == "schema:Product" || t.ends_with("schema.org/Product")
}

/// Valid prices directly on the item and on each of its offers.
fn offer_prices(item: &Value) -> Vec<Decimal> {
    let mut prices: Vec<Decimal> = offers(item)
        .into_iter()
        .filter_map(|offer| offer.get("price").and_then(ld_price))
        .collect();

    if let Some(direct) = item.get("price").and_then(ld_price) {
        prices.push(direct);
    }

    prices
}

fn offers(item: &Value) -> Vec<&Value> {
    match item.get("offers") {
        Some(Value::Array(offers)) => offers.iter().collect(),
        Some(offer @ Value::Object(_)) => vec![offer],
        _ => Vec::new(),
    }
}

/// Numeric or string price. Strings keep their leading number, so
/// `"49.99 USD"` reads as 49.99. Zero, negative and non-numeric values are rejected.
fn ld_price(value: &Value) -> Option<Decimal> {
    let price = match value {
        Value::Number(n) => {
            let raw = n.to_string();
            Decimal::from_str(&raw)
                .or_else(|_| Decimal::from_scientific(&raw))
                .ok()?
        }
        Value::String(s) => {
            let captures = LEADING_NUMBER.captures(s.trim())?;
            let whole = captures.get(1)?.as_str().replace(',', "");
            let numeric = match captures.get(2) {
                Some(fraction) => format!("{}.{}", whole, fraction.as_str()),
                None => whole,
            };
            Decimal::from_str(&numeric).ok()?
        }
        _ => return None,
    };

    (price > Decimal::ZERO).then_some(price)
}

fn availability(item: &Value) -> Option<bool> {
    let mut statuses = offers(item)
        .into_iter()
        .chain(std::iter::once(item))
        .filter_map(|v| v.get("availability").and_then(Value::as_str))
        .map(|a| !OUT_OF_STOCK_MARKERS.iter().any(|m| a.ends_with(m)))
        .peekable();

    statuses.peek()?;
    Some(statuses.any(|in_stock| in_stock))
}

/// A plain string, or the `name` of a nested object such as `{"@type": "Brand", "name": "Acme"}`.
fn named(value: Option<&Value>) -> Option<String> {
    let text = match value? {
        Value::String(s) => s.as_str(),
        Value::Object(_) => value?.get("name")?.as_str()?,
        Value::Array(items) => return named(items.first()),
        _ => return None,
    };

    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn capacity_property(item: &Value) -> Option<String> {
    let properties = item.get("additionalProperty")?.as_array()?;
    properties.iter().find_map(|p| {
        let name = p.get("name")?.as_str()?.to_lowercase();
        if name.contains("capacity") || name.contains("storage") {
            named(p.get("value"))
        } else {
            None
        }
    })
}
