use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::models::generate_id;
use crate::utils::error::AppError;

/// A product under watch, as listed in the products file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrackedProduct {
    #[serde(default = "generate_id")]
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub vendor: Option<String>,
    #[serde(default)]
    pub image: Option<String>,

    // Notification rules
    #[serde(default)]
    pub target_price: Option<Decimal>,
    #[serde(default)]
    pub notify_email: Option<String>,

    // Last successful observation
    #[serde(default)]
    pub last_price: Option<Decimal>,
    #[serde(default)]
    pub in_stock: Option<bool>,
    #[serde(default)]
    pub last_checked: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTrackedProduct {
    pub url: String,
    pub target_price: Option<Decimal>,
    pub notify_email: Option<String>,
}

impl TrackedProduct {
    pub fn new(new_product: NewTrackedProduct) -> Result<Self, AppError> {
        let product = Self {
            id: generate_id(),
            url: new_product.url,
            name: None,
            vendor: None,
            image: None,
            target_price: new_product.target_price,
            notify_email: new_product.notify_email,
            last_price: None,
            in_stock: None,
            last_checked: None,
        };
        product.parsed_url()?;
        Ok(product)
    }

    /// The product URL, accepted only when it is absolute http(s).
    pub fn parsed_url(&self) -> Result<Url, AppError> {
        let url = Url::parse(&self.url).map_err(|e| AppError::InvalidUrl {
            url: self.url.clone(),
            message: e.to_string(),
        })?;

        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(AppError::InvalidUrl {
                url: self.url.clone(),
                message: format!("unsupported scheme '{}'", other),
            }),
        }
    }

    /// True when `price` meets the target. Products without a target never drop.
    pub fn is_price_drop(&self, price: Decimal) -> bool {
        self.target_price.is_some_and(|target| price <= target)
    }

    /// A drop alert goes out only when the price crosses to at-or-below the
    /// target: the previous observation was missing or above it.
    pub fn should_notify(&self, price: Decimal) -> bool {
        match self.target_price {
            Some(target) if price <= target => self.last_price.is_none_or(|last| last > target),
            _ => false,
        }
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.url)
    }

    /// Records a successful observation. Failed checks leave the product untouched.
    pub fn record_observation(&mut self, price: Decimal, in_stock: bool, checked_at: DateTime<Utc>) {
        self.last_price = Some(price);
        self.in_stock = Some(in_stock);
        self.last_checked = Some(checked_at);
    }
}

/// The on-disk product list: a TOML file with one `[[products]]` table per entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProductList {
    #[serde(default)]
    pub products: Vec<TrackedProduct>,
}

impl ProductList {
    pub fn from_toml(raw: &str) -> Result<Self, AppError> {
        let list: ProductList = toml::from_str(raw)?;
        for product in &list.products {
            product.parsed_url()?;
        }
        Ok(list)
    }

    pub fn to_toml(&self) -> Result<String, AppError> {
        Ok(toml::to_string_pretty(self)?)
    }
}
