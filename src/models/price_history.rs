use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::extract::Strategy;
use crate::models::generate_id;

/// One successful price observation. Failed checks never produce a record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceRecord {
    pub id: String,
    pub product_id: String,
    pub price: Decimal,
    pub in_stock: bool,
    pub strategy: Strategy,
    pub recorded_at: DateTime<Utc>,
}

impl PriceRecord {
    pub fn new(product_id: &str, price: Decimal, in_stock: bool, strategy: Strategy) -> Self {
        Self {
            id: generate_id(),
            product_id: product_id.to_string(),
            price,
            in_stock,
            strategy,
            recorded_at: Utc::now(),
        }
    }
}
