use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod price_history;
pub mod product;

// Re-exports for convenience
pub use price_history::*;
pub use product::*;

/// How a product check ended, as reported in logs and the check counter.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CheckOutcome {
    /// Price read and at or below the target.
    PriceDropped,
    /// Price read, no drop.
    Unchanged,
    Failed,
}

impl CheckOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckOutcome::PriceDropped => "price_dropped",
            CheckOutcome::Unchanged => "unchanged",
            CheckOutcome::Failed => "failed",
        }
    }
}

// Helper function to generate record identifiers
pub fn generate_id() -> String {
    Uuid::new_v4().simple().to_string()
}
