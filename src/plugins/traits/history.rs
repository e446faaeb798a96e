use async_trait::async_trait;

use crate::models::PriceRecord;

/// Append-only storage for successful price observations.
#[async_trait]
pub trait PriceHistoryStore: Send + Sync {
    fn name(&self) -> &str;

    async fn append(&self, record: &PriceRecord) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Records for one product, oldest first.
    async fn history(&self, product_id: &str) -> Result<Vec<PriceRecord>, Box<dyn std::error::Error + Send + Sync>>;
}
