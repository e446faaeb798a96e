use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::models::PriceRecord;
use crate::plugins::traits::PriceHistoryStore;

/// Keeps records for the life of the process.
#[derive(Debug, Default)]
pub struct MemoryHistoryStore {
    records: RwLock<Vec<PriceRecord>>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl PriceHistoryStore for MemoryHistoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn append(&self, record: &PriceRecord) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.records.write().await.push(record.clone());
        Ok(())
    }

    async fn history(&self, product_id: &str) -> Result<Vec<PriceRecord>, Box<dyn std::error::Error + Send + Sync>> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .filter(|r| r.product_id == product_id)
            .cloned()
            .collect())
    }
}
