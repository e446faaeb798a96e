use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::models::PriceRecord;
use crate::plugins::traits::PriceHistoryStore;

/// Price history as newline-delimited JSON, one [`PriceRecord`] per line.
pub struct JsonlHistoryStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlHistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl PriceHistoryStore for JsonlHistoryStore {
    fn name(&self) -> &str {
        "jsonl"
    }

    async fn append(&self, record: &PriceRecord) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        debug!("Appended price record {} to {}", record.id, self.path.display());
        Ok(())
    }

    async fn history(&self, product_id: &str) -> Result<Vec<PriceRecord>, Box<dyn std::error::Error + Send + Sync>> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        for (number, line) in raw.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<PriceRecord>(line) {
                Ok(record) if record.product_id == product_id => records.push(record),
                Ok(_) => {}
                Err(e) => warn!("Skipping unreadable line {} in {}: {}", number + 1, self.path.display(), e),
            }
        }

        Ok(records)
    }
}
