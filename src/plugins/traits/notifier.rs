use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A price crossed to at or below a product's target.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceDropEvent {
    pub product_id: String,
    pub recipient: String,
    pub product_title: String,
    pub product_url: String,
    pub new_price: Decimal,
    pub target_price: Decimal,
    pub previous_price: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationResult {
    pub success: bool,
    pub message_id: Option<String>,
    pub error: Option<String>,
}

/// Trait for implementing notification channels
#[async_trait]
pub trait NotifierPlugin: Send + Sync {
    /// Plugin metadata
    fn name(&self) -> &str;
    fn plugin_type(&self) -> &str;

    async fn notify(&self, event: &PriceDropEvent) -> Result<NotificationResult, Box<dyn std::error::Error + Send + Sync>>;
}
