use async_trait::async_trait;
use tracing::info;

use crate::models::generate_id;
use crate::plugins::traits::{NotificationResult, NotifierPlugin, PriceDropEvent};

/// Writes price-drop alerts to the application log. Used when no outbound
/// channel is configured.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }

    pub fn format_message(event: &PriceDropEvent) -> String {
        let previous = event
            .previous_price
            .map(|p| format!(" (was ${:.2})", p))
            .unwrap_or_default();

        format!(
            "Price drop: {} is now ${:.2}{}, target ${:.2}. {}",
            event.product_title, event.new_price, previous, event.target_price, event.product_url
        )
    }
}

#[async_trait]
impl NotifierPlugin for LogNotifier {
    fn name(&self) -> &str {
        "Log Notifier"
    }

    fn plugin_type(&self) -> &str {
        "log"
    }

    async fn notify(&self, event: &PriceDropEvent) -> Result<NotificationResult, Box<dyn std::error::Error + Send + Sync>> {
        info!(
            recipient = %event.recipient,
            product_id = %event.product_id,
            "{}",
            Self::format_message(event)
        );

        Ok(NotificationResult {
            success: true,
            message_id: Some(format!("log-{}", generate_id())),
            error: None,
        })
    }
}
