use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::notifiers::LogNotifier;
use super::traits::{NotificationResult, NotifierPlugin, PriceDropEvent};
use crate::utils::error::AppError;

pub type NotifierPluginBox = Box<dyn NotifierPlugin>;

/// Registry of notification channels, keyed by plugin type.
#[derive(Clone)]
pub struct PluginManager {
    notifiers: Arc<RwLock<HashMap<String, NotifierPluginBox>>>,
}

impl PluginManager {
    pub fn new() -> Self {
        Self {
            notifiers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register a notifier plugin, replacing any earlier plugin of the same type
    pub async fn register_notifier(&self, plugin: NotifierPluginBox) {
        let plugin_type = plugin.plugin_type().to_string();
        debug!("Registering notifier plugin '{}'", plugin_type);

        let mut notifiers = self.notifiers.write().await;
        notifiers.insert(plugin_type, plugin);
    }

    pub async fn has_notifier(&self, plugin_type: &str) -> bool {
        let notifiers = self.notifiers.read().await;
        notifiers.contains_key(plugin_type)
    }

    pub async fn list_notifier_types(&self) -> Vec<String> {
        let notifiers = self.notifiers.read().await;
        let mut types: Vec<String> = notifiers.keys().cloned().collect();
        types.sort();
        types
    }

    /// Initialize with the built-in notifiers
    pub async fn initialize_default_plugins(&self) {
        self.register_notifier(Box::new(LogNotifier::new())).await;
    }

    /// Send notification using one notifier plugin
    pub async fn send_notification(&self, plugin_type: &str, event: &PriceDropEvent) -> Result<NotificationResult, AppError> {
        let notifiers = self.notifiers.read().await;
        let notifier = notifiers.get(plugin_type).ok_or_else(|| AppError::Plugin {
            plugin_type: plugin_type.to_string(),
            message: "notifier not registered".to_string(),
        })?;

        let result = notifier.notify(event).await.map_err(|e| AppError::Plugin {
            plugin_type: plugin_type.to_string(),
            message: e.to_string(),
        })?;

        match (result.success, &result.error) {
            (true, _) => Ok(result),
            (false, error) => Err(AppError::Plugin {
                plugin_type: plugin_type.to_string(),
                message: error.clone().unwrap_or_else(|| "delivery failed".to_string()),
            }),
        }
    }

    /// Fans `event` out to every registered notifier and returns how many
    /// accepted it. Delivery failures are logged, never propagated.
    pub async fn broadcast(&self, event: &PriceDropEvent) -> usize {
        let mut delivered = 0;
        for plugin_type in self.list_notifier_types().await {
            match self.send_notification(&plugin_type, event).await {
                Ok(_) => delivered += 1,
                Err(e) => warn!(
                    "Failed to notify {} about product {}: {}",
                    event.recipient, event.product_id, e
                ),
            }
        }
        delivered
    }
}

impl Default for PluginManager {
    fn default() -> Self {
        Self::new()
    }
}
