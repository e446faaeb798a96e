pub mod history;
pub mod manager;
pub mod notifiers;
pub mod traits;

pub use history::{JsonlHistoryStore, MemoryHistoryStore};
pub use manager::PluginManager;
pub use notifiers::LogNotifier;
pub use traits::{NotificationResult, NotifierPlugin, PriceDropEvent, PriceHistoryStore};
