pub mod history;
pub mod notifier;

pub use history::PriceHistoryStore;
pub use notifier::{NotificationResult, NotifierPlugin, PriceDropEvent};
