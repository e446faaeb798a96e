pub mod config;
pub mod extract;
pub mod models;
pub mod page;
pub mod plugins;
pub mod product_manager;
pub mod scraper;
pub mod utils;

// Re-export commonly used types
pub use config::AppConfig;
pub use extract::{PriceExtraction, PriceExtractor, SelectorCatalog, Strategy};
pub use product_manager::{CycleSummary, ProductCheckResult, ProductManager};
pub use crate::scraper::{BrowserDriver, BrowsingContext, ProductScraper, ScrapeOutcome};
pub use utils::error::{AppError, FailureKind, PageError, ScrapeError};

pub type Result<T> = std::result::Result<T, AppError>;
