use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::{AppConfig, ScraperConfig};
use crate::extract::{MetadataExtractor, PriceExtraction, PriceExtractor, ProductMetadata, SelectorCatalog};
use crate::page::PageHandle;
use crate::utils::error::{PageError, ScrapeError};

/// Source of isolated browsing contexts. One context is opened per scrape.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    async fn open_context(&self) -> Result<Box<dyn BrowsingContext>, PageError>;
}

/// A single isolated tab: no cookies or storage shared with other contexts.
#[async_trait]
pub trait BrowsingContext: PageHandle {
    async fn set_user_agent(&self, user_agent: &str) -> Result<(), PageError>;

    /// Loads `url` and resolves once the DOM is ready.
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), PageError>;

    async fn close(self: Box<Self>) -> Result<(), PageError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeOutcome {
    pub url: String,
    pub extraction: PriceExtraction,
    pub metadata: ProductMetadata,
    /// Page is assumed purchasable unless structured data says otherwise.
    pub in_stock: bool,
    pub response_time_ms: u64,
}

/// Acquires a page for one product URL, runs extraction and always tears the
/// context down afterwards.
pub struct ProductScraper<D> {
    driver: D,
    price_extractor: PriceExtractor,
    metadata_extractor: MetadataExtractor,
    config: ScraperConfig,
}

impl<D: BrowserDriver> ProductScraper<D> {
    pub fn new(driver: D, catalog: Arc<SelectorCatalog>, config: &AppConfig) -> Self {
        Self {
            driver,
            price_extractor: PriceExtractor::new(catalog, &config.extraction),
            metadata_extractor: MetadataExtractor::new(),
            config: config.scraper.clone(),
        }
    }

    pub async fn scrape(&self, url: &Url) -> Result<ScrapeOutcome, ScrapeError> {
        let start_time = Instant::now();

        let context = self
            .driver
            .open_context()
            .await
            .map_err(|e| acquisition_error(url, e))?;

        let result = self.scrape_in(context.as_ref(), url, start_time).await;

        if let Err(e) = context.close().await {
            warn!("Failed to close browsing context for {}: {}", url, e);
        }

        match &result {
            Ok(outcome) => info!(
                "Scraped {} in {}ms: {} ({})",
                url, outcome.response_time_ms, outcome.extraction.price, outcome.extraction.strategy
            ),
            Err(e) => {
                warn!("Scrape of {} failed: {}", url, e);
                metrics::counter!("price_extraction_failures_total", "kind" => e.kind().to_string())
                    .increment(1);
            }
        }

        result
    }

    async fn scrape_in(
        &self,
        context: &dyn BrowsingContext,
        url: &Url,
        start_time: Instant,
    ) -> Result<ScrapeOutcome, ScrapeError> {
        context
            .set_user_agent(&self.config.user_agent)
            .await
            .map_err(|e| acquisition_error(url, e))?;

        let navigation_timeout = Duration::from_millis(self.config.navigation_timeout_ms);
        context
            .navigate(url.as_str(), navigation_timeout)
            .await
            .map_err(|e| acquisition_error(url, e))?;

        debug!("Waiting {}ms for {} to settle", self.config.settle_delay_ms, url);
        tokio::time::sleep(Duration::from_millis(self.config.settle_delay_ms)).await;

        let extraction = self.price_extractor.extract(context, url).await?;
        let metadata = self.metadata_extractor.extract(context, url).await;

        Ok(ScrapeOutcome {
            url: url.to_string(),
            extraction,
            in_stock: metadata.in_stock.unwrap_or(true),
            metadata,
            response_time_ms: start_time.elapsed().as_millis() as u64,
        })
    }
}

fn acquisition_error(url: &Url, error: PageError) -> ScrapeError {
    ScrapeError::PageAcquisition {
        url: url.to_string(),
        message: error.to_string(),
    }
}
