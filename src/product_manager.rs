use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tokio_retry::strategy::FixedInterval;
use tokio_retry::RetryIf;
use tracing::{error, info, warn};

use crate::config::MonitorConfig;
use crate::extract::Strategy;
use crate::models::{CheckOutcome, PriceRecord, TrackedProduct};
use crate::plugins::{PluginManager, PriceDropEvent, PriceHistoryStore};
use crate::scraper::{BrowserDriver, ProductScraper, ScrapeOutcome};
use crate::utils::error::{FailureKind, ScrapeError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductCheckResult {
    pub product_id: String,
    pub url: String,
    pub outcome: CheckOutcome,
    pub old_price: Option<Decimal>,
    pub new_price: Option<Decimal>,
    pub strategy: Option<Strategy>,
    pub in_stock: Option<bool>,
    pub title: Option<String>,
    pub vendor: Option<String>,
    pub image: Option<String>,
    pub price_dropped: bool,
    pub notifications_sent: usize,
    pub recorded: bool,
    pub error: Option<String>,
    pub failure_kind: Option<FailureKind>,
    pub attempts: usize,
    pub total_time_ms: u64,
    pub checked_at: DateTime<Utc>,
}

impl ProductCheckResult {
    pub fn success(&self) -> bool {
        self.outcome != CheckOutcome::Failed
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub price_drops: usize,
    pub notifications_sent: usize,
}

impl CycleSummary {
    pub fn from_results(results: &[ProductCheckResult]) -> Self {
        let mut summary = Self {
            total: results.len(),
            ..Self::default()
        };
        for result in results {
            if result.success() {
                summary.succeeded += 1;
            } else {
                summary.failed += 1;
            }
            if result.price_dropped {
                summary.price_drops += 1;
            }
            summary.notifications_sent += result.notifications_sent;
        }
        summary
    }
}

/// Runs check cycles: scrape each product, persist the observation and send
/// alerts for prices that reach their target.
pub struct ProductManager<D, H> {
    scraper: ProductScraper<D>,
    history: H,
    plugin_manager: PluginManager,
    config: MonitorConfig,
}

impl<D, H> ProductManager<D, H>
where
    D: BrowserDriver,
    H: PriceHistoryStore,
{
    pub fn new(scraper: ProductScraper<D>, history: H, plugin_manager: PluginManager, config: MonitorConfig) -> Self {
        Self {
            scraper,
            history,
            plugin_manager,
            config,
        }
    }

    pub fn history(&self) -> &H {
        &self.history
    }

    /// Checks products one after another, pausing between them, and applies
    /// every successful observation to `products`.
    pub async fn run_cycle(&self, products: &mut [TrackedProduct]) -> (Vec<ProductCheckResult>, CycleSummary) {
        info!("Starting check cycle for {} products", products.len());
        let delay = Duration::from_millis(self.config.inter_product_delay_ms);
        let mut results = Vec::with_capacity(products.len());

        for (index, product) in products.iter_mut().enumerate() {
            if index > 0 && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            let result = self.check_product(product).await;
            if let (Some(price), Some(in_stock)) = (result.new_price, result.in_stock) {
                product.record_observation(price, in_stock, result.checked_at);
                if let Some(title) = &result.title {
                    product.name = Some(title.clone());
                }
                product.vendor = result.vendor.clone().or(product.vendor.take());
                product.image = result.image.clone().or(product.image.take());
            } else {
                warn!(
                    "Check failed for {}: {}",
                    product.display_name(),
                    result.error.as_deref().unwrap_or("unknown error")
                );
            }
            results.push(result);
        }

        let summary = CycleSummary::from_results(&results);
        info!(
            "Check cycle finished: {} succeeded, {} failed, {} price drops",
            summary.succeeded, summary.failed, summary.price_drops
        );
        (results, summary)
    }

    /// Checks one product. Never fails: problems are reported in the result.
    pub async fn check_product(&self, product: &TrackedProduct) -> ProductCheckResult {
        let start_time = Instant::now();
        let mut result = ProductCheckResult {
            product_id: product.id.clone(),
            url: product.url.clone(),
            outcome: CheckOutcome::Failed,
            old_price: product.last_price,
            new_price: None,
            strategy: None,
            in_stock: None,
            title: None,
            vendor: None,
            image: None,
            price_dropped: false,
            notifications_sent: 0,
            recorded: false,
            error: None,
            failure_kind: None,
            attempts: 0,
            total_time_ms: 0,
            checked_at: Utc::now(),
        };

        let url = match product.parsed_url() {
            Ok(url) => url,
            Err(e) => {
                error!("Skipping product {}: {}", product.id, e);
                result.error = Some(e.to_string());
                result.failure_kind = Some(FailureKind::PageAcquisition);
                return self.finish(result, start_time);
            }
        };

        let attempts = AtomicUsize::new(0);
        let retry_strategy = FixedInterval::from_millis(self.config.retry_delay_ms).take(self.config.retry_attempts);
        let scraped = RetryIf::spawn(
            retry_strategy,
            || {
                let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                if attempt > 1 {
                    info!("Retrying {} (attempt {})", url, attempt);
                }
                self.scraper.scrape(&url)
            },
            |e: &ScrapeError| e.is_retryable(),
        )
        .await;
        result.attempts = attempts.load(Ordering::SeqCst);

        match scraped {
            Ok(outcome) => self.apply_outcome(product, outcome, &mut result).await,
            Err(e) => {
                warn!("Check failed for product {} after {} attempts: {}", product.id, result.attempts, e);
                result.failure_kind = Some(e.kind());
                result.error = Some(e.to_string());
            }
        }

        self.finish(result, start_time)
    }

    async fn apply_outcome(&self, product: &TrackedProduct, outcome: ScrapeOutcome, result: &mut ProductCheckResult) {
        let price = outcome.extraction.price;
        result.new_price = Some(price);
        result.strategy = Some(outcome.extraction.strategy);
        result.in_stock = Some(outcome.in_stock);
        result.title = Some(outcome.metadata.title.clone());
        result.vendor = Some(outcome.metadata.vendor.clone());
        result.image = outcome.metadata.image.clone();
        result.price_dropped = product.is_price_drop(price);
        result.outcome = if result.price_dropped {
            CheckOutcome::PriceDropped
        } else {
            CheckOutcome::Unchanged
        };

        let record = PriceRecord::new(&product.id, price, outcome.in_stock, outcome.extraction.strategy);
        match self.history.append(&record).await {
            Ok(()) => result.recorded = true,
            Err(e) => error!("Failed to record price for product {} in {}: {}", product.id, self.history.name(), e),
        }

        if !product.should_notify(price) {
            return;
        }
        let (Some(recipient), Some(target_price)) = (&product.notify_email, product.target_price) else {
            return;
        };

        let event = PriceDropEvent {
            product_id: product.id.clone(),
            recipient: recipient.clone(),
            product_title: outcome.metadata.title,
            product_url: outcome.url,
            new_price: price,
            target_price,
            previous_price: product.last_price,
        };
        result.notifications_sent = self.plugin_manager.broadcast(&event).await;
    }

    fn finish(&self, mut result: ProductCheckResult, start_time: Instant) -> ProductCheckResult {
        result.total_time_ms = start_time.elapsed().as_millis() as u64;
        metrics::counter!("product_checks_total", "outcome" => result.outcome.as_str()).increment(1);
        result
    }
}
