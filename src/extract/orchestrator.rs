use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use tracing::{debug, info, warn};
use url::Url;

use super::catalog::SelectorCatalog;
use super::price_text::within_bounds;
use super::scoring::LikelihoodScorer;
use super::selectors::SelectorExtractor;
use super::structured_data::StructuredDataReader;
use super::{PriceExtraction, Strategy};
use crate::config::ExtractionConfig;
use crate::page::PageHandle;
use crate::utils::error::{PageError, ScrapeError};

/// Runs the extraction strategies in priority order and returns the first
/// in-bounds price.
#[derive(Debug, Clone)]
pub struct PriceExtractor {
    structured: StructuredDataReader,
    selectors: SelectorExtractor,
    scorer: LikelihoodScorer,
    ceiling: Decimal,
    body_wait_timeout: Duration,
}

impl PriceExtractor {
    pub fn new(catalog: Arc<SelectorCatalog>, config: &ExtractionConfig) -> Self {
        let ceiling = Decimal::try_from(config.price_ceiling).unwrap_or(Decimal::MAX);

        Self {
            structured: StructuredDataReader::new(),
            selectors: SelectorExtractor::new(catalog, ceiling),
            scorer: LikelihoodScorer::new(config.scoring.clone()),
            ceiling,
            body_wait_timeout: Duration::from_millis(config.body_wait_timeout_ms),
        }
    }

    pub async fn extract<P>(&self, page: &P, url: &Url) -> Result<PriceExtraction, ScrapeError>
    where
        P: PageHandle + ?Sized,
    {
        match page.wait_for_selector("body", self.body_wait_timeout).await {
            Ok(()) => {}
            Err(PageError::Timeout { .. }) => {
                return Err(ScrapeError::BodyTimeout {
                    url: url.to_string(),
                    timeout_ms: self.body_wait_timeout.as_millis() as u64,
                });
            }
            Err(e) => {
                return Err(ScrapeError::PageAcquisition {
                    url: url.to_string(),
                    message: e.to_string(),
                });
            }
        }

        for strategy in Strategy::ORDER {
            let price = match self.attempt(strategy, page, url).await {
                Ok(price) => price,
                Err(e) => {
                    warn!("Strategy {} failed on {}: {}", strategy, url, e);
                    None
                }
            };

            match price {
                Some(price) if within_bounds(price, self.ceiling) => {
                    info!("Extracted price {} from {} via {}", price, url, strategy);
                    metrics::counter!("price_extraction_total", "strategy" => strategy.to_string())
                        .increment(1);
                    return Ok(PriceExtraction { price, strategy });
                }
                Some(price) => {
                    debug!("Strategy {} produced out-of-bounds price {}", strategy, price);
                }
                None => debug!("Strategy {} found no price on {}", strategy, url),
            }
        }

        Err(ScrapeError::Extraction {
            url: url.to_string(),
            attempted: Strategy::ORDER.to_vec(),
        })
    }

    async fn attempt<P>(&self, strategy: Strategy, page: &P, url: &Url) -> Result<Option<Decimal>, PageError>
    where
        P: PageHandle + ?Sized,
    {
        match strategy {
            Strategy::StructuredData => self.structured.read_price(page).await,
            Strategy::SelectorMatch => self.selectors.extract(page, url).await,
            Strategy::Scoring => self.scorer.extract(page).await,
        }
    }
}
