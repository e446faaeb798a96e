use std::sync::Arc;

use pricedrop_watcher::{FailureKind, ProductScraper, ScrapeError, SelectorCatalog, Strategy};
use rust_decimal::Decimal;
use url::Url;

use super::*;

const KETTLE: &str = "https://shop.example.com/products/kettle";

fn scraper(driver: &FixtureDriver) -> ProductScraper<FixtureDriver> {
    ProductScraper::new(driver.clone(), Arc::new(SelectorCatalog::standard()), &test_config())
}

#[tokio::test]
async fn test_scrape_returns_price_and_metadata() -> anyhow::Result<()> {
    let driver = FixtureDriver::new().serve(
        KETTLE,
        vec![page(
            r#"<html><head><meta property="og:title" content="Acme Kettle"></head>
            <body><span class="sale-price">$29.99</span></body></html>"#,
        )],
    );

    let outcome = scraper(&driver).scrape(&Url::parse(KETTLE)?).await?;
    assert_eq!(outcome.extraction.price, Decimal::new(2999, 2));
    assert_eq!(outcome.extraction.strategy, Strategy::SelectorMatch);
    assert_eq!(outcome.metadata.title, "Acme Kettle");
    assert_eq!(outcome.metadata.vendor, "Shop");
    assert!(outcome.in_stock);
    Ok(())
}

#[tokio::test]
async fn test_body_never_loads_scenario() -> anyhow::Result<()> {
    let driver = FixtureDriver::new().serve(KETTLE, vec![FixtureResponse::Stalled]);

    let err = scraper(&driver)
        .scrape(&Url::parse(KETTLE)?)
        .await
        .expect_err("a stalled page has no price");
    assert_eq!(err.kind(), FailureKind::Timeout);
    assert!(err.is_retryable());
    assert!(matches!(err, ScrapeError::BodyTimeout { .. }));
    Ok(())
}

#[tokio::test]
async fn test_every_context_is_closed() -> anyhow::Result<()> {
    let missing = "https://shop.example.com/products/missing";
    let driver = FixtureDriver::new()
        .serve(KETTLE, vec![page("<body><p>Sold out everywhere</p></body>")])
        .serve(missing, vec![FixtureResponse::NavigationFailure("net::ERR_CONNECTION_RESET".into())]);
    let scraper = scraper(&driver);

    let no_price = scraper.scrape(&Url::parse(KETTLE)?).await.unwrap_err();
    assert_eq!(no_price.kind(), FailureKind::Extraction);
    assert!(!no_price.is_retryable());

    let unreachable = scraper.scrape(&Url::parse(missing)?).await.unwrap_err();
    assert_eq!(unreachable.kind(), FailureKind::PageAcquisition);
    assert_eq!(unreachable.url(), missing);

    assert_eq!(driver.opened(), 2);
    assert_eq!(driver.closed(), 2);
    Ok(())
}

#[tokio::test]
async fn test_out_of_stock_from_structured_data() -> anyhow::Result<()> {
    let driver = FixtureDriver::new().serve(
        KETTLE,
        vec![page(
            r#"<html><head><script type="application/ld+json">
                {"@type":"Product","offers":{"price":"24.00","availability":"https://schema.org/OutOfStock"}}
            </script></head><body></body></html>"#,
        )],
    );

    let outcome = scraper(&driver).scrape(&Url::parse(KETTLE)?).await?;
    assert_eq!(outcome.extraction.strategy, Strategy::StructuredData);
    assert!(!outcome.in_stock);
    Ok(())
}
