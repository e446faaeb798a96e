use std::sync::Arc;

use pricedrop_watcher::models::{CheckOutcome, NewTrackedProduct, TrackedProduct};
use pricedrop_watcher::plugins::{JsonlHistoryStore, MemoryHistoryStore, PluginManager, PriceHistoryStore};
use pricedrop_watcher::{FailureKind, ProductManager, ProductScraper, SelectorCatalog};
use rust_decimal::Decimal;
use tempfile::tempdir;

use super::*;

const KETTLE: &str = "https://shop.example.com/products/kettle";
const TOASTER: &str = "https://shop.example.com/products/toaster";

fn priced(amount: &str) -> FixtureResponse {
    page(&format!(
        r#"<html><head><title>Acme Kettle</title></head><body><span class="price">${}</span></body></html>"#,
        amount
    ))
}

fn product(url: &str, target: Option<Decimal>) -> TrackedProduct {
    TrackedProduct::new(NewTrackedProduct {
        url: url.to_string(),
        target_price: target,
        notify_email: Some("buyer@example.com".to_string()),
    })
    .unwrap()
}

async fn manager<H: PriceHistoryStore>(
    driver: &FixtureDriver,
    history: H,
    notifier: &RecordingNotifier,
) -> ProductManager<FixtureDriver, H> {
    let config = test_config();
    let scraper = ProductScraper::new(driver.clone(), Arc::new(SelectorCatalog::standard()), &config);

    let plugin_manager = PluginManager::new();
    plugin_manager.register_notifier(Box::new(notifier.clone())).await;

    ProductManager::new(scraper, history, plugin_manager, config.monitor)
}

#[tokio::test]
async fn test_notifies_once_per_crossing() -> anyhow::Result<()> {
    let driver = FixtureDriver::new().serve(
        KETTLE,
        vec![priced("29.99"), priced("28.50"), priced("35.00"), priced("25.00")],
    );
    let notifier = RecordingNotifier::default();
    let manager = manager(&driver, MemoryHistoryStore::new(), &notifier).await;
    let mut products = vec![product(KETTLE, Some(Decimal::from(30)))];

    let (results, summary) = manager.run_cycle(&mut products).await;
    assert_eq!(results[0].outcome, CheckOutcome::PriceDropped);
    assert_eq!(results[0].notifications_sent, 1);
    assert_eq!(summary.notifications_sent, 1);
    assert_eq!(products[0].last_price, Some(Decimal::new(2999, 2)));
    assert_eq!(products[0].name.as_deref(), Some("Acme Kettle"));

    // Still below target: no repeat alert.
    let (results, _) = manager.run_cycle(&mut products).await;
    assert!(results[0].price_dropped);
    assert_eq!(results[0].notifications_sent, 0);

    // Back above target.
    let (results, _) = manager.run_cycle(&mut products).await;
    assert_eq!(results[0].outcome, CheckOutcome::Unchanged);

    // Crosses again.
    let (results, _) = manager.run_cycle(&mut products).await;
    assert_eq!(results[0].notifications_sent, 1);

    let events = notifier.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].new_price, Decimal::new(2999, 2));
    assert_eq!(events[0].product_title, "Acme Kettle");
    assert_eq!(events[0].product_url, KETTLE);
    assert_eq!(events[1].new_price, Decimal::from(25));
    assert_eq!(events[1].previous_price, Some(Decimal::from(35)));

    assert_eq!(manager.history().history(&products[0].id).await.unwrap().len(), 4);
    Ok(())
}

#[tokio::test]
async fn test_transient_timeout_is_retried() -> anyhow::Result<()> {
    let driver = FixtureDriver::new().serve(KETTLE, vec![FixtureResponse::Stalled, priced("31.00")]);
    let notifier = RecordingNotifier::default();
    let manager = manager(&driver, MemoryHistoryStore::new(), &notifier).await;

    let result = manager.check_product(&product(KETTLE, None)).await;
    assert!(result.success());
    assert_eq!(result.attempts, 2);
    assert_eq!(result.new_price, Some(Decimal::from(31)));
    assert_eq!(driver.closed(), 2);
    Ok(())
}

#[tokio::test]
async fn test_missing_price_is_not_retried() -> anyhow::Result<()> {
    let driver = FixtureDriver::new().serve(KETTLE, vec![page("<body><p>Coming soon</p></body>")]);
    let notifier = RecordingNotifier::default();
    let manager = manager(&driver, MemoryHistoryStore::new(), &notifier).await;

    let mut products = vec![product(KETTLE, Some(Decimal::from(100)))];
    let before = products[0].clone();
    let (results, summary) = manager.run_cycle(&mut products).await;

    assert_eq!(results[0].outcome, CheckOutcome::Failed);
    assert_eq!(results[0].failure_kind, Some(FailureKind::Extraction));
    assert_eq!(results[0].attempts, 1);
    assert!(!results[0].recorded);
    assert_eq!(summary.failed, 1);
    assert_eq!(products[0], before);
    assert!(notifier.events().is_empty());
    assert!(manager.history().is_empty().await);
    Ok(())
}

#[tokio::test]
async fn test_unreachable_page_exhausts_retries() -> anyhow::Result<()> {
    let driver = FixtureDriver::new()
        .serve(KETTLE, vec![FixtureResponse::NavigationFailure("net::ERR_TIMED_OUT".into())])
        .serve(TOASTER, vec![priced("59.00")]);
    let notifier = RecordingNotifier::default();
    let manager = manager(&driver, MemoryHistoryStore::new(), &notifier).await;

    let mut products = vec![product(KETTLE, None), product(TOASTER, None)];
    let (results, summary) = manager.run_cycle(&mut products).await;

    assert_eq!(results[0].failure_kind, Some(FailureKind::PageAcquisition));
    assert_eq!(results[0].attempts, 3);
    assert_eq!(driver.navigations(KETTLE), 3);
    assert!(results[1].success());
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(products[0].last_price, None);
    assert_eq!(products[1].last_price, Some(Decimal::from(59)));
    Ok(())
}

#[tokio::test]
async fn test_failed_notification_keeps_price_record() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let history_path = dir.path().join("history.jsonl");
    let driver = FixtureDriver::new().serve(KETTLE, vec![priced("19.99")]);
    let notifier = RecordingNotifier::failing();
    let manager = manager(&driver, JsonlHistoryStore::new(&history_path), &notifier).await;

    let mut products = vec![product(KETTLE, Some(Decimal::from(20)))];
    let (results, _) = manager.run_cycle(&mut products).await;

    assert!(results[0].recorded);
    assert!(results[0].price_dropped);
    assert_eq!(results[0].notifications_sent, 0);
    assert_eq!(notifier.events().len(), 1);
    assert_eq!(products[0].last_price, Some(Decimal::new(1999, 2)));

    let raw = std::fs::read_to_string(&history_path)?;
    assert_eq!(raw.lines().count(), 1);
    assert!(raw.contains(&products[0].id));
    Ok(())
}
