use std::str::FromStr;
use std::sync::Arc;

use pricedrop_watcher::config::ExtractionConfig;
use pricedrop_watcher::extract::MetadataExtractor;
use pricedrop_watcher::page::StaticDocument;
use pricedrop_watcher::{PriceExtraction, PriceExtractor, ScrapeError, SelectorCatalog, Strategy};
use rstest::rstest;
use rust_decimal::Decimal;
use url::Url;

const URL: &str = "https://shop.example.com/products/kettle";

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

async fn extract(html: &str) -> Result<PriceExtraction, ScrapeError> {
    let page = StaticDocument::new(URL, html);
    PriceExtractor::new(Arc::new(SelectorCatalog::standard()), &ExtractionConfig::default())
        .extract(&page, &Url::parse(URL).unwrap())
        .await
}

#[tokio::test]
async fn test_structured_data_scenario() -> anyhow::Result<()> {
    let html = r#"<html><head>
        <script type="application/ld+json">{"@type":"Product","offers":{"price":"49.99"}}</script>
    </head><body><h1>Kettle</h1></body></html>"#;

    let extraction = extract(html).await?;
    assert_eq!(extraction.price, dec("49.99"));
    assert_eq!(extraction.strategy, Strategy::StructuredData);
    Ok(())
}

#[tokio::test]
async fn test_current_price_over_was_price_scenario() -> anyhow::Result<()> {
    let html = r#"<html><body>
        <span class="current-price">$79.00</span>
        <span class="was-price">$99.00</span>
    </body></html>"#;

    let extraction = extract(html).await?;
    assert_eq!(extraction.price, dec("79.00"));
    assert_eq!(extraction.strategy, Strategy::SelectorMatch);
    Ok(())
}

#[tokio::test]
async fn test_scoring_fallback_scenario() -> anyhow::Result<()> {
    let html = r#"<html><body><div id="weird123">Total: 12.50 today</div></body></html>"#;

    let extraction = extract(html).await?;
    assert_eq!(extraction.price, dec("12.50"));
    assert_eq!(extraction.strategy, Strategy::Scoring);
    Ok(())
}

#[tokio::test]
async fn test_extraction_is_idempotent() -> anyhow::Result<()> {
    let html = r#"<html><head>
        <script type="application/ld+json">{"@type":"Product","offers":{"price":"not listed"}}</script>
    </head><body>
        <div class="product">
            <s class="price">$450.00</s>
            <span class="price price--sale">$399.00</span>
        </div>
    </body></html>"#;

    let first = extract(html).await?;
    let second = extract(html).await?;
    assert_eq!(first, second);
    assert_eq!(first.price, dec("399.00"));
    Ok(())
}

#[rstest]
#[case("$10,000.00", Some("10000.00"))]
#[case("$10,000.01", None)]
#[case("$0.00", None)]
#[case("-$5.00", None)]
#[tokio::test]
async fn test_price_ceiling_boundaries(#[case] text: &str, #[case] expected: Option<&str>) {
    let html = format!(r#"<html><body><span class="price">{}</span></body></html>"#, text);

    let result = extract(&html).await;
    match expected {
        Some(price) => assert_eq!(result.unwrap().price, dec(price)),
        None => assert!(matches!(result, Err(ScrapeError::Extraction { .. }))),
    }
}

#[tokio::test]
async fn test_accessory_offers_do_not_win() -> anyhow::Result<()> {
    let html = r#"<html><head>
        <script type="application/ld+json">
        {
            "@context": "https://schema.org",
            "@type": "Product",
            "name": "Noise Cancelling Headphones",
            "offers": [
                {"@type": "Offer", "price": "29.99", "name": "Travel case"},
                {"@type": "Offer", "price": "349.00"},
                {"@type": "Offer", "price": "49.99", "name": "2-year protection"}
            ]
        }
        </script>
    </head><body></body></html>"#;

    let extraction = extract(html).await?;
    assert_eq!(extraction.price, dec("349.00"));
    Ok(())
}

#[tokio::test]
async fn test_full_product_page_metadata() -> anyhow::Result<()> {
    let html = r#"<html><head>
        <title>Acme Kettle 1.7L | Shop</title>
        <meta property="og:title" content="Acme Electric Kettle 1.7L">
        <meta property="og:image" content="https://cdn.example.com/kettle.jpg">
        <link rel="canonical" href="/products/acme-kettle">
        <script type="application/ld+json">
            {"@type":"Product","brand":"Acme","color":"Stainless","offers":{"price":"39.95","availability":"https://schema.org/InStock"}}
        </script>
    </head><body>
        <h1>Acme Electric Kettle</h1>
        <span class="price">$39.95</span>
    </body></html>"#;

    let page = StaticDocument::new(URL, html);
    let url = Url::parse(URL)?;
    let metadata = MetadataExtractor::new().extract(&page, &url).await;

    assert_eq!(metadata.title, "Acme Electric Kettle 1.7L");
    assert_eq!(metadata.image.as_deref(), Some("https://cdn.example.com/kettle.jpg"));
    assert_eq!(metadata.url, "https://shop.example.com/products/acme-kettle");
    assert_eq!(metadata.vendor, "Shop");
    assert_eq!(metadata.variants.brand.as_deref(), Some("Acme"));
    assert_eq!(metadata.variants.color.as_deref(), Some("Stainless"));
    assert_eq!(metadata.in_stock, Some(true));
    Ok(())
}
